//! Print jobs and the print server.
//!
//! The print server exposes `GET {PRINTER_URL}/status` and accepts
//! documents at `POST {PRINTER_URL}/print`. When it is unreachable the
//! job is marked failed and the document is handed back for download.

use chrono::Utc;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use thriftstore_core::{DocumentKind, PrintJobStatus, PrintOutput};

use super::documents::{DocumentService, RenderedDocument};
use crate::config::PrinterConfig;
use crate::db::Stores;
use crate::error::AppError;
use crate::models::{CurrentUser, NewPrintJob, PrintJob, PrintRequest, PrinterStatus};
use crate::state::AppState;

pub const MAX_COPIES: i32 = 20;
const MAX_JOB_PAGE: usize = 200;

/// What the print server reports on `/status`.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    online: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct PrintPayload<'a> {
    document: DocumentKind,
    copies: i32,
    filename: &'a str,
    html: &'a str,
}

/// Result of submitting a print job.
#[derive(Debug)]
pub enum PrintOutcome {
    /// The print server accepted the document.
    Sent(PrintJob),
    /// The document is returned to the caller. `fallback` is set when it
    /// was meant for the printer.
    Download {
        job: PrintJob,
        document: RenderedDocument,
        fallback: bool,
    },
}

pub struct PrintService<'a> {
    stores: &'a Stores,
    http: &'a reqwest::Client,
    printer: Option<&'a PrinterConfig>,
    status_cache: &'a Cache<(), PrinterStatus>,
}

impl<'a> PrintService<'a> {
    #[must_use]
    pub const fn new(
        stores: &'a Stores,
        http: &'a reqwest::Client,
        printer: Option<&'a PrinterConfig>,
        status_cache: &'a Cache<(), PrinterStatus>,
    ) -> Self {
        Self {
            stores,
            http,
            printer,
            status_cache,
        }
    }

    #[must_use]
    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.stores(),
            state.http(),
            state.config().printer.as_ref(),
            state.printer_status_cache(),
        )
    }

    /// Printer status, reused for 30 seconds.
    pub async fn printer_status(&self) -> PrinterStatus {
        self.status_cache
            .get_with((), self.check_printer())
            .await
    }

    async fn check_printer(&self) -> PrinterStatus {
        let checked_at = Utc::now();
        let Some(printer) = self.printer else {
            return PrinterStatus {
                online: false,
                name: None,
                message: Some("No printer configured".to_owned()),
                checked_at,
            };
        };
        let offline = |message: String| PrinterStatus {
            online: false,
            name: Some(printer.name.clone()),
            message: Some(message),
            checked_at,
        };

        let url = match printer.url.join("status") {
            Ok(url) => url,
            Err(e) => return offline(format!("invalid printer URL: {e}")),
        };
        let response = match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => return offline(format!("print server returned {}", response.status())),
            Err(e) => {
                tracing::warn!(error = %e, "Print server unreachable");
                return offline("print server unreachable".to_owned());
            }
        };
        match response.json::<StatusResponse>().await {
            Ok(status) => PrinterStatus {
                online: status.online,
                name: status.name.or_else(|| Some(printer.name.clone())),
                message: status.message,
                checked_at,
            },
            Err(e) => offline(format!("unreadable status: {e}")),
        }
    }

    /// Record and carry out a print request.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn submit(
        &self,
        actor: &CurrentUser,
        request: PrintRequest,
    ) -> Result<PrintOutcome, AppError> {
        if !(1..=MAX_COPIES).contains(&request.copies) {
            return Err(AppError::field(
                "copies",
                format!("copies must be between 1 and {MAX_COPIES}"),
            ));
        }

        let document = DocumentService::new(self.stores)
            .render(request.document, request.target_id)
            .await?;

        let job = self
            .stores
            .print_jobs
            .insert_print_job(NewPrintJob {
                document: request.document,
                target_id: request.target_id,
                output: request.output,
                copies: request.copies,
                printer_name: match request.output {
                    PrintOutput::Printer => self.printer.map(|p| p.name.clone()),
                    PrintOutput::Pdf => None,
                },
                requested_by: actor.id,
            })
            .await?;

        if request.output == PrintOutput::Pdf {
            let job = self
                .stores
                .print_jobs
                .finish_print_job(job.id, PrintJobStatus::Completed, None)
                .await?;
            return Ok(PrintOutcome::Download {
                job,
                document,
                fallback: false,
            });
        }

        match self.send_to_printer(&document, request.copies).await {
            Ok(()) => {
                let job = self
                    .stores
                    .print_jobs
                    .finish_print_job(job.id, PrintJobStatus::Sent, None)
                    .await?;
                tracing::info!(job_id = %job.id, document = %job.document, "Print job sent");
                Ok(PrintOutcome::Sent(job))
            }
            Err(message) => {
                tracing::warn!(job_id = %job.id, error = %message, "Print failed, returning document");
                self.status_cache.invalidate(&()).await;
                let job = self
                    .stores
                    .print_jobs
                    .finish_print_job(job.id, PrintJobStatus::Failed, Some(message))
                    .await?;
                Ok(PrintOutcome::Download {
                    job,
                    document,
                    fallback: true,
                })
            }
        }
    }

    async fn send_to_printer(&self, document: &RenderedDocument, copies: i32) -> Result<(), String> {
        let printer = self.printer.ok_or("no printer configured")?;
        let url = printer
            .url
            .join("print")
            .map_err(|e| format!("invalid printer URL: {e}"))?;
        let response = self
            .http
            .post(url)
            .json(&PrintPayload {
                document: document.kind,
                copies,
                filename: &document.filename,
                html: &document.html,
            })
            .send()
            .await
            .map_err(|e| format!("print server unreachable: {e}"))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("print server returned {}", response.status()))
        }
    }

    pub async fn list_print_jobs(&self, limit: usize) -> Result<Vec<PrintJob>, AppError> {
        Ok(self
            .stores
            .print_jobs
            .list_print_jobs(limit.clamp(1, MAX_JOB_PAGE))
            .await?)
    }
}
