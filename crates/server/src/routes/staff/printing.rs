//! Printer status, print jobs and document downloads.
//!
//! Documents are served as a single `attachment` response. When a job meant
//! for the printer could not be sent, the same download is returned with
//! `x-print-fallback: pdf` so the client can tell the user what happened.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use thriftstore_core::{DocumentKind, OrderId, ProductId};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::{Permission, PrintJob, PrintRequest, PrinterStatus};
use crate::services::PrintService;
use crate::services::documents::{DocumentService, RenderedDocument};
use crate::services::printing::PrintOutcome;
use crate::state::AppState;

const DEFAULT_JOB_LIMIT: usize = 50;

pub const PRINT_FALLBACK_HEADER: HeaderName = HeaderName::from_static("x-print-fallback");
pub const PRINT_JOB_HEADER: HeaderName = HeaderName::from_static("x-print-job-id");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/printer", get(printer_status))
        .route("/print", post(print))
        .route("/print-jobs", get(list_print_jobs))
        .route("/orders/{id}/documents/{kind}", get(order_document))
        .route("/products/{id}/label", get(product_label))
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub limit: Option<usize>,
}

async fn printer_status(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<PrinterStatus>, AppError> {
    ensure(&user, Permission::Print)?;
    Ok(Json(PrintService::from_state(&state).printer_status().await))
}

#[instrument(skip(state, user, request), fields(user_id = %user.id, document = %request.document, output = %request.output))]
async fn print(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<PrintRequest>,
) -> Result<Response, AppError> {
    ensure(&user, Permission::Print)?;
    let outcome = PrintService::from_state(&state)
        .submit(&user, request)
        .await?;
    Ok(match outcome {
        PrintOutcome::Sent(job) => (StatusCode::ACCEPTED, Json(job)).into_response(),
        PrintOutcome::Download {
            job,
            document,
            fallback,
        } => {
            let mut response = attachment(&document);
            let headers = response.headers_mut();
            headers.insert(PRINT_JOB_HEADER, HeaderValue::from(job.id.as_i32()));
            if fallback {
                headers.insert(PRINT_FALLBACK_HEADER, HeaderValue::from_static("pdf"));
            }
            response
        }
    })
}

async fn list_print_jobs(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<Vec<PrintJob>>, AppError> {
    ensure(&user, Permission::Print)?;
    let jobs = PrintService::from_state(&state)
        .list_print_jobs(query.limit.unwrap_or(DEFAULT_JOB_LIMIT))
        .await?;
    Ok(Json(jobs))
}

async fn order_document(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path((id, kind)): Path<(OrderId, DocumentKind)>,
) -> Result<Response, AppError> {
    ensure(&user, Permission::Print)?;
    if kind == DocumentKind::ProductLabel {
        return Err(AppError::BadRequest(
            "product labels are printed from the product".to_string(),
        ));
    }
    let document = DocumentService::new(state.stores())
        .render(kind, id.as_i32())
        .await?;
    Ok(attachment(&document))
}

async fn product_label(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Response, AppError> {
    ensure(&user, Permission::Print)?;
    let document = DocumentService::new(state.stores())
        .render(DocumentKind::ProductLabel, id.as_i32())
        .await?;
    Ok(attachment(&document))
}

/// A rendered document as a download.
fn attachment(document: &RenderedDocument) -> Response {
    (
        [
            (header::CONTENT_TYPE, RenderedDocument::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, document.attachment_header()),
        ],
        document.html.clone(),
    )
        .into_response()
}
