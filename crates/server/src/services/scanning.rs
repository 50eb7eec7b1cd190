//! Barcode scanning workflow.
//!
//! The per-session [`ScanState`] is owned by the caller (it lives in the
//! session); this service validates transitions and records results.

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use thriftstore_core::UserId;

use crate::db::{CatalogStore, RepositoryError, ScanStore};
use crate::error::AppError;
use crate::models::{NewScan, OfflineScan, Product, ScanRecord, ScanState, SyncSummary};

pub const MIN_CODE_LENGTH: usize = 4;
pub const MAX_CODE_LENGTH: usize = 64;
/// Largest offline batch accepted in one upload.
pub const MAX_SYNC_BATCH: usize = 500;
const MAX_HISTORY_PAGE: usize = 200;

/// A recorded scan and the product it matched, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub record: ScanRecord,
    pub product: Option<Product>,
}

pub struct ScanService<'a> {
    scans: &'a dyn ScanStore,
    catalog: &'a dyn CatalogStore,
}

impl<'a> ScanService<'a> {
    #[must_use]
    pub const fn new(scans: &'a dyn ScanStore, catalog: &'a dyn CatalogStore) -> Self {
        Self { scans, catalog }
    }

    /// Enter scanning. Without camera access the state stays idle.
    pub fn start(&self, state: ScanState, camera_granted: bool) -> Result<ScanState, AppError> {
        if !camera_granted {
            return Err(AppError::BadRequest(
                "camera permission is required to scan".to_string(),
            ));
        }
        Ok(match state {
            ScanState::Scanning { .. } => state,
            ScanState::Idle => ScanState::Scanning {
                started_at: Utc::now(),
            },
        })
    }

    #[must_use]
    pub const fn cancel(&self, _state: ScanState) -> ScanState {
        ScanState::Idle
    }

    /// Record a decoded code. The caller returns the session to idle.
    #[instrument(skip(self, state))]
    pub async fn complete(
        &self,
        staff: UserId,
        state: ScanState,
        code: &str,
    ) -> Result<ScanResult, AppError> {
        if state == ScanState::Idle {
            return Err(AppError::BadRequest("start a scan first".to_string()));
        }
        let code = validate_code(code).map_err(|msg| AppError::field("code", msg))?;
        let product = self.catalog.find_product_by_barcode(&code).await?;

        let record = self
            .scans
            .insert_scan(NewScan {
                code,
                product_id: product.as_ref().map(|p| p.id),
                staff_id: staff,
                scanned_at: Utc::now(),
                client_ref: None,
            })
            .await?;
        tracing::info!(
            code = %record.code,
            matched = record.product_id.is_some(),
            "Scan recorded"
        );
        Ok(ScanResult { record, product })
    }

    pub async fn history(&self, staff: UserId, limit: usize) -> Result<Vec<ScanRecord>, AppError> {
        Ok(self
            .scans
            .list_scans(staff, limit.clamp(1, MAX_HISTORY_PAGE))
            .await?)
    }

    pub async fn clear_history(&self, staff: UserId) -> Result<u64, AppError> {
        let removed = self.scans.clear_scans(staff).await?;
        tracing::info!(staff_id = %staff, removed, "Scan history cleared");
        Ok(removed)
    }

    /// Store scans captured while the device was offline.
    ///
    /// Records whose client reference was already uploaded are skipped, so
    /// retrying a sync is harmless. Invalid records are listed by client
    /// reference in `rejected`.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn sync_offline(
        &self,
        staff: UserId,
        records: Vec<OfflineScan>,
    ) -> Result<SyncSummary, AppError> {
        if records.len() > MAX_SYNC_BATCH {
            return Err(AppError::BadRequest(format!(
                "upload at most {MAX_SYNC_BATCH} scans at a time"
            )));
        }

        let mut summary = SyncSummary::default();
        for record in records {
            let client_ref = record.client_ref.trim().to_owned();
            if client_ref.is_empty() {
                summary.rejected.push(format!("{}: missing client reference", record.code));
                continue;
            }
            let code = match validate_code(&record.code) {
                Ok(code) => code,
                Err(msg) => {
                    summary.rejected.push(format!("{client_ref}: {msg}"));
                    continue;
                }
            };
            if self.scans.client_ref_exists(&client_ref).await? {
                summary.skipped += 1;
                continue;
            }

            let product_id = self
                .catalog
                .find_product_by_barcode(&code)
                .await?
                .map(|p| p.id);
            let inserted = self
                .scans
                .insert_scan(NewScan {
                    code,
                    product_id,
                    staff_id: staff,
                    scanned_at: record.scanned_at,
                    client_ref: Some(client_ref),
                })
                .await;
            match inserted {
                Ok(_) => summary.accepted += 1,
                Err(RepositoryError::Conflict(_)) => summary.skipped += 1,
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            accepted = summary.accepted,
            skipped = summary.skipped,
            rejected = summary.rejected.len(),
            "Offline scans synced"
        );
        Ok(summary)
    }
}

/// Trimmed code of 4-64 printable ASCII characters.
pub fn validate_code(code: &str) -> Result<String, String> {
    let code = code.trim();
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len()) {
        return Err(format!(
            "code must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} characters"
        ));
    }
    if !code.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        return Err("code must be printable ASCII".to_owned());
    }
    Ok(code.to_owned())
}
