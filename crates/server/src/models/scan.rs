//! Barcode scanning workflow types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thriftstore_core::{ProductId, ScanId, UserId};

/// A recorded scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub code: String,
    pub product_id: Option<ProductId>,
    pub staff_id: UserId,
    pub scanned_at: DateTime<Utc>,
    /// Device-generated reference for scans captured offline.
    pub client_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewScan {
    pub code: String,
    pub product_id: Option<ProductId>,
    pub staff_id: UserId,
    pub scanned_at: DateTime<Utc>,
    pub client_ref: Option<String>,
}

/// Scanner screen state, kept per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    #[default]
    Idle,
    Scanning { started_at: DateTime<Utc> },
}

/// A scan captured while the device was offline.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineScan {
    pub code: String,
    pub scanned_at: DateTime<Utc>,
    pub client_ref: String,
}

/// Outcome of an offline sync upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub accepted: usize,
    pub skipped: usize,
    pub rejected: Vec<String>,
}
