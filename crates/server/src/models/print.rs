//! Print jobs and printer status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thriftstore_core::{DocumentKind, PrintJobId, PrintJobStatus, PrintOutput, UserId};

/// A requested rendering of a receipt or label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: PrintJobId,
    pub document: DocumentKind,
    /// Order ID for receipts and shipping labels, product ID for product labels.
    pub target_id: i32,
    pub output: PrintOutput,
    pub copies: i32,
    pub status: PrintJobStatus,
    pub printer_name: Option<String>,
    pub error: Option<String>,
    pub requested_by: UserId,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPrintJob {
    pub document: DocumentKind,
    pub target_id: i32,
    pub output: PrintOutput,
    pub copies: i32,
    pub printer_name: Option<String>,
    pub requested_by: UserId,
}

/// Print dialog submission.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintRequest {
    pub document: DocumentKind,
    pub target_id: i32,
    pub output: PrintOutput,
    #[serde(default = "default_copies")]
    pub copies: i32,
}

const fn default_copies() -> i32 {
    1
}

/// Result of a printer status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub online: bool,
    pub name: Option<String>,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}
