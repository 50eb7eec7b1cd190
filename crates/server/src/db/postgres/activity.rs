//! Print job, scan and notification logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use thriftstore_core::{
    NotificationId, OrderId, PrintJobId, PrintJobStatus, ProductId, ScanId, UserId,
};

use super::{PgStore, conflict_or_database, parse_column, sql_limit};
use crate::db::{NotificationStore, PrintJobStore, RepoResult, RepositoryError, ScanStore};
use crate::models::{
    DeliveryOutcome, NewNotification, NewPrintJob, NewScan, NotificationEvent,
    NotificationRecord, PrintJob, ScanRecord,
};

// =============================================================================
// Print jobs
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PrintJobRow {
    id: i32,
    document: String,
    target_id: i32,
    output: String,
    copies: i32,
    status: String,
    printer_name: Option<String>,
    error: Option<String>,
    requested_by: i32,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PrintJobRow> for PrintJob {
    type Error = RepositoryError;

    fn try_from(row: PrintJobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PrintJobId::new(row.id),
            document: parse_column("document kind", &row.document)?,
            target_id: row.target_id,
            output: parse_column("print output", &row.output)?,
            copies: row.copies,
            status: parse_column("print job status", &row.status)?,
            printer_name: row.printer_name,
            error: row.error,
            requested_by: UserId::new(row.requested_by),
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

const PRINT_JOB_COLUMNS: &str = "id, document, target_id, output, copies, status, printer_name, \
     error, requested_by, created_at, completed_at";

#[async_trait]
impl PrintJobStore for PgStore {
    async fn insert_print_job(&self, job: NewPrintJob) -> RepoResult<PrintJob> {
        let row = sqlx::query_as::<_, PrintJobRow>(&format!(
            r"
            INSERT INTO print_jobs (document, target_id, output, copies, status, printer_name,
                                    requested_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRINT_JOB_COLUMNS}
            "
        ))
        .bind(job.document.as_str())
        .bind(job.target_id)
        .bind(job.output.as_str())
        .bind(job.copies)
        .bind(PrintJobStatus::Queued.as_str())
        .bind(&job.printer_name)
        .bind(job.requested_by.as_i32())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn finish_print_job(
        &self,
        id: PrintJobId,
        status: PrintJobStatus,
        error: Option<String>,
    ) -> RepoResult<PrintJob> {
        let row = sqlx::query_as::<_, PrintJobRow>(&format!(
            r"
            UPDATE print_jobs SET status = $2, error = $3, completed_at = NOW()
            WHERE id = $1
            RETURNING {PRINT_JOB_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(status.as_str())
        .bind(&error)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        row.try_into()
    }

    async fn list_print_jobs(&self, limit: usize) -> RepoResult<Vec<PrintJob>> {
        let rows = sqlx::query_as::<_, PrintJobRow>(&format!(
            "SELECT {PRINT_JOB_COLUMNS} FROM print_jobs ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// =============================================================================
// Scans
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ScanRow {
    id: i32,
    code: String,
    product_id: Option<i32>,
    staff_id: i32,
    scanned_at: DateTime<Utc>,
    client_ref: Option<String>,
}

impl From<ScanRow> for ScanRecord {
    fn from(row: ScanRow) -> Self {
        Self {
            id: ScanId::new(row.id),
            code: row.code,
            product_id: row.product_id.map(ProductId::new),
            staff_id: UserId::new(row.staff_id),
            scanned_at: row.scanned_at,
            client_ref: row.client_ref,
        }
    }
}

#[async_trait]
impl ScanStore for PgStore {
    async fn insert_scan(&self, scan: NewScan) -> RepoResult<ScanRecord> {
        let row = sqlx::query_as::<_, ScanRow>(
            r"
            INSERT INTO scan_history (code, product_id, staff_id, scanned_at, client_ref)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, code, product_id, staff_id, scanned_at, client_ref
            ",
        )
        .bind(&scan.code)
        .bind(scan.product_id.map(ProductId::as_i32))
        .bind(scan.staff_id.as_i32())
        .bind(scan.scanned_at)
        .bind(&scan.client_ref)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "scan already recorded"))?;
        Ok(row.into())
    }

    async fn list_scans(&self, staff: UserId, limit: usize) -> RepoResult<Vec<ScanRecord>> {
        let rows = sqlx::query_as::<_, ScanRow>(
            r"
            SELECT id, code, product_id, staff_id, scanned_at, client_ref
            FROM scan_history
            WHERE staff_id = $1
            ORDER BY scanned_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(staff.as_i32())
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn clear_scans(&self, staff: UserId) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM scan_history WHERE staff_id = $1")
            .bind(staff.as_i32())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn client_ref_exists(&self, client_ref: &str) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM scan_history WHERE client_ref = $1)",
        )
        .bind(client_ref)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i32,
    order_id: Option<i32>,
    event: String,
    channel: String,
    recipient: String,
    message: String,
    outcome: String,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let event = NotificationEvent::parse(&row.event).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid event in database: {}", row.event))
        })?;
        let outcome = DeliveryOutcome::parse(&row.outcome).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "invalid outcome in database: {}",
                row.outcome
            ))
        })?;

        Ok(Self {
            id: NotificationId::new(row.id),
            order_id: row.order_id.map(OrderId::new),
            event,
            channel: parse_column("channel", &row.channel)?,
            recipient: row.recipient,
            message: row.message,
            outcome,
            error: row.error,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<NotificationRecord> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r"
            INSERT INTO notifications (order_id, event, channel, recipient, message, outcome, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, order_id, event, channel, recipient, message, outcome, error, created_at
            ",
        )
        .bind(notification.order_id.map(OrderId::as_i32))
        .bind(notification.event.as_str())
        .bind(notification.channel.as_str())
        .bind(&notification.recipient)
        .bind(&notification.message)
        .bind(notification.outcome.as_str())
        .bind(&notification.error)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_notifications(&self, limit: usize) -> RepoResult<Vec<NotificationRecord>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, order_id, event, channel, recipient, message, outcome, error, created_at
            FROM notifications
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
