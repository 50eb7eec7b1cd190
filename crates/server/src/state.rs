//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::ServerConfig;
use crate::db::Stores;
use crate::error::AppError;
use crate::models::PrinterStatus;
use crate::services::email::EmailService;

/// How long a printer status check is reused before asking again.
pub const PRINTER_STATUS_TTL: Duration = Duration::from_secs(30);

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    stores: Stores,
    http: reqwest::Client,
    email: Option<EmailService>,
    printer_status: Cache<(), PrinterStatus>,
}

impl AppState {
    /// Build state from configuration and repositories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client or SMTP transport
    /// cannot be constructed.
    pub fn new(config: ServerConfig, stores: Stores) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(OUTBOUND_TIMEOUT)
            .user_agent(concat!("thriftstore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        let email = config
            .email
            .as_ref()
            .map(EmailService::new)
            .transpose()
            .map_err(|e| AppError::Internal(format!("failed to configure SMTP: {e}")))?;

        let printer_status = Cache::builder()
            .max_capacity(1)
            .time_to_live(PRINTER_STATUS_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                http,
                email,
                printer_status,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Shared client for the SMS gateway and print server.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// SMTP delivery, when configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    #[must_use]
    pub fn printer_status_cache(&self) -> &Cache<(), PrinterStatus> {
        &self.inner.printer_status
    }
}
