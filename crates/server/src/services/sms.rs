//! SMS delivery through an HTTP gateway.
//!
//! The gateway takes a JSON body `{ "to", "message", "sender_id" }` with a
//! bearer API key and answers 2xx on acceptance.

use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use thriftstore_core::PhoneNumber;

use crate::config::SmsConfig;

/// Longest message sent as-is; longer ones are cut to fit.
pub const MAX_SMS_LENGTH: usize = 480;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("SMS gateway rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    message: &'a str,
    sender_id: &'a str,
}

/// Client for the configured SMS gateway.
#[derive(Clone, Copy)]
pub struct SmsGateway<'a> {
    http: &'a reqwest::Client,
    config: &'a SmsConfig,
}

impl<'a> SmsGateway<'a> {
    #[must_use]
    pub const fn new(http: &'a reqwest::Client, config: &'a SmsConfig) -> Self {
        Self { http, config }
    }

    pub async fn send(&self, to: &PhoneNumber, message: &str) -> Result<(), SmsError> {
        let message = truncate(message, MAX_SMS_LENGTH);
        let response = self
            .http
            .post(self.config.api_url.clone())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&SendRequest {
                to: to.as_str(),
                message,
                sender_id: &self.config.sender_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body: truncate(&body, 200).to_owned(),
            });
        }

        tracing::info!(to = %to.last_four(), "SMS sent");
        Ok(())
    }
}

/// Cut `text` to at most `max` bytes on a character boundary.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.get(..end).unwrap_or(text)
}
