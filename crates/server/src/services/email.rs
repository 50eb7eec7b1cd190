//! Email delivery over SMTP via lettre, with askama HTML and text bodies.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// HTML body for customer notifications.
#[derive(Template)]
#[template(path = "email/notification.html")]
struct NotificationEmailHtml<'a> {
    store_name: &'a str,
    heading: &'a str,
    message: &'a str,
    order_number: Option<&'a str>,
}

/// Plain text body for customer notifications.
#[derive(Template)]
#[template(path = "email/notification.txt")]
struct NotificationEmailText<'a> {
    store_name: &'a str,
    message: &'a str,
    order_number: Option<&'a str>,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A notification email ready to render.
#[derive(Debug, Clone, Copy)]
pub struct NotificationEmail<'a> {
    pub store_name: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
    pub order_number: Option<&'a str>,
}

impl NotificationEmail<'_> {
    /// Render the (text, html) bodies.
    pub fn render(&self) -> Result<(String, String), askama::Error> {
        let text = NotificationEmailText {
            store_name: self.store_name,
            message: self.message,
            order_number: self.order_number,
        }
        .render()?;
        let html = NotificationEmailHtml {
            store_name: self.store_name,
            heading: self.subject,
            message: self.message,
            order_number: self.order_number,
        }
        .render()?;
        Ok((text, html))
    }
}

/// SMTP sender for transactional email.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a customer notification.
    pub async fn send_notification(
        &self,
        to: &str,
        email: &NotificationEmail<'_>,
    ) -> Result<(), EmailError> {
        let (text, html) = email.render()?;
        self.send_multipart_email(to, email.subject, &text, &html)
            .await
    }

    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}
