use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::entities::alert::FailureAlert;
use crate::domain::ports::notifier::{NotificationChannel, NotificationError};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// SMTP settings bound to an [`EmailChannel`] at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub receiver_email: String,
    pub password: Option<String>,
}

/// Sends alerts as plain-text mail over SMTP with STARTTLS, authenticating as
/// the sender.
pub struct EmailChannel {
    settings: EmailSettings,
}

impl EmailChannel {
    #[must_use]
    pub const fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    fn missing_setting(&self) -> Option<&'static str> {
        let s = &self.settings;
        if s.password.as_deref().is_none_or(|p| p.is_empty()) {
            Some("password")
        } else if s.smtp_server.trim().is_empty() {
            Some("smtp_server")
        } else if s.sender_email.trim().is_empty() {
            Some("sender_email")
        } else if s.receiver_email.trim().is_empty() {
            Some("receiver_email")
        } else {
            None
        }
    }

    fn build_message(&self, alert: &FailureAlert) -> Result<Message, NotificationError> {
        let from: Mailbox = self.settings.sender_email.parse().map_err(|e| {
            NotificationError::SendFailed(format!(
                "invalid sender address {:?}: {e}",
                self.settings.sender_email
            ))
        })?;
        let to: Mailbox = self.settings.receiver_email.parse().map_err(|e| {
            NotificationError::SendFailed(format!(
                "invalid receiver address {:?}: {e}",
                self.settings.receiver_email
            ))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.text_body())
            .map_err(|e| NotificationError::SendFailed(format!("cannot build message: {e}")))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, alert: &FailureAlert) -> Result<(), NotificationError> {
        if let Some(field) = self.missing_setting() {
            return Err(NotificationError::NotConfigured(format!(
                "email {field} missing"
            )));
        }
        let message = self.build_message(alert)?;

        let credentials = Credentials::new(
            self.settings.sender_email.clone(),
            self.settings.password.clone().unwrap_or_default(),
        );
        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.smtp_server)
                .map_err(|e| NotificationError::ChannelUnavailable(e.to_string()))?
                .port(self.settings.smtp_port)
                .credentials(credentials)
                .timeout(Some(SMTP_TIMEOUT))
                .build();

        transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        tracing::info!(service = %alert.service_name, "email alert sent");
        Ok(())
    }
}
