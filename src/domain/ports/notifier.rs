use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::alert::FailureAlert;

#[derive(Error, Debug)]
pub enum NotificationError {
    /// Required settings are missing; no delivery was attempted.
    #[error("notification channel not configured: {0}")]
    NotConfigured(String),
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),
}

impl NotificationError {
    /// `true` when the channel refused to send because of missing settings.
    #[must_use]
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}

/// A single escalation channel (email, chat webhook, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver an alert about repeated failures of one service.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::NotConfigured` without any network I/O if
    /// required settings are missing, or a transport error if delivery failed.
    async fn notify(&self, alert: &FailureAlert) -> Result<(), NotificationError>;
}
