use async_trait::async_trait;
use serde_json::{Value, json};

use crate::domain::entities::alert::FailureAlert;
use crate::domain::ports::notifier::{NotificationChannel, NotificationError};

use super::webhook;

/// Posts alerts to a Microsoft Teams incoming webhook as a `MessageCard`.
pub struct TeamsChannel {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl TeamsChannel {
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the HTTP client
    /// cannot be initialized.
    pub fn new(webhook_url: Option<String>) -> Result<Self, NotificationError> {
        Ok(Self {
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            client: webhook::build_client()?,
        })
    }

    #[must_use]
    pub fn payload(alert: &FailureAlert) -> Value {
        json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            "summary": alert.subject(),
            "themeColor": "FF0000",
            "sections": [{
                "activityTitle": format!("Service Failure Alert: {}", alert.service_name),
                "activitySubtitle": format!("Failed {} times recently", alert.failure_count()),
                "facts": [{
                    "name": "Failure Timestamps",
                    "value": alert.formatted_timestamps().join("\n"),
                }],
                "text": "Please check the system manually.",
            }],
        })
    }
}

#[async_trait]
impl NotificationChannel for TeamsChannel {
    fn name(&self) -> &str {
        "teams"
    }

    async fn notify(&self, alert: &FailureAlert) -> Result<(), NotificationError> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Err(NotificationError::NotConfigured(
                "teams webhook_url missing".into(),
            ));
        };
        webhook::post_json(&self.client, url, &Self::payload(alert)).await?;
        tracing::info!(service = %alert.service_name, "teams alert sent");
        Ok(())
    }
}
