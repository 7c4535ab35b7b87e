use async_trait::async_trait;
use serde_json::{Value, json};

use crate::domain::entities::alert::FailureAlert;
use crate::domain::ports::notifier::{NotificationChannel, NotificationError};

use super::webhook;

/// Posts alerts to a Slack incoming webhook using Block Kit sections.
pub struct SlackChannel {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl SlackChannel {
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
        let bullets = alert
            .formatted_timestamps()
            .iter()
            .map(|ts| format!("• {ts}"))
            .collect::<Vec<_>>()
            .join("\n");

        json!({
            "text": format!(
                "🚨 *ALERT*: Service `{}` has failed multiple times",
                alert.service_name
            ),
            "blocks": [
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!(
                            "🚨 *ALERT*: Service `{}` has failed {} times recently.",
                            alert.service_name,
                            alert.failure_count()
                        ),
                    }
                },
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!("*Failure timestamps:*\n{bullets}"),
                    }
                }
            ]
        })
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, alert: &FailureAlert) -> Result<(), NotificationError> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Err(NotificationError::NotConfigured(
                "slack webhook_url missing".into(),
            ));
        };
        webhook::post_json(&self.client, url, &Self::payload(alert)).await?;
        tracing::info!(service = %alert.service_name, "slack alert sent");
        Ok(())
    }
}
