use std::time::Duration;

use serde_json::Value;

use crate::domain::ports::notifier::NotificationError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the incoming-webhook channels.
///
/// The timeout covers DNS resolution, connection and response.
pub(super) fn build_client() -> Result<reqwest::Client, NotificationError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| NotificationError::ChannelUnavailable(format!("cannot build HTTP client: {e}")))
}

/// POST `payload` as JSON and map any non-2xx answer to `SendFailed`.
pub(super) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    payload: &Value,
) -> Result<(), NotificationError> {
    let resp = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| NotificationError::ChannelUnavailable(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(NotificationError::SendFailed(format!("HTTP {status}: {body}")))
}
