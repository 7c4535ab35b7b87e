use std::fmt::Write;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::json;

use crate::domain::entities::event::{EventKind, ServiceEvent};
use crate::domain::ports::store::{EventStore, StoreError};

const MEASUREMENT: &str = "service_events";

/// InfluxDB 2.x event store over the HTTP API.
///
/// Each event becomes one point in the `service_events` measurement, tagged by
/// `service` and `event_type`, with fields `success`, `value` and optionally
/// `message`.
pub struct InfluxEventStore {
    base_url: String,
    token: String,
    org: String,
    bucket: String,
    client: reqwest::Client,
}

impl InfluxEventStore {
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if a setting is blank or the HTTP
    /// client cannot be built.
    pub fn new(url: &str, token: &str, org: &str, bucket: &str) -> Result<Self, StoreError> {
        for (field, value) in [("url", url), ("token", token), ("org", org), ("bucket", bucket)] {
            if value.trim().is_empty() {
                return Err(StoreError::ConnectionFailed(format!(
                    "influxdb {field} is not set"
                )));
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StoreError::ConnectionFailed(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            org: org.to_string(),
            bucket: bucket.to_string(),
            client,
        })
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    fn flux_failures_query(&self, service: &str, since: DateTime<Utc>) -> String {
        format!(
            "from(bucket: \"{bucket}\")\n  \
             |> range(start: {start})\n  \
             |> filter(fn: (r) => r._measurement == \"{MEASUREMENT}\" and r.service == \"{service}\" \
             and r.event_type == \"failure\" and r._field == \"success\")\n  \
             |> keep(columns: [\"_time\"])\n  \
             |> sort(columns: [\"_time\"])",
            bucket = flux_escape(&self.bucket),
            start = since.to_rfc3339_opts(SecondsFormat::Nanos, true),
            service = flux_escape(service),
        )
    }
}

/// Render an event as one InfluxDB line-protocol record.
#[must_use]
pub fn to_line_protocol(event: &ServiceEvent) -> String {
    let value = match event.kind() {
        EventKind::Check => i32::from(event.success()),
        EventKind::Restart | EventKind::Failure => 1,
    };
    let mut line = format!(
        "{MEASUREMENT},service={},event_type={} success={},value={value}i",
        escape_tag(event.service_name()),
        event.kind().as_str(),
        event.success(),
    );
    if let Some(message) = event.message() {
        let _ = write!(line, ",message=\"{}\"", escape_field_string(message));
    }
    if let Some(nanos) = event.timestamp().timestamp_nanos_opt() {
        let _ = write!(line, " {nanos}");
    }
    line
}

fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_field_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn flux_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
}

/// Extract every `_time` value from an annotated-CSV query response.
///
/// Tables are separated by blank lines and each starts with its own header
/// row. Annotation rows (`#datatype`, ...) are ignored.
///
/// # Errors
///
/// Returns `StoreError::ReadFailed` if a `_time` cell is not RFC 3339.
pub fn parse_time_column(csv: &str) -> Result<Vec<DateTime<Utc>>, StoreError> {
    let mut times = Vec::new();
    let mut time_idx: Option<usize> = None;

    for line in csv.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            time_idx = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let cells: Vec<&str> = line.split(',').collect();
        match time_idx {
            None => time_idx = cells.iter().position(|c| *c == "_time"),
            Some(idx) => {
                let Some(cell) = cells.get(idx) else {
                    continue;
                };
                let ts = DateTime::parse_from_rfc3339(cell)
                    .map_err(|e| StoreError::ReadFailed(format!("bad _time {cell:?}: {e}")))?;
                times.push(ts.with_timezone(&Utc));
            }
        }
    }

    times.sort_unstable();
    Ok(times)
}

#[async_trait]
impl EventStore for InfluxEventStore {
    fn name(&self) -> &str {
        "influxdb"
    }

    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(format!("{}/api/v2/write", self.base_url))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", self.auth_header())
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(to_line_protocol(event))
            .send()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(StoreError::WriteFailed(format!(
                "influxdb write returned HTTP {}",
                resp.status()
            )));
        }
        tracing::debug!(
            service = event.service_name(),
            kind = %event.kind(),
            "saved event to influxdb"
        );
        Ok(())
    }

    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let resp = self
            .client
            .post(format!("{}/api/v2/query", self.base_url))
            .query(&[("org", self.org.as_str())])
            .header("Authorization", self.auth_header())
            .header("Accept", "application/csv")
            .header("Content-Type", "application/vnd.flux")
            .body(self.flux_failures_query(service, since))
            .send()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(StoreError::ReadFailed(format!(
                "influxdb query returned HTTP {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        parse_time_column(&body)
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        // The delete API treats `stop` as inclusive.
        let stop = cutoff
            .checked_sub_signed(TimeDelta::nanoseconds(1))
            .unwrap_or(cutoff);
        let body = json!({
            "start": "1970-01-01T00:00:00Z",
            "stop": stop.to_rfc3339_opts(SecondsFormat::Nanos, true),
            "predicate": format!("_measurement=\"{MEASUREMENT}\""),
        });

        let resp = self
            .client
            .post(format!("{}/api/v2/delete", self.base_url))
            .query(&[("org", self.org.as_str()), ("bucket", self.bucket.as_str())])
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(StoreError::WriteFailed(format!(
                "influxdb delete returned HTTP {}",
                resp.status()
            )));
        }
        // The delete API does not report how many points were removed.
        Ok(0)
    }
}
