use chrono::{DateTime, Utc};

/// Display format used for failure timestamps in every channel payload.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Escalation payload handed to notification channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureAlert {
    pub service_name: String,
    failures: Vec<DateTime<Utc>>,
}

impl FailureAlert {
    /// Build an alert; failures are sorted so every channel renders them in
    /// chronological order regardless of which source produced them.
    #[must_use]
    pub fn new(service_name: impl Into<String>, mut failures: Vec<DateTime<Utc>>) -> Self {
        failures.sort_unstable();
        Self {
            service_name: service_name.into(),
            failures,
        }
    }

    #[must_use]
    pub fn failures(&self) -> &[DateTime<Utc>] {
        &self.failures
    }

    #[must_use]
    pub const fn failure_count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn subject(&self) -> String {
        format!(
            "ALERT: Service {} has failed multiple times",
            self.service_name
        )
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "The service {} has failed {} times recently.",
            self.service_name,
            self.failure_count()
        )
    }

    /// Human-readable timestamps, oldest first.
    #[must_use]
    pub fn formatted_timestamps(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .collect()
    }

    /// Plain-text body shared by text-only channels.
    #[must_use]
    pub fn text_body(&self) -> String {
        format!(
            "{}\n\nFailure timestamps (UTC):\n{}\n\nPlease check the system manually.\n\n--\nservice-doctor",
            self.summary(),
            self.formatted_timestamps().join("\n")
        )
    }
}
