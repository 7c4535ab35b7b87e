use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("service name must not be empty")]
    EmptyServiceName,
}

/// Kind of observation recorded for a service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Check,
    Restart,
    Failure,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Restart => "restart",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(Self::Check),
            "restart" => Ok(Self::Restart),
            "failure" => Ok(Self::Failure),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// One observation of a monitored service.
///
/// Serializes to the backend-agnostic persisted shape:
/// `{service, event_type, success, timestamp, message?}`.
/// Fields are private; once built an event cannot be changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEvent {
    #[serde(rename = "service")]
    service_name: String,
    #[serde(rename = "event_type")]
    kind: EventKind,
    success: bool,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ServiceEvent {
    /// # Errors
    ///
    /// Returns `EventError::EmptyServiceName` if `service_name` is blank.
    pub fn new(
        service_name: impl Into<String>,
        kind: EventKind,
        success: bool,
        timestamp: DateTime<Utc>,
        message: Option<String>,
    ) -> Result<Self, EventError> {
        let service_name = service_name.into();
        if service_name.trim().is_empty() {
            return Err(EventError::EmptyServiceName);
        }
        Ok(Self {
            service_name,
            kind,
            success,
            timestamp,
            message,
        })
    }

    /// Successful liveness check.
    ///
    /// # Errors
    ///
    /// Returns `EventError::EmptyServiceName` if `service_name` is blank.
    pub fn check(service_name: &str, timestamp: DateTime<Utc>) -> Result<Self, EventError> {
        Self::new(service_name, EventKind::Check, true, timestamp, None)
    }

    /// Outcome of a restart attempt.
    ///
    /// # Errors
    ///
    /// Returns `EventError::EmptyServiceName` if `service_name` is blank.
    pub fn restart(
        service_name: &str,
        success: bool,
        timestamp: DateTime<Utc>,
        message: Option<String>,
    ) -> Result<Self, EventError> {
        Self::new(service_name, EventKind::Restart, success, timestamp, message)
    }

    /// A failure: the service was down and the restart attempt failed too.
    ///
    /// # Errors
    ///
    /// Returns `EventError::EmptyServiceName` if `service_name` is blank.
    pub fn failure(
        service_name: &str,
        timestamp: DateTime<Utc>,
        message: Option<String>,
    ) -> Result<Self, EventError> {
        Self::new(service_name, EventKind::Failure, false, timestamp, message)
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.kind, EventKind::Failure)
    }
}
