use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::entities::failure_window::{
    FailureSnapshot, FailureSource, FailureWindow, within,
};
use crate::domain::value_objects::AlertPolicy;
use crate::infrastructure::persistence::composite::EventStoreSet;

/// Per-service rolling failure windows and the alert decision built on them.
///
/// The map is only mutated through [`AlertTracker::record_failure`] and
/// reads prune before returning, so no caller ever sees an expired entry.
#[derive(Debug, Clone, Default)]
pub struct AlertTracker {
    policy: AlertPolicy,
    windows: HashMap<String, FailureWindow>,
}

impl AlertTracker {
    #[must_use]
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            windows: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Append `now` to the service's window, prune, and decide.
    pub fn record_failure(&mut self, service: &str, now: DateTime<Utc>) -> FailureSnapshot {
        let window = self.windows.entry(service.to_string()).or_default();
        window.push(now);
        window.prune(now, self.policy.window());
        let failures = window.timestamps().to_vec();
        self.snapshot(failures, FailureSource::Memory)
    }

    /// In-window failures for `service` as of `now`.
    pub fn current_failures(&mut self, service: &str, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let Some(window) = self.windows.get_mut(service) else {
            return Vec::new();
        };
        window.prune(now, self.policy.window());
        window.timestamps().to_vec()
    }

    /// Record the failure in memory, then prefer the first event store that
    /// has data for the window. Falls back to memory when every store is
    /// empty or unreachable.
    pub async fn evaluate_failure(
        &mut self,
        service: &str,
        now: DateTime<Utc>,
        stores: &EventStoreSet,
    ) -> FailureSnapshot {
        let memory = self.record_failure(service, now);
        let window = self.policy.window();

        match stores
            .failures_since(service, self.policy.window_start(now))
            .await
        {
            Some((store, mut failures)) => {
                failures.retain(|ts| within(now, *ts, window));
                failures.sort_unstable();
                tracing::debug!(
                    service,
                    store = %store,
                    count = failures.len(),
                    "alert decision from event store"
                );
                self.snapshot(failures, FailureSource::Store(store))
            }
            None => {
                tracing::debug!(
                    service,
                    count = memory.count(),
                    "no store data, alert decision from memory"
                );
                memory
            }
        }
    }

    fn snapshot(&self, failures: Vec<DateTime<Utc>>, source: FailureSource) -> FailureSnapshot {
        FailureSnapshot {
            should_alert: self.policy.should_alert(failures.len()),
            failures,
            source,
        }
    }
}
