use chrono::{DateTime, Utc};

use crate::domain::entities::event::ServiceEvent;
use crate::domain::ports::store::EventStore;

/// Fans every operation out to all configured event stores.
///
/// Store errors are logged and never propagated: one broken backend must not
/// stop the others from recording.
pub struct EventStoreSet {
    stores: Vec<Box<dyn EventStore>>,
}

impl EventStoreSet {
    #[must_use]
    pub fn new(stores: Vec<Box<dyn EventStore>>) -> Self {
        Self { stores }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.name()).collect()
    }

    /// Save `event` to every store. Returns `true` if at least one store
    /// accepted it, or if there are no stores at all.
    pub async fn save(&self, event: &ServiceEvent) -> bool {
        if self.stores.is_empty() {
            return true;
        }
        let mut accepted = false;
        for store in &self.stores {
            match store.save(event).await {
                Ok(()) => accepted = true,
                Err(e) => tracing::warn!(
                    store = store.name(),
                    service = event.service_name(),
                    "failed to save {} event: {e}",
                    event.kind()
                ),
            }
        }
        accepted
    }

    /// Failure timestamps from the first store, in configuration order, that
    /// returns a non-empty list. Errors count as "no data".
    pub async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Option<(String, Vec<DateTime<Utc>>)> {
        for store in &self.stores {
            match store.failures_since(service, since).await {
                Ok(failures) if !failures.is_empty() => {
                    return Some((store.name().to_string(), failures));
                }
                Ok(_) => tracing::debug!(store = store.name(), service, "no failures in store"),
                Err(e) => tracing::warn!(
                    store = store.name(),
                    service,
                    "failed to query failures: {e}"
                ),
            }
        }
        None
    }

    /// Delete events older than `cutoff` in every store. Returns the total
    /// reported by the stores that can count.
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> u64 {
        let mut removed = 0;
        for store in &self.stores {
            match store.prune_older_than(cutoff).await {
                Ok(n) => {
                    tracing::debug!(store = store.name(), removed = n, "pruned old events");
                    removed += n;
                }
                Err(e) => tracing::warn!(store = store.name(), "failed to prune events: {e}"),
            }
        }
        removed
    }
}

impl Default for EventStoreSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
