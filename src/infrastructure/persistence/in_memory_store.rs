use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::event::ServiceEvent;
use crate::domain::ports::store::{EventStore, StoreError};

/// Process-local event store. Used in tests and when no database is configured.
pub struct InMemoryEventStore {
    events: Mutex<Vec<ServiceEvent>>,
}

impl InMemoryEventStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Copy of every stored event, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lock is poisoned.
    pub fn events(&self) -> Result<Vec<ServiceEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .push(event.clone());
        Ok(())
    }

    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let mut failures: Vec<DateTime<Utc>> = self
            .events
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .iter()
            .filter(|e| e.is_failure() && e.service_name() == service && e.timestamp() >= since)
            .map(ServiceEvent::timestamp)
            .collect();
        failures.sort_unstable();
        Ok(failures)
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let before = events.len();
        events.retain(|e| e.timestamp() >= cutoff);
        let removed = before - events.len();
        drop(events);
        Ok(removed as u64)
    }
}
