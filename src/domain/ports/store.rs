use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::event::ServiceEvent;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage connection failed: {0}")]
    ConnectionFailed(String),
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("operation not supported by this backend: {0}")]
    Unsupported(String),
}

/// Durable (or process-local) log of service events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Short backend label used in logs and failure-source reporting.
    fn name(&self) -> &str;

    /// Append an event.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend is unreachable or rejects the write.
    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError>;

    /// Timestamps of `Failure` events for `service` at or after `since`,
    /// oldest first. An empty list means no data is available.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be queried.
    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError>;

    /// Delete every event strictly older than `cutoff`. Returns how many
    /// events were removed when the backend can tell.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the deletion fails.
    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        (**self).save(event).await
    }

    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        (**self).failures_since(service, since).await
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        (**self).prune_older_than(cutoff).await
    }
}
