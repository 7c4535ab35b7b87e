use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::RetentionPolicy;
use crate::infrastructure::persistence::composite::EventStoreSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub cutoff: DateTime<Utc>,
    /// Events removed, as reported by the stores that can count.
    pub removed: u64,
}

/// Delete every persisted event older than the retention period.
pub async fn cleanup(
    stores: &EventStoreSet,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> CleanupReport {
    let cutoff = policy.cutoff(now);
    tracing::info!("Cleaning up events older than {}", cutoff.to_rfc3339());
    let removed = stores.prune_older_than(cutoff).await;
    tracing::info!(removed, "Cleanup complete");
    CleanupReport { cutoff, removed }
}
