use chrono::{DateTime, Utc};

use crate::application::services::retention::{self, CleanupReport};
use crate::domain::value_objects::RetentionPolicy;
use crate::infrastructure::persistence::composite::EventStoreSet;
use crate::presentation::cli::formatters::report_fmt;

/// Prune every store once and print how much was removed.
pub async fn run_cleanup(
    stores: &EventStoreSet,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> CleanupReport {
    let report = retention::cleanup(stores, policy, now).await;
    print!("{}", report_fmt::format_cleanup(&report));
    report
}
