use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::domain::value_objects::policy::saturating_sub;
use crate::infrastructure::persistence::composite::EventStoreSet;
use crate::presentation::cli::formatters::report_fmt;

#[derive(Debug, Serialize)]
struct FailuresOutput<'a> {
    service: &'a str,
    since: DateTime<Utc>,
    source: Option<&'a str>,
    failures: &'a [DateTime<Utc>],
}

/// List the failures of `service` recorded since `now - lookback`, taken
/// from the first store that has any.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn run_failures(
    stores: &EventStoreSet,
    service: &str,
    lookback: TimeDelta,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<Vec<DateTime<Utc>>> {
    let since = saturating_sub(now, lookback);
    let (source, failures) = match stores.failures_since(service, since).await {
        Some((source, failures)) => (Some(source), failures),
        None => (None, Vec::new()),
    };

    if json {
        let output = FailuresOutput {
            service,
            since,
            source: source.as_deref(),
            failures: &failures,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!(
            "{}",
            report_fmt::format_failures(service, source.as_deref(), &failures)
        );
    }
    Ok(failures)
}
