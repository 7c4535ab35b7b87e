use tokio_util::sync::CancellationToken;

use crate::application::services::scanner::{ScanReport, Scanner};
use crate::presentation::cli::formatters::report_fmt;

/// Runs a single scan cycle and prints the report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn run_scan(
    scanner: &mut Scanner<'_>,
    cancel: &CancellationToken,
    json: bool,
) -> anyhow::Result<ScanReport> {
    let report = scanner.scan_once(cancel).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report_fmt::format_scan_report(&report));
    }
    Ok(report)
}
