use std::fmt::Write;

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::application::services::retention::CleanupReport;
use crate::application::services::scanner::{ScanReport, ServiceOutcome};
use crate::domain::entities::alert::TIMESTAMP_FORMAT;

/// Strips ANSI/OSC escape sequences from a string to prevent terminal injection.
fn sanitize_terminal(input: &str) -> String {
    input.chars().filter(|c| *c != '\x1b').collect()
}

fn outcome_badge(outcome: &ServiceOutcome) -> String {
    match outcome {
        ServiceOutcome::Running => format!("{}", " RUNNING ".on_green().black().bold()),
        ServiceOutcome::Restarted => format!("{}", " RESTARTED ".on_yellow().black().bold()),
        ServiceOutcome::RestartFailed { .. } => format!("{}", " FAILED ".on_red().white().bold()),
    }
}

fn outcome_detail(outcome: &ServiceOutcome) -> String {
    match outcome {
        ServiceOutcome::Running => String::new(),
        ServiceOutcome::Restarted => "restart succeeded".dimmed().to_string(),
        ServiceOutcome::RestartFailed {
            failures,
            alerted: true,
        } => format!("{failures} failure(s) in window, alert sent")
            .red()
            .bold()
            .to_string(),
        ServiceOutcome::RestartFailed {
            failures,
            alerted: false,
        } => format!("{failures} failure(s) in window").yellow().to_string(),
    }
}

#[must_use]
pub fn format_scan_report(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        "Scan".bold().cyan(),
        report.started_at.format(TIMESTAMP_FORMAT).to_string().dimmed()
    );
    if report.services.is_empty() && !report.cancelled {
        let _ = writeln!(out, "  {}", "no services configured".dimmed());
    }
    for entry in &report.services {
        let _ = writeln!(
            out,
            "  {} {} {}",
            outcome_badge(&entry.outcome),
            sanitize_terminal(&entry.service).bold(),
            outcome_detail(&entry.outcome)
        );
    }
    if report.cancelled {
        let _ = writeln!(out, "  {}", "scan interrupted by shutdown".yellow());
    }
    out
}

#[must_use]
pub fn format_failures(
    service: &str,
    source: Option<&str>,
    failures: &[DateTime<Utc>],
) -> String {
    let service = sanitize_terminal(service);
    if failures.is_empty() {
        return format!(
            "{}\n",
            format!("No recorded failures for {service}").green().bold()
        );
    }
    let mut out = format!(
        "{} failure(s) for {}",
        failures.len().to_string().red().bold(),
        service.bold()
    );
    if let Some(source) = source {
        let _ = write!(out, " {}", format!("(from {source})").dimmed());
    }
    out.push('\n');
    for ts in failures {
        let _ = writeln!(out, "  • {}", ts.format(TIMESTAMP_FORMAT));
    }
    out
}

#[must_use]
pub fn format_cleanup(report: &CleanupReport) -> String {
    format!(
        "Removed {} event(s) older than {}\n",
        report.removed.to_string().bold(),
        report.cutoff.format(TIMESTAMP_FORMAT)
    )
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use chrono::TimeDelta;
    use colored::control;

    use super::*;
    use crate::application::services::scanner::ServiceReport;

    fn disable_colors() {
        control::set_override(false);
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T10:00:00Z")
            .expect("parse")
            .with_timezone(&Utc)
    }

    #[test]
    fn scan_report_lists_every_service() {
        disable_colors();
        let report = ScanReport {
            started_at: t0(),
            services: vec![
                ServiceReport {
                    service: "nginx".into(),
                    outcome: ServiceOutcome::Running,
                },
                ServiceReport {
                    service: "redis".into(),
                    outcome: ServiceOutcome::RestartFailed {
                        failures: 3,
                        alerted: true,
                    },
                },
            ],
            cancelled: false,
        };
        let out = format_scan_report(&report);
        assert!(out.contains("2025-01-01 10:00:00"));
        assert!(out.contains("RUNNING  nginx"));
        assert!(out.contains("FAILED  redis 3 failure(s) in window, alert sent"));
        assert!(!out.contains("interrupted"));
    }

    #[test]
    fn cancelled_scan_is_flagged() {
        disable_colors();
        let report = ScanReport {
            started_at: t0(),
            services: Vec::new(),
            cancelled: true,
        };
        assert!(format_scan_report(&report).contains("scan interrupted by shutdown"));
    }

    #[test]
    fn failures_listed_with_source() {
        disable_colors();
        let out = format_failures(
            "nginx",
            Some("sqlite"),
            &[t0(), t0() + TimeDelta::minutes(10)],
        );
        assert!(out.starts_with("2 failure(s) for nginx (from sqlite)"));
        assert!(out.contains("  • 2025-01-01 10:10:00"));
    }

    #[test]
    fn no_failures_message() {
        disable_colors();
        assert_eq!(
            format_failures("nginx", None, &[]),
            "No recorded failures for nginx\n"
        );
    }

    #[test]
    fn service_names_are_sanitized() {
        disable_colors();
        let out = format_failures("evil\x1b[31m", None, &[]);
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn cleanup_summary() {
        disable_colors();
        let out = format_cleanup(&CleanupReport {
            cutoff: t0(),
            removed: 4,
        });
        assert_eq!(out, "Removed 4 event(s) older than 2025-01-01 10:00:00\n");
    }
}
