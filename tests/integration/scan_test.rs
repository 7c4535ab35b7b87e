#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use service_doctor::application::config::AppConfig;
use service_doctor::application::services::alert_tracker::AlertTracker;
use service_doctor::application::services::scanner::{Scanner, ServiceOutcome};
use service_doctor::domain::ports::clock::Clock;
use service_doctor::domain::ports::probe::{ProbeError, ServiceProbe};
use service_doctor::domain::ports::store::EventStore;
use service_doctor::infrastructure::persistence::jsonl_store::JsonlEventStore;
use service_doctor::infrastructure::registry::{build_channels, build_stores};

// ---------------------------------------------------------------------------
// Fixture loader
// ---------------------------------------------------------------------------

fn load_fixture(name: &str) -> AppConfig {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    AppConfig::load_from(&path).expect("Failed to load fixture")
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Services listed in `down` are stopped and cannot be restarted.
struct StaticProbe {
    down: Vec<&'static str>,
}

#[async_trait]
impl ServiceProbe for StaticProbe {
    async fn is_running(&self, service: &str) -> Result<bool, ProbeError> {
        Ok(!self.down.contains(&service))
    }

    async fn restart(&self, _service: &str) -> Result<(), ProbeError> {
        Err(ProbeError::Failed("Job for unit failed".into()))
    }
}

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    fn advance(&self, minutes: i64) {
        *self.0.lock().expect("lock") += TimeDelta::minutes(minutes);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("lock")
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T09:00:00Z")
        .expect("parse")
        .with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fixture_config_drives_a_full_escalation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let events_path = dir.path().join("events.jsonl");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .and(body_string_contains("postgresql"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = load_fixture("service-doctor.toml");
    config.validate().expect("fixture is valid");
    let env = HashMap::from([
        ("SLACK_WEBHOOK_URL", format!("{}/slack", server.uri())),
    ]);
    config.apply_env_overrides(|name| env.get(name).cloned());
    config.stores[0].path = Some(events_path.to_str().expect("utf8").into());

    let stores = build_stores(&config.stores);
    assert_eq!(stores.names(), vec!["jsonl"]);
    let channels = build_channels(&config.channels);
    assert_eq!(channels.names(), vec!["slack", "email"]);

    let probe = StaticProbe {
        down: vec!["postgresql"],
    };
    let clock = ManualClock::at(t0());
    let mut scanner = Scanner::new(
        config.general.services.clone(),
        &probe,
        &stores,
        &channels,
        &clock,
        AlertTracker::new(config.alert_policy().expect("policy")),
    );
    let cancel = CancellationToken::new();

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        let report = scanner.scan_once(&cancel).await;
        assert_eq!(report.services[0].outcome, ServiceOutcome::Running);
        outcomes.push(report.services[1].outcome);
        clock.advance(10);
    }

    assert_eq!(
        outcomes,
        vec![
            ServiceOutcome::RestartFailed {
                failures: 1,
                alerted: false
            },
            ServiceOutcome::RestartFailed {
                failures: 2,
                alerted: false
            },
            ServiceOutcome::RestartFailed {
                failures: 3,
                alerted: true
            },
        ]
    );

    // 3 checks for nginx, 3 x (restart + failure) for postgresql.
    let content = std::fs::read_to_string(&events_path).expect("events file");
    assert_eq!(content.lines().count(), 9);

    let reopened = JsonlEventStore::new(events_path.to_str().expect("utf8")).expect("store");
    let failures = reopened
        .failures_since("postgresql", t0())
        .await
        .expect("query");
    assert_eq!(
        failures,
        vec![t0(), t0() + TimeDelta::minutes(10), t0() + TimeDelta::minutes(20)]
    );
}

#[tokio::test]
async fn healthy_services_never_alert() {
    let config = load_fixture("service-doctor.toml");
    let stores = build_stores(&[]);
    let channels = build_channels(&[]);
    let probe = StaticProbe { down: Vec::new() };
    let clock = ManualClock::at(t0());
    let mut scanner = Scanner::new(
        config.general.services.clone(),
        &probe,
        &stores,
        &channels,
        &clock,
        AlertTracker::new(config.alert_policy().expect("policy")),
    );

    let report = scanner.scan_once(&CancellationToken::new()).await;
    assert_eq!(report.services.len(), 2);
    assert_eq!(report.alerts_sent(), 0);
    assert!(report
        .services
        .iter()
        .all(|s| s.outcome == ServiceOutcome::Running));
}
