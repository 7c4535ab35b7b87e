#![allow(clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use service_doctor::application::services::alert_tracker::AlertTracker;
use service_doctor::application::services::scanner::{Scanner, ServiceOutcome};
use service_doctor::domain::entities::{FailureAlert, FailureSource, ServiceEvent};
use service_doctor::domain::ports::{
    Clock, EventStore, ProbeError, ServiceProbe, StoreError,
};
use service_doctor::domain::value_objects::AlertPolicy;
use service_doctor::infrastructure::notifications::composite::ChannelSet;
use service_doctor::infrastructure::notifications::slack::SlackChannel;
use service_doctor::infrastructure::notifications::teams::TeamsChannel;
use service_doctor::infrastructure::persistence::composite::EventStoreSet;
use service_doctor::infrastructure::persistence::in_memory_store::InMemoryEventStore;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Always down; restart results are replayed in order, failing once exhausted.
struct ScriptedProbe {
    restarts: Mutex<VecDeque<bool>>,
}

impl ScriptedProbe {
    fn new(restarts: &[bool]) -> Self {
        Self {
            restarts: Mutex::new(restarts.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl ServiceProbe for ScriptedProbe {
    async fn is_running(&self, _service: &str) -> Result<bool, ProbeError> {
        Ok(false)
    }

    async fn restart(&self, _service: &str) -> Result<(), ProbeError> {
        let ok = self
            .restarts
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(false);
        if ok {
            Ok(())
        } else {
            Err(ProbeError::Failed("unit entered failed state".into()))
        }
    }
}

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().expect("lock") = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("lock")
    }
}

struct UnreachableStore;

#[async_trait]
impl EventStore for UnreachableStore {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn save(&self, _event: &ServiceEvent) -> Result<(), StoreError> {
        Err(StoreError::ConnectionFailed("connection refused".into()))
    }

    async fn failures_since(
        &self,
        _service: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        Err(StoreError::ConnectionFailed("connection refused".into()))
    }

    async fn prune_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::ConnectionFailed("connection refused".into()))
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-10T14:00:00Z")
        .expect("parse")
        .with_timezone(&Utc)
}

fn minutes(m: i64) -> DateTime<Utc> {
    t0() + TimeDelta::minutes(m)
}

fn hourly_policy() -> AlertPolicy {
    AlertPolicy::from_hours(1.0, 3).expect("valid policy")
}

// ---------------------------------------------------------------------------
// Window arithmetic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn third_failure_within_the_hour_alerts() {
    let stores = EventStoreSet::default();
    let mut tracker = AlertTracker::new(hourly_policy());

    let first = tracker.evaluate_failure("nginx", minutes(0), &stores).await;
    let second = tracker.evaluate_failure("nginx", minutes(10), &stores).await;
    let third = tracker.evaluate_failure("nginx", minutes(20), &stores).await;

    assert_eq!((first.count(), first.should_alert), (1, false));
    assert_eq!((second.count(), second.should_alert), (2, false));
    assert_eq!((third.count(), third.should_alert), (3, true));
    assert_eq!(third.failures, vec![minutes(0), minutes(10), minutes(20)]);
    assert_eq!(third.source, FailureSource::Memory);
}

#[tokio::test]
async fn failures_older_than_the_window_expire() {
    let stores = EventStoreSet::default();
    let mut tracker = AlertTracker::new(hourly_policy());

    tracker.evaluate_failure("nginx", minutes(0), &stores).await;
    let later = tracker.evaluate_failure("nginx", minutes(70), &stores).await;

    assert_eq!(later.failures, vec![minutes(70)]);
    assert!(!later.should_alert);
}

#[tokio::test]
async fn services_escalate_independently() {
    let stores = EventStoreSet::default();
    let mut tracker = AlertTracker::new(hourly_policy());

    for m in [0, 10] {
        tracker.evaluate_failure("nginx", minutes(m), &stores).await;
    }
    let other = tracker.evaluate_failure("redis", minutes(20), &stores).await;

    assert_eq!(other.count(), 1);
    assert_eq!(tracker.current_failures("nginx", minutes(20)).len(), 2);
}

// ---------------------------------------------------------------------------
// Store fallback ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_store_falls_through_to_the_next_one() {
    let history = Arc::new(InMemoryEventStore::new());
    for m in [0, 10] {
        history
            .save(&ServiceEvent::failure("nginx", minutes(m), None).expect("event"))
            .await
            .expect("save");
    }
    let stores = EventStoreSet::new(vec![
        Box::new(UnreachableStore),
        Box::new(Arc::clone(&history)),
    ]);
    // A fresh tracker, as after a process restart.
    let mut tracker = AlertTracker::new(hourly_policy());

    let snapshot = tracker.evaluate_failure("nginx", minutes(20), &stores).await;

    assert_eq!(snapshot.source, FailureSource::Store("memory".into()));
    assert_eq!(snapshot.failures, vec![minutes(0), minutes(10)]);
    assert!(!snapshot.should_alert);
}

#[tokio::test]
async fn empty_store_defers_to_the_next_store_with_data() {
    let empty = InMemoryEventStore::new();
    let history = InMemoryEventStore::new();
    for m in [0, 10, 20] {
        history
            .save(&ServiceEvent::failure("nginx", minutes(m), None).expect("event"))
            .await
            .expect("save");
    }
    let stores = EventStoreSet::new(vec![Box::new(empty), Box::new(history)]);
    let mut tracker = AlertTracker::new(hourly_policy());

    let snapshot = tracker.evaluate_failure("nginx", minutes(20), &stores).await;

    assert_eq!(snapshot.count(), 3);
    assert!(snapshot.should_alert);
}

#[tokio::test]
async fn every_store_down_uses_the_in_memory_window() {
    let stores = EventStoreSet::new(vec![Box::new(UnreachableStore)]);
    let mut tracker = AlertTracker::new(hourly_policy());

    for m in [0, 10] {
        tracker.evaluate_failure("nginx", minutes(m), &stores).await;
    }
    let snapshot = tracker.evaluate_failure("nginx", minutes(20), &stores).await;

    assert_eq!(snapshot.source, FailureSource::Memory);
    assert!(snapshot.should_alert);
}

// ---------------------------------------------------------------------------
// Scanner end to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_restart_does_not_clear_earlier_failures() {
    let probe = ScriptedProbe::new(&[false, true, false, false]);
    let clock = ManualClock(Mutex::new(t0()));
    let memory = Arc::new(InMemoryEventStore::new());
    let stores = EventStoreSet::new(vec![Box::new(Arc::clone(&memory))]);
    let channels = ChannelSet::default();
    let mut scanner = Scanner::new(
        vec!["nginx".into()],
        &probe,
        &stores,
        &channels,
        &clock,
        AlertTracker::new(hourly_policy()),
    );
    let cancel = CancellationToken::new();

    let mut outcomes = Vec::new();
    for m in [0, 5, 10, 20] {
        clock.set(minutes(m));
        let report = scanner.scan_once(&cancel).await;
        outcomes.push(report.services[0].outcome);
    }

    assert_eq!(
        outcomes,
        vec![
            ServiceOutcome::RestartFailed {
                failures: 1,
                alerted: false
            },
            ServiceOutcome::Restarted,
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
}

#[tokio::test]
async fn alert_reaches_every_channel_even_when_one_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let channels = ChannelSet::new(vec![
        Box::new(TeamsChannel::new(Some(format!("{}/teams", server.uri()))).expect("teams")),
        Box::new(SlackChannel::new(None).expect("slack")),
        Box::new(SlackChannel::new(Some(format!("{}/slack", server.uri()))).expect("slack")),
    ]);

    let report = channels
        .dispatch(&FailureAlert::new(
            "nginx",
            vec![minutes(0), minutes(10), minutes(20)],
        ))
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.not_configured, 1);
    assert_eq!(report.attempted(), 3);
}
