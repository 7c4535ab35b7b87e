#![allow(clippy::expect_used)]

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use service_doctor::application::services::retention;
use service_doctor::domain::entities::ServiceEvent;
use service_doctor::domain::ports::EventStore;
use service_doctor::domain::value_objects::RetentionPolicy;
use service_doctor::infrastructure::persistence::composite::EventStoreSet;
use service_doctor::infrastructure::persistence::in_memory_store::InMemoryEventStore;
use service_doctor::infrastructure::persistence::jsonl_store::JsonlEventStore;
use service_doctor::infrastructure::persistence::sqlite_store::SqliteEventStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-07-20T12:00:00Z")
        .expect("parse")
        .with_timezone(&Utc)
}

fn hours_ago(h: i64) -> DateTime<Utc> {
    now() - TimeDelta::hours(h)
}

/// One of each durable backend plus the in-memory one.
fn backends(dir: &tempfile::TempDir) -> Vec<Arc<dyn EventStore>> {
    let sqlite = dir.path().join("events.db");
    let jsonl = dir.path().join("events.jsonl");
    vec![
        Arc::new(SqliteEventStore::new(sqlite.to_str().expect("utf8")).expect("sqlite")),
        Arc::new(JsonlEventStore::new(jsonl.to_str().expect("utf8")).expect("jsonl")),
        Arc::new(InMemoryEventStore::new()),
    ]
}

async fn seed(store: &dyn EventStore) {
    let events = [
        ServiceEvent::failure("nginx", hours_ago(30), Some("old".into())),
        ServiceEvent::check("nginx", hours_ago(30)),
        ServiceEvent::failure("nginx", hours_ago(10), None),
        ServiceEvent::restart("nginx", true, hours_ago(10), None),
        ServiceEvent::failure("redis", hours_ago(1), None),
    ];
    for event in events {
        store.save(&event.expect("event")).await.expect("save");
    }
}

// ---------------------------------------------------------------------------
// Backend behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_backend_answers_failure_queries_alike() {
    let dir = tempfile::tempdir().expect("tempdir");
    for store in backends(&dir) {
        seed(store.as_ref()).await;

        let all = store
            .failures_since("nginx", hours_ago(48))
            .await
            .expect("query");
        assert_eq!(all, vec![hours_ago(30), hours_ago(10)], "{}", store.name());

        let inclusive = store
            .failures_since("nginx", hours_ago(10))
            .await
            .expect("query");
        assert_eq!(inclusive, vec![hours_ago(10)], "{}", store.name());

        let unknown = store
            .failures_since("postgresql", hours_ago(48))
            .await
            .expect("query");
        assert!(unknown.is_empty(), "{}", store.name());
    }
}

#[tokio::test]
async fn retention_keeps_recent_events_on_every_backend() {
    let dir = tempfile::tempdir().expect("tempdir");
    for store in backends(&dir) {
        seed(store.as_ref()).await;

        let removed = store
            .prune_older_than(RetentionPolicy::default().cutoff(now()))
            .await
            .expect("prune");
        assert_eq!(removed, 2, "{}", store.name());

        let remaining = store
            .failures_since("nginx", hours_ago(48))
            .await
            .expect("query");
        assert_eq!(remaining, vec![hours_ago(10)], "{}", store.name());
    }
}

#[tokio::test]
async fn cleanup_sums_removals_across_the_set() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stores = backends(&dir);
    for store in &stores {
        seed(store.as_ref()).await;
    }
    let set = EventStoreSet::new(
        stores
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn EventStore>)
            .collect(),
    );

    let report = retention::cleanup(&set, RetentionPolicy::default(), now()).await;

    assert_eq!(report.cutoff, hours_ago(24));
    assert_eq!(report.removed, 6);
}

#[tokio::test]
async fn sqlite_history_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested/events.db");
    let path = path.to_str().expect("utf8");
    {
        let store = SqliteEventStore::new(path).expect("sqlite");
        seed(&store).await;
    }

    let reopened = SqliteEventStore::new(path).expect("reopen");
    let failures = reopened
        .failures_since("redis", hours_ago(2))
        .await
        .expect("query");
    assert_eq!(failures, vec![hours_ago(1)]);
}

#[tokio::test]
async fn fan_out_save_survives_a_missing_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let memory = Arc::new(InMemoryEventStore::new());
    let jsonl = dir.path().join("gone/events.jsonl");
    let set = EventStoreSet::new(vec![
        Box::new(JsonlEventStore::new(jsonl.to_str().expect("utf8")).expect("jsonl")),
        Box::new(Arc::clone(&memory)),
    ]);
    std::fs::remove_dir_all(dir.path().join("gone")).ok();

    let event = ServiceEvent::failure("nginx", now(), None).expect("event");
    assert!(set.save(&event).await);
    assert_eq!(memory.events().expect("events"), vec![event]);
}
