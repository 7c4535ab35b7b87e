use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::OnceCell;

use crate::domain::entities::event::ServiceEvent;
use crate::domain::ports::store::{EventStore, StoreError};

const EVENTS_PREFIX: &str = "service_events:";
const FAILURES_PREFIX: &str = "service_failures:";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redis event store built on sorted sets scored by event time.
///
/// Every event is kept as JSON in `service_events:{service}`. Failures are
/// also indexed by their RFC 3339 timestamp in `service_failures:{service}`
/// so window queries are a single range lookup.
pub struct RedisEventStore {
    client: redis::Client,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisEventStore {
    /// The connection is opened on first use.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if `host` is blank.
    pub fn new(host: &str, port: u16, password: Option<&str>) -> Result<Self, StoreError> {
        if host.trim().is_empty() {
            return Err(StoreError::ConnectionFailed("redis host is not set".into()));
        }
        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(host.to_string(), port),
            redis: redis::RedisConnectionInfo {
                password: password.filter(|p| !p.is_empty()).map(str::to_string),
                ..redis::RedisConnectionInfo::default()
            },
        };
        let client =
            redis::Client::open(info).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                tokio::time::timeout(
                    CONNECT_TIMEOUT,
                    self.client.get_multiplexed_async_connection(),
                )
                .await
                .map_err(|_| StoreError::ConnectionFailed("redis connect timed out".into()))?
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))
            })
            .await?;
        Ok(conn.clone())
    }
}

fn events_key(service: &str) -> String {
    format!("{EVENTS_PREFIX}{service}")
}

fn failures_key(service: &str) -> String {
    format!("{FAILURES_PREFIX}{service}")
}

/// Sorted-set score: seconds since the epoch with microsecond precision.
#[allow(clippy::cast_precision_loss)]
fn score(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

fn failure_member(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_failure_members(members: &[String]) -> Result<Vec<DateTime<Utc>>, StoreError> {
    let mut failures = members
        .iter()
        .map(|m| {
            DateTime::parse_from_rfc3339(m)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| StoreError::ReadFailed(format!("bad failure member {m:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    failures.sort_unstable();
    Ok(failures)
}

#[async_trait]
impl EventStore for RedisEventStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(event).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let at = score(event.timestamp());

        let mut pipe = redis::pipe();
        pipe.atomic()
            .zadd(events_key(event.service_name()), payload, at)
            .ignore();
        if event.is_failure() {
            pipe.zadd(
                failures_key(event.service_name()),
                failure_member(event.timestamp()),
                at,
            )
            .ignore();
        }

        let mut conn = self.connection().await?;
        let (): () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        tracing::debug!(
            service = event.service_name(),
            kind = %event.kind(),
            "saved event to redis"
        );
        Ok(())
    }

    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let mut conn = self.connection().await?;
        let members: Vec<String> = conn
            .zrangebyscore(failures_key(service), score(since), "+inf")
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        parse_failure_members(&members)
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        let below = format!("({}", score(cutoff));

        let mut removed = 0;
        for prefix in [EVENTS_PREFIX, FAILURES_PREFIX] {
            let keys: Vec<String> = conn
                .keys(format!("{prefix}*"))
                .await
                .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            for key in keys {
                let n: u64 = conn
                    .zrembyscore(&key, "-inf", &below)
                    .await
                    .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
                // The failure index duplicates events already counted.
                if prefix == EVENTS_PREFIX {
                    removed += n;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T10:00:00.250Z")
            .expect("parse")
            .with_timezone(&Utc)
    }

    #[test]
    fn keys_are_namespaced_per_service() {
        assert_eq!(events_key("nginx"), "service_events:nginx");
        assert_eq!(failures_key("nginx"), "service_failures:nginx");
    }

    #[test]
    fn score_keeps_sub_second_order() {
        let later = t0() + chrono::TimeDelta::milliseconds(1);
        assert!(score(later) > score(t0()));
        assert!((score(t0()) - 1_735_725_600.25).abs() < 1e-6);
    }

    #[test]
    fn failure_members_parse_back_sorted() {
        let later = t0() + chrono::TimeDelta::minutes(10);
        let members = vec![failure_member(later), failure_member(t0())];
        assert_eq!(
            parse_failure_members(&members).expect("parse"),
            vec![t0(), later]
        );
    }

    #[test]
    fn garbage_member_is_read_error() {
        let err = parse_failure_members(&["yesterday".into()]).expect_err("bad member");
        assert!(matches!(err, StoreError::ReadFailed(_)));
    }

    #[test]
    fn blank_host_rejected() {
        assert!(matches!(
            RedisEventStore::new(" ", 6379, None),
            Err(StoreError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_failure() {
        let store = RedisEventStore::new("127.0.0.1", 9, Some("secret")).expect("store");
        let err = store
            .failures_since("nginx", t0())
            .await
            .expect_err("nothing listens on port 9");
        assert!(matches!(err, StoreError::ConnectionFailed(_)));
    }
}
