use std::time::Duration;

use async_trait::async_trait;
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::domain::entities::event::{EventKind, ServiceEvent};
use crate::domain::ports::store::{EventStore, StoreError};

const COLLECTION: &str = "service_events";
const SERVER_TIMEOUT: Duration = Duration::from_secs(10);

/// Persisted document shape. BSON dates have millisecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EventDocument {
    service_name: String,
    event_type: EventKind,
    success: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<&ServiceEvent> for EventDocument {
    fn from(event: &ServiceEvent) -> Self {
        Self {
            service_name: event.service_name().to_string(),
            event_type: event.kind(),
            success: event.success(),
            timestamp: event.timestamp(),
            message: event.message().map(str::to_string),
        }
    }
}

fn failures_filter(service: &str, since: DateTime<Utc>) -> Document {
    doc! {
        "service_name": service,
        "event_type": EventKind::Failure.as_str(),
        "timestamp": { "$gte": bson::DateTime::from_chrono(since) },
    }
}

fn older_than_filter(cutoff: DateTime<Utc>) -> Document {
    doc! { "timestamp": { "$lt": bson::DateTime::from_chrono(cutoff) } }
}

/// MongoDB event store: one document per event in `service_events`.
pub struct MongoEventStore {
    connection_string: String,
    database: String,
    collection: OnceCell<Collection<EventDocument>>,
}

impl MongoEventStore {
    /// The client is created on first use.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if a setting is blank.
    pub fn new(connection_string: &str, database: &str) -> Result<Self, StoreError> {
        for (field, value) in [
            ("connection_string", connection_string),
            ("database", database),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::ConnectionFailed(format!(
                    "mongodb {field} is not set"
                )));
            }
        }
        Ok(Self {
            connection_string: connection_string.to_string(),
            database: database.to_string(),
            collection: OnceCell::new(),
        })
    }

    async fn collection(&self) -> Result<&Collection<EventDocument>, StoreError> {
        self.collection
            .get_or_try_init(|| async {
                let mut options = ClientOptions::parse(&self.connection_string)
                    .await
                    .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
                options.server_selection_timeout = Some(SERVER_TIMEOUT);
                options.connect_timeout = Some(SERVER_TIMEOUT);
                let client = Client::with_options(options)
                    .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
                Ok(client.database(&self.database).collection(COLLECTION))
            })
            .await
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        self.collection()
            .await?
            .insert_one(EventDocument::from(event))
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        tracing::debug!(
            service = event.service_name(),
            kind = %event.kind(),
            "saved event to mongodb"
        );
        Ok(())
    }

    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let mut cursor = self
            .collection()
            .await?
            .find(failures_filter(service, since))
            .sort(doc! { "timestamp": 1 })
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let mut failures = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
        {
            let document = cursor
                .deserialize_current()
                .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            failures.push(document.timestamp);
        }
        Ok(failures)
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = self
            .collection()
            .await?
            .delete_many(older_than_filter(cutoff))
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(result.deleted_count)
    }
}
