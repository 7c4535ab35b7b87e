//! Builds the configured event stores and notification channels.
//!
//! Disabled entries are skipped silently. An entry that cannot be built is
//! logged and skipped so the remaining backends still run.

use crate::application::config::{
    ChannelEntry, DEFAULT_JSONL_PATH, DEFAULT_MONGODB_DATABASE, DEFAULT_MONGODB_URI,
    DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT, DEFAULT_SMTP_PORT, DEFAULT_SQLITE_PATH, StoreEntry,
};
use crate::domain::ports::notifier::{NotificationChannel, NotificationError};
use crate::domain::ports::store::{EventStore, StoreError};
use crate::domain::value_objects::{ChannelKind, StoreKind};
use crate::infrastructure::notifications::composite::ChannelSet;
use crate::infrastructure::notifications::email::{EmailChannel, EmailSettings};
use crate::infrastructure::notifications::slack::SlackChannel;
use crate::infrastructure::notifications::teams::TeamsChannel;
use crate::infrastructure::persistence::composite::EventStoreSet;
use crate::infrastructure::persistence::in_memory_store::InMemoryEventStore;
use crate::infrastructure::persistence::influx_store::InfluxEventStore;
use crate::infrastructure::persistence::jsonl_store::JsonlEventStore;
use crate::infrastructure::persistence::mongo_store::MongoEventStore;
use crate::infrastructure::persistence::redis_store::RedisEventStore;
use crate::infrastructure::persistence::sqlite_store::SqliteEventStore;

/// # Errors
///
/// Returns the backend's construction error.
pub fn build_store(entry: &StoreEntry) -> Result<Box<dyn EventStore>, StoreError> {
    Ok(match entry.kind {
        StoreKind::Sqlite => Box::new(SqliteEventStore::new(
            entry.path.as_deref().unwrap_or(DEFAULT_SQLITE_PATH),
        )?),
        StoreKind::Jsonl => Box::new(JsonlEventStore::new(
            entry.path.as_deref().unwrap_or(DEFAULT_JSONL_PATH),
        )?),
        StoreKind::Influxdb => Box::new(InfluxEventStore::new(
            entry.url.as_deref().unwrap_or_default(),
            entry.token.as_deref().unwrap_or_default(),
            entry.org.as_deref().unwrap_or_default(),
            entry.bucket.as_deref().unwrap_or_default(),
        )?),
        StoreKind::Redis => Box::new(RedisEventStore::new(
            entry.host.as_deref().unwrap_or(DEFAULT_REDIS_HOST),
            entry.port.unwrap_or(DEFAULT_REDIS_PORT),
            entry.password.as_deref(),
        )?),
        StoreKind::Mongodb => Box::new(MongoEventStore::new(
            entry
                .connection_string
                .as_deref()
                .unwrap_or(DEFAULT_MONGODB_URI),
            entry.database.as_deref().unwrap_or(DEFAULT_MONGODB_DATABASE),
        )?),
        StoreKind::Memory => Box::new(InMemoryEventStore::new()),
    })
}

/// # Errors
///
/// Returns the channel's construction error.
pub fn build_channel(entry: &ChannelEntry) -> Result<Box<dyn NotificationChannel>, NotificationError> {
    Ok(match entry.kind {
        ChannelKind::Email => Box::new(EmailChannel::new(EmailSettings {
            smtp_server: entry.smtp_server.clone().unwrap_or_default(),
            smtp_port: entry.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            sender_email: entry.sender_email.clone().unwrap_or_default(),
            receiver_email: entry.receiver_email.clone().unwrap_or_default(),
            password: entry.password.clone(),
        })),
        ChannelKind::Slack => Box::new(SlackChannel::new(entry.webhook_url.clone())?),
        ChannelKind::Teams => Box::new(TeamsChannel::new(entry.webhook_url.clone())?),
    })
}

#[must_use]
pub fn build_stores(entries: &[StoreEntry]) -> EventStoreSet {
    let mut stores = Vec::new();
    for entry in entries.iter().filter(|e| e.enabled) {
        match build_store(entry) {
            Ok(store) => {
                tracing::debug!(store = %entry.kind, "event store ready");
                stores.push(store);
            }
            Err(e) => tracing::warn!(store = %entry.kind, "skipping event store: {e}"),
        }
    }
    if stores.is_empty() {
        tracing::warn!("no event store available, failures are tracked in memory only");
    }
    EventStoreSet::new(stores)
}

#[must_use]
pub fn build_channels(entries: &[ChannelEntry]) -> ChannelSet {
    let mut channels = Vec::new();
    for entry in entries.iter().filter(|e| e.enabled) {
        match build_channel(entry) {
            Ok(channel) => {
                tracing::debug!(channel = %entry.kind, "notification channel ready");
                channels.push(channel);
            }
            Err(e) => tracing::warn!(channel = %entry.kind, "skipping notification channel: {e}"),
        }
    }
    if channels.is_empty() {
        tracing::info!("no notification channels configured");
    }
    ChannelSet::new(channels)
}
