use serde::{Deserialize, Serialize};

/// Event store backends selectable from configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Sqlite,
    Jsonl,
    Influxdb,
    Redis,
    Mongodb,
    Memory,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Jsonl => write!(f, "jsonl"),
            Self::Influxdb => write!(f, "influxdb"),
            Self::Redis => write!(f, "redis"),
            Self::Mongodb => write!(f, "mongodb"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Notification channels selectable from configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Slack,
    Teams,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Slack => write!(f, "slack"),
            Self::Teams => write!(f, "teams"),
        }
    }
}
