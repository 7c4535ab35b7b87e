use chrono::{DateTime, TimeDelta, Utc};

/// Where the timestamps behind an alert decision came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureSource {
    /// The tracker's own in-memory window.
    Memory,
    /// The named event store answered the query.
    Store(String),
}

impl std::fmt::Display for FailureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Store(name) => write!(f, "store:{name}"),
        }
    }
}

/// Result of evaluating a service's failure window at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSnapshot {
    pub failures: Vec<DateTime<Utc>>,
    pub should_alert: bool,
    pub source: FailureSource,
}

impl FailureSnapshot {
    #[must_use]
    pub const fn count(&self) -> usize {
        self.failures.len()
    }
}

/// Chronological failure timestamps for one service, bounded by a rolling window.
///
/// Every read goes through [`FailureWindow::prune`], so no entry survives
/// past the first evaluation at which `now - ts > window`. A zero-length
/// window keeps nothing at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureWindow {
    timestamps: Vec<DateTime<Utc>>,
}

impl FailureWindow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timestamps: Vec::new(),
        }
    }

    /// Append a failure observed at `at`, keeping the sequence ordered.
    pub fn push(&mut self, at: DateTime<Utc>) {
        let idx = self.timestamps.partition_point(|ts| *ts <= at);
        self.timestamps.insert(idx, at);
    }

    /// Drop every entry older than `window` relative to `now`.
    pub fn prune(&mut self, now: DateTime<Utc>, window: TimeDelta) {
        if window <= TimeDelta::zero() {
            self.timestamps.clear();
            return;
        }
        self.timestamps.retain(|ts| within(now, *ts, window));
    }

    #[must_use]
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// `true` when `ts` still falls inside a window of `window` ending at `now`.
#[must_use]
pub fn within(now: DateTime<Utc>, ts: DateTime<Utc>, window: TimeDelta) -> bool {
    window > TimeDelta::zero() && now - ts <= window
}
