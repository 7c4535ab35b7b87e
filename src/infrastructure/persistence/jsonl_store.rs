use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::entities::event::ServiceEvent;
use crate::domain::ports::store::{EventStore, StoreError};

/// Append-only JSON-lines event log, one [`ServiceEvent`] per line.
///
/// Lines that fail to parse are skipped on read and dropped on prune.
pub struct JsonlEventStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlEventStore {
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if the parent directory cannot be created.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let path = PathBuf::from(shellexpand::tilde(path).as_ref());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_events(&self) -> Result<Vec<ServiceEvent>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::ReadFailed(e.to_string())),
        };

        let mut events = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ServiceEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = idx + 1,
                    "skipping malformed event line: {e}"
                ),
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl EventStore for JsonlEventStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        let mut line =
            serde_json::to_string(event).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let events = {
            let _guard = self.lock.lock().await;
            self.read_events().await?
        };
        let mut failures: Vec<DateTime<Utc>> = events
            .iter()
            .filter(|e| e.is_failure() && e.service_name() == service && e.timestamp() >= since)
            .map(ServiceEvent::timestamp)
            .collect();
        failures.sort_unstable();
        Ok(failures)
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let (kept, old): (Vec<ServiceEvent>, Vec<ServiceEvent>) = self
            .read_events()
            .await?
            .into_iter()
            .partition(|e| e.timestamp() >= cutoff);
        if old.is_empty() {
            return Ok(0);
        }

        let mut content = String::new();
        for event in &kept {
            content.push_str(
                &serde_json::to_string(event).map_err(|e| StoreError::WriteFailed(e.to_string()))?,
            );
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(old.len() as u64)
    }
}
