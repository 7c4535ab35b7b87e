use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("service manager unavailable: {0}")]
    CommandUnavailable(String),
    #[error("service manager call timed out after {0}s")]
    Timeout(u64),
    #[error("service manager call failed: {0}")]
    Failed(String),
}

/// Liveness and restart capability for named OS services.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Whether the named service is currently active.
    ///
    /// An unknown service is reported as `Ok(false)`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` if the service manager cannot be queried.
    async fn is_running(&self, service: &str) -> Result<bool, ProbeError>;

    /// Request a restart of the named service.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` if the restart could not be requested or the
    /// service manager reported a failure.
    async fn restart(&self, service: &str) -> Result<(), ProbeError>;
}
