use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::ports::probe::{ProbeError, ServiceProbe};

const DEFAULT_PROGRAM: &str = "systemctl";

/// Service probe backed by `systemctl`.
///
/// `is-active` printing `active` means running; `restart` exiting 0 means the
/// restart succeeded. Every invocation is bounded by `timeout` and the child is
/// killed if the call is abandoned.
pub struct SystemdProbe {
    program: String,
    user_mode: bool,
    timeout: Duration,
}

impl SystemdProbe {
    #[must_use]
    pub fn new(user_mode: bool, timeout: Duration) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            user_mode,
            timeout,
        }
    }

    /// Use a different executable in place of `systemctl`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args<'a>(&self, verb: &'a str, service: &'a str) -> Vec<&'a str> {
        let mut args = Vec::with_capacity(4);
        if self.user_mode {
            args.push("--user");
        }
        args.push(verb);
        // Unit names starting with `-` must not be read as options.
        args.push("--");
        args.push(service);
        args
    }

    async fn run(&self, verb: &str, service: &str) -> Result<Output, ProbeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(verb, service)).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => Err(ProbeError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ProbeError::CommandUnavailable(self.program.clone()))
            }
            Ok(Err(e)) => Err(ProbeError::Failed(format!(
                "{} {verb} {service}: {e}",
                self.program
            ))),
            Ok(Ok(output)) => Ok(output),
        }
    }
}

impl Default for SystemdProbe {
    fn default() -> Self {
        Self::new(false, Duration::from_secs(30))
    }
}

#[async_trait]
impl ServiceProbe for SystemdProbe {
    async fn is_running(&self, service: &str) -> Result<bool, ProbeError> {
        let output = self.run("is-active", service).await?;
        let state = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(service, state = state.trim(), "is-active");
        Ok(state.trim() == "active")
    }

    async fn restart(&self, service: &str) -> Result<(), ProbeError> {
        let output = self.run("restart", service).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ProbeError::Failed(format!(
            "restart exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}
