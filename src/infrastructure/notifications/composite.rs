use crate::domain::entities::alert::FailureAlert;
use crate::domain::ports::notifier::NotificationChannel;

/// Outcome of one fan-out across every configured channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub not_configured: usize,
    pub failed: usize,
}

impl DispatchReport {
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.delivered + self.not_configured + self.failed
    }
}

/// Forwards alerts to every configured channel.
///
/// Calls each channel once, in order. A channel that errors never prevents
/// the next one from being tried.
pub struct ChannelSet {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl ChannelSet {
    #[must_use]
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn dispatch(&self, alert: &FailureAlert) -> DispatchReport {
        let mut report = DispatchReport::default();
        for channel in &self.channels {
            match channel.notify(alert).await {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_not_configured() => {
                    tracing::debug!(channel = channel.name(), "channel skipped: {e}");
                    report.not_configured += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        channel = channel.name(),
                        service = %alert.service_name,
                        "notification failed: {e}"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
