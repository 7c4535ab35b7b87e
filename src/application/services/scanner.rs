use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::alert_tracker::AlertTracker;
use crate::domain::entities::alert::FailureAlert;
use crate::domain::entities::event::{EventError, ServiceEvent};
use crate::domain::ports::clock::Clock;
use crate::domain::ports::probe::ServiceProbe;
use crate::infrastructure::notifications::composite::ChannelSet;
use crate::infrastructure::persistence::composite::EventStoreSet;

/// What happened to one service during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceOutcome {
    Running,
    Restarted,
    RestartFailed { failures: usize, alerted: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceReport {
    pub service: String,
    #[serde(flatten)]
    pub outcome: ServiceOutcome,
}

/// Result of a single scan cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub services: Vec<ServiceReport>,
    /// The cycle stopped early because shutdown was requested.
    pub cancelled: bool,
}

impl ScanReport {
    #[must_use]
    pub fn count(&self, pred: impl Fn(&ServiceOutcome) -> bool) -> usize {
        self.services.iter().filter(|r| pred(&r.outcome)).count()
    }

    #[must_use]
    pub fn alerts_sent(&self) -> usize {
        self.count(|o| matches!(o, ServiceOutcome::RestartFailed { alerted: true, .. }))
    }
}

/// Orchestrates a scan: probe → restart → persist → evaluate → notify.
pub struct Scanner<'a> {
    services: Vec<String>,
    probe: &'a dyn ServiceProbe,
    stores: &'a EventStoreSet,
    channels: &'a ChannelSet,
    clock: &'a dyn Clock,
    tracker: AlertTracker,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(
        services: Vec<String>,
        probe: &'a dyn ServiceProbe,
        stores: &'a EventStoreSet,
        channels: &'a ChannelSet,
        clock: &'a dyn Clock,
        tracker: AlertTracker,
    ) -> Self {
        Self {
            services,
            probe,
            stores,
            channels,
            clock,
            tracker,
        }
    }

    #[must_use]
    pub fn services(&self) -> &[String] {
        &self.services
    }

    #[must_use]
    pub const fn tracker(&self) -> &AlertTracker {
        &self.tracker
    }

    /// Scan every configured service once, in configuration order.
    ///
    /// Cancellation is honoured between services only; a service whose scan
    /// has started always finishes.
    pub async fn scan_once(&mut self, cancel: &CancellationToken) -> ScanReport {
        let started_at = self.clock.now();
        tracing::info!("Scanning {} service(s)", self.services.len());

        let services = self.services.clone();
        let mut reports = Vec::with_capacity(services.len());
        let mut cancelled = false;

        for service in &services {
            if cancel.is_cancelled() {
                tracing::info!(
                    remaining = services.len() - reports.len(),
                    "Scan interrupted by shutdown"
                );
                cancelled = true;
                break;
            }
            let outcome = self.scan_service(service).await;
            reports.push(ServiceReport {
                service: service.clone(),
                outcome,
            });
        }

        let report = ScanReport {
            started_at,
            services: reports,
            cancelled,
        };
        tracing::info!(
            running = report.count(|o| matches!(o, ServiceOutcome::Running)),
            restarted = report.count(|o| matches!(o, ServiceOutcome::Restarted)),
            failed = report.count(|o| matches!(o, ServiceOutcome::RestartFailed { .. })),
            alerts = report.alerts_sent(),
            "Scan complete"
        );
        report
    }

    async fn scan_service(&mut self, service: &str) -> ServiceOutcome {
        let running = match self.probe.is_running(service).await {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!(service, "Status check failed, treating as down: {e}");
                false
            }
        };

        if running {
            tracing::debug!(service, "Service is running");
            self.record(ServiceEvent::check(service, self.clock.now())).await;
            return ServiceOutcome::Running;
        }

        tracing::warn!(service, "Service is down, attempting restart");
        let restart_error = match self.probe.restart(service).await {
            Ok(()) => None,
            Err(e) => Some(e.to_string()),
        };

        let Some(error) = restart_error else {
            tracing::info!(service, "Service restarted");
            self.record(ServiceEvent::restart(service, true, self.clock.now(), None))
                .await;
            return ServiceOutcome::Restarted;
        };

        tracing::warn!(service, "Restart failed: {error}");
        let now = self.clock.now();
        self.record(ServiceEvent::restart(
            service,
            false,
            now,
            Some(error.clone()),
        ))
        .await;
        self.record(ServiceEvent::failure(service, now, Some(error)))
            .await;

        let snapshot = self
            .tracker
            .evaluate_failure(service, now, self.stores)
            .await;

        if !snapshot.should_alert {
            tracing::debug!(
                service,
                failures = snapshot.count(),
                threshold = self.tracker.policy().threshold(),
                "Below alert threshold"
            );
            return ServiceOutcome::RestartFailed {
                failures: snapshot.count(),
                alerted: false,
            };
        }

        tracing::warn!(
            service,
            failures = snapshot.count(),
            source = %snapshot.source,
            "Failure threshold reached, sending alert"
        );
        let failures = snapshot.count();
        let dispatch = self
            .channels
            .dispatch(&FailureAlert::new(service, snapshot.failures))
            .await;
        tracing::info!(
            service,
            delivered = dispatch.delivered,
            skipped = dispatch.not_configured,
            failed = dispatch.failed,
            "Alert dispatched"
        );

        ServiceOutcome::RestartFailed {
            failures,
            alerted: true,
        }
    }

    async fn record(&self, event: Result<ServiceEvent, EventError>) {
        match event {
            Ok(event) => {
                if !self.stores.save(&event).await {
                    tracing::warn!(
                        service = event.service_name(),
                        "{} event was not persisted by any store",
                        event.kind()
                    );
                }
            }
            Err(e) => tracing::warn!("Cannot build event: {e}"),
        }
    }
}
