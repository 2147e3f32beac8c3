//! Routes firing alerts to infrastructure actions

use crate::alert::{Action, Alert, NotificationBatch, ACTION_LABEL};
use crate::capacity::CapacityController;
use crate::command::RemoteCommandExecutor;
use crate::metrics::Metrics;
use tracing::{debug, error, info, warn};

/// Shell scripts run on a host for the container actions
#[derive(Debug, Clone)]
pub struct ScaleScripts {
    pub up: String,
    pub down: String,
}

/// What happened to one dispatched alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub action: Action,
    /// Target host for container actions
    pub instance: Option<String>,
    pub success: bool,
    /// Terminal command status, new capacity, or the error text
    pub detail: String,
}

/// Per-batch summary, kept for logs and tests only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    pub outcomes: Vec<DispatchOutcome>,
    /// Alerts skipped because their `action` label was missing or unknown
    pub ignored: usize,
}

impl RouteReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// Dispatches each firing alert to the command executor or the capacity
/// controller, one alert at a time in batch order.
///
/// Failures stay local to their alert: they are logged and recorded in the
/// report, and the remaining alerts are still processed.
pub struct AlertRouter {
    executor: RemoteCommandExecutor,
    capacity: CapacityController,
    scripts: ScaleScripts,
    metrics: Metrics,
}

impl AlertRouter {
    pub fn new(
        executor: RemoteCommandExecutor,
        capacity: CapacityController,
        scripts: ScaleScripts,
        metrics: Metrics,
    ) -> Self {
        Self {
            executor,
            capacity,
            scripts,
            metrics,
        }
    }

    /// Act on every alert of a firing batch
    ///
    /// Batches in any other state are acknowledged without side effects.
    pub async fn route(&self, batch: &NotificationBatch) -> RouteReport {
        let mut report = RouteReport::default();
        self.metrics
            .record_batch(batch.status.as_str(), batch.alerts.len());

        if !batch.is_firing() {
            debug!(
                status = %batch.status,
                group_key = %batch.group_key,
                "Ignoring notification that is not firing"
            );
            return report;
        }

        for alert in &batch.alerts {
            info!(
                severity = %alert.severity(),
                instance = %alert.instance(),
                action = %alert.label(ACTION_LABEL).unwrap_or_default(),
                fingerprint = %alert.fingerprint,
                "Got alert"
            );

            match alert.action() {
                Some(action) => {
                    let outcome = self.dispatch(action, alert).await;
                    self.metrics
                        .record_dispatch(action.as_str(), outcome.success);
                    report.outcomes.push(outcome);
                }
                None => {
                    warn!(fingerprint = %alert.fingerprint, "Unknown action");
                    self.metrics.record_ignored("unknown_action");
                    report.ignored += 1;
                }
            }
        }

        info!(
            dispatched = report.outcomes.len(),
            failed = report.failures(),
            ignored = report.ignored,
            "Finished notification batch"
        );
        report
    }

    async fn dispatch(&self, action: Action, alert: &Alert) -> DispatchOutcome {
        match action {
            Action::ContainerUp => self.scale_container(action, &self.scripts.up, alert).await,
            Action::ContainerDown => {
                self.scale_container(action, &self.scripts.down, alert).await
            }
            Action::WorkerUp => self.scale_worker(action, 1).await,
            Action::WorkerDown => self.scale_worker(action, -1).await,
        }
    }

    async fn scale_container(&self, action: Action, script: &str, alert: &Alert) -> DispatchOutcome {
        let instance = alert.instance();
        let status = self.executor.run(script, instance).await;

        if status.is_success() {
            info!(action = %action, instance = %instance, "Scaled successfully");
        } else {
            warn!(action = %action, instance = %instance, status = %status, "Not scaled");
        }

        DispatchOutcome {
            action,
            instance: Some(instance.to_string()),
            success: status.is_success(),
            detail: status.to_string(),
        }
    }

    async fn scale_worker(&self, action: Action, delta: i64) -> DispatchOutcome {
        match self.capacity.adjust(delta).await {
            Ok(adjustment) => DispatchOutcome {
                action,
                instance: None,
                success: true,
                detail: format!("{} desired capacity {}", adjustment.group, adjustment.desired),
            },
            Err(e) => {
                error!(action = %action, error = %e, "Capacity adjustment failed");
                DispatchOutcome {
                    action,
                    instance: None,
                    success: false,
                    detail: e.to_string(),
                }
            }
        }
    }
}
