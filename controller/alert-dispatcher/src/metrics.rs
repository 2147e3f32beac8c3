//! Dispatch metrics
//!
//! Counters are emitted as structured log events so they can be aggregated by
//! whatever ships the logs; no exporter is bundled.

use tracing::info;

/// Metrics recorder for the alert dispatcher
#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics;

impl Metrics {
    /// Record an accepted webhook notification
    pub fn record_batch(&self, status: &str, alerts: usize) {
        info!(status = %status, alerts, "Recorded notification batch");
    }

    /// Record an alert that produced no dispatch
    pub fn record_ignored(&self, reason: &str) {
        info!(reason = %reason, "Recorded ignored alert");
    }

    /// Record the outcome of one dispatched action
    pub fn record_dispatch(&self, action: &str, success: bool) {
        info!(action = %action, success, "Recorded dispatch");
    }
}
