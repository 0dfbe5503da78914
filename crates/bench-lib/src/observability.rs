//! Structured logging for experiment events
//!
//! Every lifecycle event carries an `event` field and the experiment's metric
//! tag so runs with different metric selections can be told apart in
//! aggregated logs.

use crate::experiment::Phase;
use crate::loadgen::LoadOutcome;
use tracing::{error, info, warn};

/// Structured logger for experiment lifecycle events
#[derive(Debug, Clone)]
pub struct ExperimentLogger {
    metric_tag: String,
}

impl ExperimentLogger {
    pub fn new(metric_tag: impl Into<String>) -> Self {
        Self {
            metric_tag: metric_tag.into(),
        }
    }

    /// Log experiment start
    pub fn log_start(&self, workloads: usize, duration_secs: u64) {
        info!(
            event = "experiment_started",
            metric_tag = %self.metric_tag,
            workloads = workloads,
            duration_secs = duration_secs,
            "Starting autoscaling experiment"
        );
    }

    /// Log a lifecycle phase transition
    pub fn log_phase(&self, phase: Phase) {
        info!(
            event = "phase_entered",
            metric_tag = %self.metric_tag,
            phase = %phase,
            "Entered experiment phase"
        );
    }

    /// Log the outcome of the fire-and-forget apply
    pub fn log_apply(&self, success: bool, stderr: &str) {
        if success {
            info!(
                event = "manifest_applied",
                metric_tag = %self.metric_tag,
                "Applied combined manifest"
            );
        } else {
            error!(
                event = "manifest_apply_failed",
                metric_tag = %self.metric_tag,
                stderr = %stderr.trim(),
                "Failed to apply combined manifest"
            );
        }
    }

    /// Log a failed status query; polling continues
    pub fn log_poll_failure(&self, workload: &str, details: &str) {
        warn!(
            event = "poll_failed",
            metric_tag = %self.metric_tag,
            workload = %workload,
            details = %details,
            "Autoscaler status query failed"
        );
    }

    /// Log completion of one poller
    pub fn log_poller_finished(&self, workload: &str, lines_written: usize, failures: usize) {
        info!(
            event = "poller_finished",
            metric_tag = %self.metric_tag,
            workload = %workload,
            lines_written = lines_written,
            failures = failures,
            "Completed autoscaler monitoring"
        );
    }

    /// Log how the load generator ended
    pub fn log_load_outcome(&self, outcome: &LoadOutcome) {
        let output = outcome.output();
        match outcome {
            LoadOutcome::Completed(_) if output.success() => info!(
                event = "load_finished",
                metric_tag = %self.metric_tag,
                status = outcome.label(),
                stdout = %output.stdout.trim(),
                "Load generator completed"
            ),
            LoadOutcome::Completed(_) => warn!(
                event = "load_finished",
                metric_tag = %self.metric_tag,
                status = outcome.label(),
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "Load generator exited with failure"
            ),
            LoadOutcome::TimedOut(_) => error!(
                event = "load_finished",
                metric_tag = %self.metric_tag,
                status = outcome.label(),
                "Load generator timed out and was killed"
            ),
            LoadOutcome::Interrupted(_) => warn!(
                event = "load_finished",
                metric_tag = %self.metric_tag,
                status = outcome.label(),
                "Load generator interrupted by shutdown"
            ),
        }
    }

    /// Log the cleanup result
    pub fn log_cleanup(&self, success: bool, stderr: &str) {
        if success {
            info!(
                event = "manifest_deleted",
                metric_tag = %self.metric_tag,
                "HPA config deleted successfully"
            );
        } else {
            error!(
                event = "manifest_delete_failed",
                metric_tag = %self.metric_tag,
                stderr = %stderr.trim(),
                "Error deleting HPA config"
            );
        }
    }
}
