//! Experiment lifecycle
//!
//! Drives one autoscaling experiment through its phases:
//!
//! ```text
//! Idle -> Applying -> Provisioning -> Running -> Draining -> Cleanup -> Done
//!   \-> Aborted (no metric tag)
//! ```
//!
//! Running starts the load generator and one status poller per workload
//! together. Draining is a join barrier over every spawned task, and Cleanup
//! deletes the applied manifest whatever happened before it.

mod poller;


use crate::controlplane::{CommandOutput, ControlPlane};
use crate::loadgen::{LoadGenerator, LoadOutcome, LoadRequest};
use crate::observability::ExperimentLogger;
use crate::shutdown::Shutdown;
use anyhow::Result;
use chrono::{DateTime, Utc};
use poller::Poller;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Lifecycle phase of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Applying,
    Provisioning,
    Running,
    Draining,
    Cleanup,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Applying => "applying",
            Phase::Provisioning => "provisioning",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Cleanup => "cleanup",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Final status of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Every phase ran; individual failures are in the report
    Completed,
    /// Shutdown was requested; draining and cleanup still ran
    Interrupted,
    /// No metric tag, nothing was applied
    Aborted,
}

/// Result of one status poller
#[derive(Debug, Clone, Serialize)]
pub struct PollSummary {
    pub workload: String,
    pub output: PathBuf,
    pub lines_written: usize,
    pub failures: usize,
    /// Set when the poller could not run at all
    pub error: Option<String>,
}

/// Everything that happened during one experiment
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: ExperimentStatus,
    pub metric_tag: Option<String>,
    /// Phases in the order they were entered
    pub phases: Vec<Phase>,
    pub apply_succeeded: Option<bool>,
    pub load: Option<LoadOutcome>,
    pub load_error: Option<String>,
    pub pollers: Vec<PollSummary>,
    pub cleanup_succeeded: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn new(metric_tag: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            status: ExperimentStatus::Completed,
            metric_tag,
            phases: vec![Phase::Idle],
            apply_succeeded: None,
            load: None,
            load_error: None,
            pollers: Vec::new(),
            cleanup_succeeded: None,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn total_lines(&self) -> usize {
        self.pollers.iter().map(|p| p.lines_written).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.pollers.iter().map(|p| p.failures).sum()
    }
}

/// Configuration for the experiment controller
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Combined manifest to apply and delete
    pub manifest: PathBuf,
    /// Directory under which `<metric-tag>/<workload>.txt` files are written
    pub output_root: PathBuf,
    /// Wait after applying before load starts (default: 60 seconds)
    pub provision_grace: Duration,
    /// Time allowed past the run duration for the load generator to exit
    /// (default: 90 seconds)
    pub load_grace: Duration,
    /// Interval between status queries (default: 15 seconds)
    pub poll_interval: Duration,
    /// Extra wait past the load generator's own bound before the controller
    /// gives up on it (default: 10 seconds)
    pub load_backstop: Duration,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("hpa_config.yaml"),
            output_root: PathBuf::from("."),
            provision_grace: Duration::from_secs(60),
            load_grace: Duration::from_secs(90),
            poll_interval: Duration::from_secs(15),
            load_backstop: Duration::from_secs(10),
        }
    }
}

/// Task results collected at the draining barrier
enum Joined {
    Apply(Result<CommandOutput>),
    Poller(PollSummary),
}

/// Experiment controller
pub struct Experiment {
    control_plane: Arc<dyn ControlPlane>,
    load_generator: Arc<dyn LoadGenerator>,
    config: ExperimentConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Experiment {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        load_generator: Arc<dyn LoadGenerator>,
        config: ExperimentConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            control_plane,
            load_generator,
            config,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Sender that stops a running experiment early.
    ///
    /// Pollers stop, the load generator is killed, and the experiment moves
    /// straight to draining and cleanup.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the experiment for `workloads` over `duration`.
    ///
    /// Returns [`ExperimentStatus::Aborted`] without touching the cluster when
    /// `metric_tag` is missing or empty. Otherwise cleanup always runs.
    pub async fn run(
        &self,
        workloads: &[String],
        duration: Duration,
        metric_tag: Option<&str>,
    ) -> RunReport {
        let metric_tag = metric_tag.filter(|tag| !tag.is_empty());
        let mut report = RunReport::new(metric_tag.map(str::to_string));

        let Some(metric_tag) = metric_tag else {
            warn!("No metrics specified, aborting experiment");
            report.phases.push(Phase::Aborted);
            report.status = ExperimentStatus::Aborted;
            report.finished_at = Utc::now();
            return report;
        };

        // One poller per name, each owning its output file
        let workloads = unique_workloads(workloads);
        let workloads = workloads.as_slice();

        // Subscribe every task before anything can broadcast a shutdown
        let mut shutdown = Shutdown::new(self.shutdown_tx.subscribe());
        let load_shutdown = Shutdown::new(self.shutdown_tx.subscribe());
        let poller_shutdowns: Vec<_> = workloads
            .iter()
            .map(|_| Shutdown::new(self.shutdown_tx.subscribe()))
            .collect();

        let logger = ExperimentLogger::new(metric_tag);
        logger.log_start(workloads.len(), duration.as_secs());

        let mut barrier = JoinSet::new();

        self.enter(&mut report, &logger, Phase::Applying);
        let control_plane = Arc::clone(&self.control_plane);
        let manifest = self.config.manifest.clone();
        barrier.spawn(async move { Joined::Apply(control_plane.apply(&manifest).await) });

        self.enter(&mut report, &logger, Phase::Provisioning);
        info!(
            grace_secs = self.config.provision_grace.as_secs(),
            "Waiting for resources to be provisioned"
        );
        tokio::select! {
            _ = tokio::time::sleep(self.config.provision_grace) => {}
            _ = shutdown.recv() => {}
        }

        if shutdown.check() {
            warn!("Shutdown requested before load started");
        } else {
            self.enter(&mut report, &logger, Phase::Running);
            self.spawn_pollers(&mut barrier, workloads, duration, metric_tag, &logger, poller_shutdowns)
                .await;
            self.run_load(&mut report, &logger, duration, load_shutdown).await;
        }

        self.enter(&mut report, &logger, Phase::Draining);
        self.drain(&mut report, &logger, &mut barrier, workloads).await;

        self.enter(&mut report, &logger, Phase::Cleanup);
        report.cleanup_succeeded = Some(self.cleanup(&logger).await);

        if shutdown.check() {
            report.status = ExperimentStatus::Interrupted;
        }
        self.enter(&mut report, &logger, Phase::Done);
        report.finished_at = Utc::now();
        report
    }

    fn enter(&self, report: &mut RunReport, logger: &ExperimentLogger, phase: Phase) {
        report.phases.push(phase);
        logger.log_phase(phase);
    }

    async fn spawn_pollers(
        &self,
        barrier: &mut JoinSet<Joined>,
        workloads: &[String],
        duration: Duration,
        metric_tag: &str,
        logger: &ExperimentLogger,
        shutdowns: Vec<Shutdown>,
    ) {
        let output_dir = self.config.output_root.join(metric_tag);
        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            // Pollers report the failure individually when opening their files
            error!(path = %output_dir.display(), error = %e, "Failed to create poll output directory");
        }

        info!(pollers = workloads.len(), "Collecting HPA data");
        for (workload, shutdown) in workloads.iter().zip(shutdowns) {
            let poller = Poller {
                workload: workload.clone(),
                output: output_dir.join(format!("{workload}.txt")),
                interval: self.config.poll_interval,
                duration,
                control_plane: Arc::clone(&self.control_plane),
                logger: logger.clone(),
            };
            barrier.spawn(async move { Joined::Poller(poller.run(shutdown).await) });
        }
    }

    async fn run_load(
        &self,
        report: &mut RunReport,
        logger: &ExperimentLogger,
        duration: Duration,
        shutdown: Shutdown,
    ) {
        let request = LoadRequest {
            duration,
            bound: duration.saturating_add(self.config.load_grace),
        };
        let wait = request.bound.saturating_add(self.config.load_backstop);

        match tokio::time::timeout(wait, self.load_generator.run(request, shutdown)).await {
            Ok(Ok(outcome)) => {
                logger.log_load_outcome(&outcome);
                report.load = Some(outcome);
            }
            Ok(Err(e)) => {
                error!(error = %format!("{e:#}"), "Load generator failed");
                report.load_error = Some(format!("{e:#}"));
            }
            Err(_) => {
                let outcome = LoadOutcome::TimedOut(CommandOutput::default());
                logger.log_load_outcome(&outcome);
                report.load = Some(outcome);
            }
        }
    }

    /// Wait for every spawned task, whatever happened while running
    async fn drain(
        &self,
        report: &mut RunReport,
        logger: &ExperimentLogger,
        barrier: &mut JoinSet<Joined>,
        workloads: &[String],
    ) {
        let total = barrier.len();
        let mut completed = 0;

        while let Some(joined) = barrier.join_next().await {
            completed += 1;
            match joined {
                Ok(Joined::Apply(Ok(output))) => {
                    logger.log_apply(output.success(), &output.stderr);
                    report.apply_succeeded = Some(output.success());
                }
                Ok(Joined::Apply(Err(e))) => {
                    logger.log_apply(false, &format!("{e:#}"));
                    report.apply_succeeded = Some(false);
                }
                Ok(Joined::Poller(summary)) => report.pollers.push(summary),
                Err(e) => error!(error = %e, "Experiment task panicked"),
            }
            info!(completed, total, "Waiting for experiment tasks to complete");
        }

        report
            .pollers
            .sort_by_key(|p| workloads.iter().position(|w| *w == p.workload));
    }

    /// Delete the applied manifest; failures are logged, never returned
    async fn cleanup(&self, logger: &ExperimentLogger) -> bool {
        info!(manifest = %self.config.manifest.display(), "Deleting app config");
        match self.control_plane.delete(&self.config.manifest).await {
            Ok(output) => {
                logger.log_cleanup(output.success(), &output.stderr);
                output.success()
            }
            Err(e) => {
                logger.log_cleanup(false, &format!("{e:#}"));
                false
            }
        }
    }
}

fn unique_workloads(workloads: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(workloads.len());
    for workload in workloads {
        if unique.contains(workload) {
            warn!(workload = %workload, "Duplicate workload, polling it once");
        } else {
            unique.push(workload.clone());
        }
    }
    unique
}

/// Builder for an [`Experiment`]
pub struct ExperimentBuilder {
    control_plane: Option<Arc<dyn ControlPlane>>,
    load_generator: Option<Arc<dyn LoadGenerator>>,
    config: ExperimentConfig,
}

impl ExperimentBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            control_plane: None,
            load_generator: None,
            config: ExperimentConfig::default(),
        }
    }

    pub fn control_plane(mut self, control_plane: Arc<dyn ControlPlane>) -> Self {
        self.control_plane = Some(control_plane);
        self
    }

    pub fn load_generator(mut self, load_generator: Arc<dyn LoadGenerator>) -> Self {
        self.load_generator = Some(load_generator);
        self
    }

    /// Set the combined manifest path
    pub fn manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest = path.into();
        self
    }

    /// Set the root directory for poll output
    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn provision_grace(mut self, grace: Duration) -> Self {
        self.config.provision_grace = grace;
        self
    }

    pub fn load_grace(mut self, grace: Duration) -> Self {
        self.config.load_grace = grace;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn load_backstop(mut self, backstop: Duration) -> Self {
        self.config.load_backstop = backstop;
        self
    }

    /// Build the experiment
    pub fn build(self) -> Result<Experiment> {
        let control_plane = self
            .control_plane
            .ok_or_else(|| anyhow::anyhow!("Control plane is required"))?;
        let load_generator = self
            .load_generator
            .ok_or_else(|| anyhow::anyhow!("Load generator is required"))?;

        if self.config.poll_interval.is_zero() {
            anyhow::bail!("Poll interval must be greater than zero");
        }

        Ok(Experiment::new(control_plane, load_generator, self.config))
    }
}

impl Default for ExperimentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
