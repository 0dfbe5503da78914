//! Per-workload autoscaler status poller

use super::PollSummary;
use crate::controlplane::{status_row, ControlPlane};
use crate::observability::ExperimentLogger;
use crate::shutdown::Shutdown;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error};

/// About thirty years, far past any experiment
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Polls one autoscaler until its duration elapses.
///
/// Each poller owns its output file; no state is shared between pollers.
pub(crate) struct Poller {
    pub(crate) workload: String,
    pub(crate) output: PathBuf,
    pub(crate) interval: Duration,
    pub(crate) duration: Duration,
    pub(crate) control_plane: Arc<dyn ControlPlane>,
    pub(crate) logger: ExperimentLogger,
}

impl Poller {
    pub(crate) async fn run(self, mut shutdown: Shutdown) -> PollSummary {
        let deadline = deadline_after(self.duration);
        let mut summary = PollSummary {
            workload: self.workload.clone(),
            output: self.output.clone(),
            lines_written: 0,
            failures: 0,
            error: None,
        };

        let mut file = match open_output(&self.output).await {
            Ok(file) => file,
            Err(e) => {
                error!(
                    workload = %self.workload,
                    path = %self.output.display(),
                    error = %e,
                    "Failed to open poll output file"
                );
                summary.error = Some(e.to_string());
                return summary;
            }
        };

        while Instant::now() < deadline && !shutdown.check() {
            match self.poll_once(&mut file).await {
                Ok(()) => summary.lines_written += 1,
                Err(details) => {
                    summary.failures += 1;
                    self.logger.log_poll_failure(&self.workload, &details);
                }
            }

            let next = Instant::now()
                .checked_add(self.interval)
                .map_or(deadline, |next| next.min(deadline));
            tokio::select! {
                _ = sleep_until(next) => {}
                _ = shutdown.recv() => {
                    debug!(workload = %self.workload, "Poller stopping on shutdown");
                }
            }
        }

        self.logger
            .log_poller_finished(&self.workload, summary.lines_written, summary.failures);
        summary
    }

    /// Query the status once and append its data row
    async fn poll_once(&self, file: &mut File) -> Result<(), String> {
        let output = self
            .control_plane
            .status(&self.workload)
            .await
            .map_err(|e| format!("{e:#}"))?;

        if output.stdout.trim().is_empty() {
            return Err(format!(
                "empty status output (exit code {:?}): {}",
                output.exit_code,
                output.stderr.trim()
            ));
        }

        let row = status_row(&output.stdout).ok_or("status output has no data row")?;
        append_line(file, row)
            .await
            .map_err(|e| format!("failed to write {}: {e}", self.output.display()))
    }
}

/// Deadline `duration` from now, clamped for durations past the clock's range
fn deadline_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

async fn open_output(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
}

/// Append one line and flush so partial output survives a crash
async fn append_line(file: &mut File, line: &str) -> std::io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}
