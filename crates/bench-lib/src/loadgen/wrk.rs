//! wrk2 load generator
//!
//! Runs `wrk -t<threads> -c<connections> -d<secs>s -R<rate> -s <script>
//! http://<target>` with a constant request rate and kills it if it outlives
//! the request's bound.

use super::{async_trait, LoadGenerator, LoadOutcome, LoadRequest};
use crate::controlplane::CommandOutput;
use crate::shutdown::Shutdown;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{info, warn};

/// Settings for the wrk2 invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wrk2Config {
    pub binary: PathBuf,
    /// Lua script describing the request mix
    pub script: PathBuf,
    /// `host:port` of the frontend under test
    pub target: String,
    pub threads: u32,
    pub connections: u32,
    /// Constant throughput in requests per second
    pub rate: u32,
}

impl Default for Wrk2Config {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("wrk"),
            script: PathBuf::from("../wrk2/scripts/hotel-reservation/mixed-workload_type_1.lua"),
            target: "127.0.0.1:32000".to_string(),
            threads: 1,
            connections: 20,
            rate: 200,
        }
    }
}

/// wrk2 process launcher
#[derive(Debug, Clone, Default)]
pub struct Wrk2 {
    config: Wrk2Config,
}

enum Waited {
    Exited(ExitStatus),
    TimedOut,
    Interrupted,
}

impl Wrk2 {
    pub fn new(config: Wrk2Config) -> Self {
        Self { config }
    }

    fn command(&self, duration: Duration) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(format!("-t{}", self.config.threads))
            .arg(format!("-c{}", self.config.connections))
            .arg(format!("-d{}s", duration.as_secs()))
            .arg(format!("-R{}", self.config.rate))
            .arg("-s")
            .arg(&self.config.script)
            .arg(format!("http://{}", self.config.target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl LoadGenerator for Wrk2 {
    async fn run(&self, request: LoadRequest, mut shutdown: Shutdown) -> Result<LoadOutcome> {
        let mut child = self
            .command(request.duration)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.config.binary.display()))?;

        info!(
            pid = ?child.id(),
            target = %self.config.target,
            duration_secs = request.duration.as_secs(),
            "Started load generator"
        );

        let stdout = tokio::spawn(read_all(child.stdout.take()));
        let stderr = tokio::spawn(read_all(child.stderr.take()));

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status.context("Failed to wait for load generator")?),
            _ = tokio::time::sleep(request.bound) => Waited::TimedOut,
            _ = shutdown.recv() => Waited::Interrupted,
        };

        let exit_code = match &waited {
            Waited::Exited(status) => status.code(),
            Waited::TimedOut | Waited::Interrupted => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill load generator");
                }
                None
            }
        };

        let output = CommandOutput {
            exit_code,
            stdout: stdout.await.unwrap_or_default(),
            stderr: stderr.await.unwrap_or_default(),
        };

        Ok(match waited {
            Waited::Exited(_) => LoadOutcome::Completed(output),
            Waited::TimedOut => LoadOutcome::TimedOut(output),
            Waited::Interrupted => LoadOutcome::Interrupted(output),
        })
    }
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(&mut buf).await {
            warn!(error = %e, "Failed to read load generator output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    #[test]
    fn test_command_arguments() {
        let wrk = Wrk2::new(Wrk2Config {
            script: PathBuf::from("mixed.lua"),
            target: "10.0.0.5:32000".to_string(),
            ..Default::default()
        });
        let cmd = wrk.command(Duration::from_secs(120));

        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-t1",
                "-c20",
                "-d120s",
                "-R200",
                "-s",
                "mixed.lua",
                "http://10.0.0.5:32000"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let wrk = Wrk2::new(Wrk2Config {
            binary: PathBuf::from("/nonexistent/wrk-for-tests"),
            ..Default::default()
        });
        let (_tx, rx) = broadcast::channel(1);
        let request = LoadRequest {
            duration: Duration::from_secs(1),
            bound: Duration::from_secs(2),
        };

        assert!(wrk.run(request, Shutdown::new(rx)).await.is_err());
    }

    /// Install a stand-in `wrk` that ignores its arguments
    #[cfg(unix)]
    fn fake_wrk(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("wrk");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_completed_run_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let wrk = Wrk2::new(Wrk2Config {
            binary: fake_wrk(&dir, "echo 'Requests/sec:    199.87'"),
            ..Default::default()
        });
        let (_tx, rx) = broadcast::channel(1);
        let request = LoadRequest {
            duration: Duration::from_secs(1),
            bound: Duration::from_secs(10),
        };

        let outcome = wrk.run(request, Shutdown::new(rx)).await.unwrap();

        assert_eq!(outcome.label(), "completed");
        assert!(outcome.output().stdout.contains("Requests/sec"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_overrunning_process_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let wrk = Wrk2::new(Wrk2Config {
            binary: fake_wrk(&dir, "exec sleep 30"),
            ..Default::default()
        });
        let (_tx, rx) = broadcast::channel(1);
        let request = LoadRequest {
            duration: Duration::from_secs(1),
            bound: Duration::from_millis(100),
        };

        let started = std::time::Instant::now();
        let outcome = wrk.run(request, Shutdown::new(rx)).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(outcome.label(), "timed_out");
        assert_eq!(outcome.output().exit_code, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let wrk = Wrk2::new(Wrk2Config {
            binary: fake_wrk(&dir, "exec sleep 30"),
            ..Default::default()
        });
        let (tx, rx) = broadcast::channel(1);
        let request = LoadRequest {
            duration: Duration::from_secs(30),
            bound: Duration::from_secs(60),
        };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(());
        });

        let outcome = wrk.run(request, Shutdown::new(rx)).await.unwrap();
        assert_eq!(outcome.label(), "interrupted");
    }
}
