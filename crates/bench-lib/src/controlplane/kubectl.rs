//! `kubectl` backed control plane

use super::{async_trait, CommandOutput, ControlPlane};
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Runs `kubectl` for every control-plane operation
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: PathBuf,
    kubeconfig: Option<PathBuf>,
    namespace: Option<String>,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl Kubectl {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: None,
            namespace: None,
        }
    }

    /// Use an explicit kubeconfig instead of the ambient one
    pub fn kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Scope status queries and manifests to a namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }
        if let Some(namespace) = &self.namespace {
            cmd.arg("--namespace").arg(namespace);
        }
        cmd.args(args);
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(args);
        debug!(command = ?cmd.as_std(), "Running kubectl");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        Ok(CommandOutput::from_output(output))
    }
}

#[async_trait]
impl ControlPlane for Kubectl {
    async fn apply(&self, manifest: &Path) -> Result<CommandOutput> {
        self.run([OsStr::new("apply"), OsStr::new("-f"), manifest.as_os_str()])
            .await
    }

    async fn status(&self, workload: &str) -> Result<CommandOutput> {
        self.run(["get", "hpa", workload]).await
    }

    async fn delete(&self, manifest: &Path) -> Result<CommandOutput> {
        self.run([OsStr::new("delete"), OsStr::new("-f"), manifest.as_os_str()])
            .await
    }
}
