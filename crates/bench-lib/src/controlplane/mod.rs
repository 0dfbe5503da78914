//! Control-plane collaborator
//!
//! The experiment talks to the cluster only through three operations:
//! apply a manifest, read one autoscaler's status, and delete a manifest.
//! [`Kubectl`] implements them by shelling out to `kubectl`.

mod kubectl;

pub use kubectl::Kubectl;

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

pub use async_trait::async_trait;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub(crate) fn from_output(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Operations the experiment needs from the cluster
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create or update every object in the manifest
    async fn apply(&self, manifest: &Path) -> Result<CommandOutput>;

    /// Tabular status of the named autoscaler
    async fn status(&self, workload: &str) -> Result<CommandOutput>;

    /// Delete every object in the manifest
    async fn delete(&self, manifest: &Path) -> Result<CommandOutput>;
}

/// Extract the data row from tabular status output.
///
/// The control plane prints a header line followed by one row for the
/// requested object; the row is the second non-empty line.
pub fn status_row(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HPA_STATUS: &str = "NAME       REFERENCE             TARGETS   MINPODS   MAXPODS   REPLICAS   AGE\n\
                              frontend   Deployment/frontend   12%/50%   1         10        1          3m\n";

    #[test]
    fn test_status_row_takes_data_line() {
        assert_eq!(
            status_row(HPA_STATUS),
            Some("frontend   Deployment/frontend   12%/50%   1         10        1          3m")
        );
    }

    #[test]
    fn test_status_row_header_only() {
        assert_eq!(status_row("NAME   REFERENCE   TARGETS\n"), None);
        assert_eq!(status_row(""), None);
    }

    #[test]
    fn test_status_row_ignores_blank_lines() {
        assert_eq!(status_row("\nHEADER\n\nrow one\nrow two\n"), Some("row one"));
    }

    #[test]
    fn test_command_output_success() {
        let ok = CommandOutput {
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(ok.success());
        assert!(!CommandOutput::default().success());
        assert!(!CommandOutput {
            exit_code: Some(1),
            ..Default::default()
        }
        .success());
    }
}
