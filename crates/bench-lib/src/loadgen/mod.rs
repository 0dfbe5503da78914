//! Load-generator collaborator
//!
//! The generator runs against the system under test for the experiment's
//! duration. Implementations own the process they spawn and must stop it
//! once the request's bound elapses or shutdown is requested.

mod wrk;

pub use wrk::{Wrk2, Wrk2Config};

use crate::controlplane::CommandOutput;
use crate::shutdown::Shutdown;
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;

pub use async_trait::async_trait;

/// Parameters for one load run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    /// How long the generator should produce load
    pub duration: Duration,
    /// Hard limit on how long to wait for the generator to exit
    pub bound: Duration,
}

/// How a load run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "output", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The generator exited on its own; see the exit code for success
    Completed(CommandOutput),
    /// The bound elapsed and the generator was killed
    TimedOut(CommandOutput),
    /// Shutdown was requested and the generator was killed
    Interrupted(CommandOutput),
}

impl LoadOutcome {
    pub fn output(&self) -> &CommandOutput {
        match self {
            LoadOutcome::Completed(output)
            | LoadOutcome::TimedOut(output)
            | LoadOutcome::Interrupted(output) => output,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadOutcome::Completed(output) if output.success() => "completed",
            LoadOutcome::Completed(_) => "failed",
            LoadOutcome::TimedOut(_) => "timed_out",
            LoadOutcome::Interrupted(_) => "interrupted",
        }
    }
}

/// Drives traffic against the system under test
#[async_trait]
pub trait LoadGenerator: Send + Sync {
    async fn run(&self, request: LoadRequest, shutdown: Shutdown) -> Result<LoadOutcome>;
}
