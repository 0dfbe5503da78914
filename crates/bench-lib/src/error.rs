//! Error types for manifest augmentation and experiment setup.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a benchmark run before any cluster side effect.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest document in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to render manifest: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("invalid duration '{0}': expected <integer><s|m|h>")]
    InvalidDuration(String),
}

impl BenchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
