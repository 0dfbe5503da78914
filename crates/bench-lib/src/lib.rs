//! Library for the HPA benchmark controller
//!
//! This crate provides the core functionality for:
//! - Augmenting Kubernetes manifests with resource defaults and autoscalers
//! - Driving the experiment lifecycle (apply, load, poll, cleanup)
//! - Wrapping the control-plane and load-generator command line tools
//! - Structured logging of experiment events

pub mod controlplane;
pub mod error;
pub mod experiment;
pub mod interval;
pub mod loadgen;
pub mod manifest;
pub mod models;
pub mod observability;
pub mod shutdown;

pub use error::{BenchError, BenchResult};
pub use interval::parse_interval;
pub use models::*;
pub use observability::ExperimentLogger;
