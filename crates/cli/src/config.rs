//! Settings for the benchmark CLI

use anyhow::{Context, Result};
use bench_lib::experiment::ExperimentBuilder;
use bench_lib::loadgen::Wrk2Config;
use bench_lib::manifest::AugmentOptions;
use bench_lib::MetricSelection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file read when `--config` is not given, if it exists
pub const DEFAULT_SETTINGS_FILE: &str = "hpa-bench.toml";

/// Prefix for environment overrides, e.g. `HPA_BENCH_TARGET`
pub const ENV_PREFIX: &str = "HPA_BENCH";

/// Benchmark settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchSettings {
    /// Directory holding one subdirectory of manifests per service
    #[serde(default = "default_manifest_root")]
    pub manifest_root: PathBuf,

    /// Subdirectory of the manifest root that is never scanned
    #[serde(default = "default_reserved_dir")]
    pub reserved_dir: String,

    /// Combined manifest written by augmentation and applied by the experiment
    #[serde(default = "default_artifact")]
    pub artifact: PathBuf,

    /// Directory receiving `<metric-tag>/<workload>.txt` poll files
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Services that never receive an autoscaler
    #[serde(default = "default_excluded_services")]
    pub excluded_services: Vec<String>,

    #[serde(default = "default_kubectl")]
    pub kubectl: PathBuf,

    /// Kubeconfig passed to kubectl (uses kubectl's default if unset)
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default = "default_wrk")]
    pub wrk: PathBuf,

    /// Lua script describing the request mix
    #[serde(default = "default_wrk_script")]
    pub wrk_script: PathBuf,

    /// `host:port` of the frontend under test
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_threads")]
    pub threads: u32,

    #[serde(default = "default_connections")]
    pub connections: u32,

    /// Requests per second
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Wait after applying before load starts
    #[serde(default = "default_provision_grace")]
    pub provision_grace_secs: u64,

    /// Time allowed past the run duration for the load generator to exit
    #[serde(default = "default_load_grace")]
    pub load_grace_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_manifest_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_reserved_dir() -> String {
    "scripts".to_string()
}

fn default_artifact() -> PathBuf {
    PathBuf::from("hpa_config.yaml")
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_excluded_services() -> Vec<String> {
    vec!["mongodb".to_string()]
}

fn default_kubectl() -> PathBuf {
    PathBuf::from("kubectl")
}

fn default_wrk() -> PathBuf {
    Wrk2Config::default().binary
}

fn default_wrk_script() -> PathBuf {
    Wrk2Config::default().script
}

fn default_target() -> String {
    Wrk2Config::default().target
}

fn default_threads() -> u32 {
    Wrk2Config::default().threads
}

fn default_connections() -> u32 {
    Wrk2Config::default().connections
}

fn default_rate() -> u32 {
    Wrk2Config::default().rate
}

fn default_provision_grace() -> u64 {
    60
}

fn default_load_grace() -> u64 {
    90
}

fn default_poll_interval() -> u64 {
    15
}

impl BenchSettings {
    /// Load settings from a TOML file layered under `HPA_BENCH_*` variables.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
        };

        let config = config::Config::builder()
            .add_source(config::File::from(file.as_path()).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("excluded_services"),
            )
            .build()
            .with_context(|| format!("Failed to load settings from {}", file.display()))?;

        config
            .try_deserialize()
            .context("Failed to parse settings")
    }

    /// Augmentation options for the selected metrics
    pub fn augment_options(&self, metrics: MetricSelection) -> AugmentOptions {
        AugmentOptions {
            reserved_dir: self.reserved_dir.clone(),
            excluded_services: self.excluded_services.clone(),
            ..AugmentOptions::with_metrics(metrics)
        }
    }

    pub fn wrk2_config(&self) -> Wrk2Config {
        Wrk2Config {
            binary: self.wrk.clone(),
            script: self.wrk_script.clone(),
            target: self.target.clone(),
            threads: self.threads,
            connections: self.connections,
            rate: self.rate,
        }
    }

    /// Experiment builder carrying the artifact path and timings
    pub fn experiment_builder(&self) -> ExperimentBuilder {
        ExperimentBuilder::new()
            .manifest(&self.artifact)
            .output_root(&self.output_root)
            .provision_grace(Duration::from_secs(self.provision_grace_secs))
            .load_grace(Duration::from_secs(self.load_grace_secs))
            .poll_interval(Duration::from_secs(self.poll_interval_secs))
    }
}
