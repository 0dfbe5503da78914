//! HPA benchmark CLI
//!
//! Augments a tree of service manifests with resource defaults and
//! HorizontalPodAutoscalers, then runs one load experiment against the
//! result while recording every autoscaler's status.

mod config;
mod output;

use anyhow::{Context, Result};
use bench_lib::controlplane::Kubectl;
use bench_lib::experiment::ExperimentStatus;
use bench_lib::loadgen::Wrk2;
use bench_lib::manifest::augment;
use bench_lib::{parse_interval, MetricSelection, DEFAULT_TARGET_UTILIZATION};
use clap::Parser;
use crate::config::BenchSettings;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status when no metric was selected
const EXIT_ABORTED: u8 = 255;

/// Exit status after Ctrl-C, following the shell convention
const EXIT_INTERRUPTED: u8 = 130;

/// HPA benchmark CLI
#[derive(Parser)]
#[command(name = "hpa-bench")]
#[command(author, version, about = "Run HPA benchmark experiments", long_about = None)]
pub struct Cli {
    /// Scale on CPU utilization
    #[arg(long, short)]
    pub cpu: bool,

    /// Scale on memory utilization
    #[arg(long, short)]
    pub memory: bool,

    /// Experiment duration (e.g., 30s, 10m, 1h)
    #[arg(long, short, default_value = "10m")]
    pub time: String,

    /// Target average utilization percentage for every metric
    #[arg(long, default_value_t = DEFAULT_TARGET_UTILIZATION, value_parser = clap::value_parser!(i32).range(1..))]
    pub target_utilization: i32,

    /// Settings file (defaults to hpa-bench.toml if present)
    #[arg(long, env = "HPA_BENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the combined manifest and exit without running the experiment
    #[arg(long)]
    pub augment_only: bool,

    /// Output format for the run summary
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let settings = BenchSettings::load(cli.config.as_deref())?;
    let duration = parse_interval(&cli.time)?;

    let metrics = MetricSelection {
        target_utilization: cli.target_utilization,
        ..MetricSelection::new(cli.cpu, cli.memory)
    };
    if metrics.is_empty() {
        warn!("No metrics selected, no autoscalers will be generated");
    }

    let augmentation = augment(&settings.manifest_root, &settings.augment_options(metrics))
        .with_context(|| {
            format!(
                "Failed to augment manifests under {}",
                settings.manifest_root.display()
            )
        })?;
    augmentation.write_to(&settings.artifact)?;
    if matches!(cli.format, output::OutputFormat::Table) {
        output::print_augmentation(&augmentation, &settings.artifact);
    }

    if cli.augment_only {
        return Ok(ExitCode::SUCCESS);
    }

    let mut kubectl = Kubectl::new(settings.kubectl.clone());
    if let Some(kubeconfig) = &settings.kubeconfig {
        kubectl = kubectl.kubeconfig(kubeconfig.clone());
    }
    if let Some(namespace) = &settings.namespace {
        kubectl = kubectl.namespace(namespace.clone());
    }

    let experiment = settings
        .experiment_builder()
        .control_plane(Arc::new(kubectl))
        .load_generator(Arc::new(Wrk2::new(settings.wrk2_config())))
        .build()?;

    let shutdown = experiment.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping experiment");
            let _ = shutdown.send(());
        }
    });

    info!(
        workloads = augmentation.workloads.len(),
        duration_secs = duration.as_secs(),
        "Starting experiment"
    );
    let report = experiment
        .run(&augmentation.workloads, duration, metrics.tag().as_deref())
        .await;
    output::print_report(&report, cli.format);

    Ok(match report.status {
        ExperimentStatus::Completed => ExitCode::SUCCESS,
        ExperimentStatus::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        ExperimentStatus::Aborted => ExitCode::from(EXIT_ABORTED),
    })
}
