//! Output formatting utilities

use bench_lib::experiment::{ExperimentStatus, RunReport};
use bench_lib::manifest::Augmentation;
use clap::ValueEnum;
use colored::Colorize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// One poll output file in the summary table
#[derive(Debug, Tabled)]
struct PollerRow {
    #[tabled(rename = "WORKLOAD")]
    workload: String,
    #[tabled(rename = "ROWS")]
    rows: usize,
    #[tabled(rename = "FAILURES")]
    failures: String,
    #[tabled(rename = "FILE")]
    file: String,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Summarize a finished augmentation pass
pub fn print_augmentation(augmentation: &Augmentation, artifact: &Path) {
    print_success(&format!(
        "Wrote {} ({} documents from {} files)",
        artifact.display(),
        augmentation.documents.len(),
        augmentation.files_scanned
    ));
    print_info(&defaults_summary(augmentation.defaults_filled));

    if augmentation.workloads.is_empty() {
        print_warning("No autoscalers generated");
    } else {
        print_info(&format!(
            "Autoscalers for {} workloads: {}",
            augmentation.policies,
            augmentation.workloads.join(", ")
        ));
    }
}

/// Print the outcome of an experiment
pub fn print_report(report: &RunReport, format: OutputFormat) {
    if let OutputFormat::Json = format {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => print_error(&format!("Failed to serialize report: {e}")),
        }
        return;
    }

    let elapsed = report.finished_at - report.started_at;
    println!();
    println!(
        "{} {} in {}s",
        "Experiment".bold(),
        color_status(status_label(report.status)),
        elapsed.num_seconds()
    );

    if report.status == ExperimentStatus::Aborted {
        print_warning("No metrics specified, nothing was applied");
        return;
    }

    if let Some(tag) = &report.metric_tag {
        println!("  Metric tag: {}", tag);
    }
    println!("  Apply:      {}", color_status(outcome_label(report.apply_succeeded)));
    match (&report.load, &report.load_error) {
        (Some(outcome), _) => println!("  Load:       {}", color_status(outcome.label())),
        (None, Some(error)) => println!("  Load:       {} ({})", color_status("failed"), error),
        (None, None) => println!("  Load:       {}", color_status("skipped")),
    }
    println!("  Cleanup:    {}", color_status(outcome_label(report.cleanup_succeeded)));
    println!();

    let rows: Vec<PollerRow> = report
        .pollers
        .iter()
        .map(|p| PollerRow {
            workload: p.workload.clone(),
            rows: p.lines_written,
            failures: match &p.error {
                Some(error) => error.red().to_string(),
                None => color_failures(p.failures),
            },
            file: p.output.display().to_string(),
        })
        .collect();
    print_table(&rows);

    println!(
        "\nTotal: {} rows, {} failed polls",
        report.total_lines(),
        report.total_failures()
    );
}

/// `fill_resource_defaults` counts individual cpu and memory entries
fn defaults_summary(filled: usize) -> String {
    format!("Filled {} missing resource keys with defaults", filled)
}

fn status_label(status: ExperimentStatus) -> &'static str {
    match status {
        ExperimentStatus::Completed => "completed",
        ExperimentStatus::Interrupted => "interrupted",
        ExperimentStatus::Aborted => "aborted",
    }
}

fn outcome_label(succeeded: Option<bool>) -> &'static str {
    match succeeded {
        Some(true) => "ok",
        Some(false) => "failed",
        None => "skipped",
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "completed" | "ok" => status.green().to_string(),
        "interrupted" | "timed_out" | "skipped" => status.yellow().to_string(),
        "aborted" | "failed" | "error" => status.red().to_string(),
        _ => status.to_string(),
    }
}

fn color_failures(failures: usize) -> String {
    if failures == 0 {
        failures.to_string().green().to_string()
    } else {
        failures.to_string().yellow().to_string()
    }
}
