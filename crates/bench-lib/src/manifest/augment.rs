//! Manifest tree traversal and the combined artifact

use super::{
    autoscaler_document, fill_resource_defaults, is_workload, parse_documents, render_documents,
    resolve_workload_name,
};
use crate::error::{BenchError, BenchResult};
use crate::models::{MetricSelection, ResourceDefaults};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension of manifest files picked up in each service directory
const MANIFEST_EXTENSION: &str = "yaml";

/// Options controlling one augmentation pass
#[derive(Debug, Clone)]
pub struct AugmentOptions {
    /// Subdirectory of the root that holds tooling, not manifests
    pub reserved_dir: String,
    /// File name suffix identifying a service's primary workload file
    pub workload_suffix: String,
    /// Services never autoscaled, matched as substrings of the file path
    pub excluded_services: Vec<String>,
    /// Quantities filled into containers without their own
    pub defaults: ResourceDefaults,
    /// Metrics driving the synthesized autoscalers
    pub metrics: MetricSelection,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            reserved_dir: "scripts".to_string(),
            workload_suffix: "deployment.yaml".to_string(),
            excluded_services: vec!["mongodb".to_string()],
            defaults: ResourceDefaults::default(),
            metrics: MetricSelection::default(),
        }
    }
}

impl AugmentOptions {
    pub fn with_metrics(metrics: MetricSelection) -> Self {
        Self {
            metrics,
            ..Default::default()
        }
    }

    /// Returns true if the file should receive an autoscaler
    fn is_primary_workload_file(&self, relative: &Path) -> bool {
        let Some(file_name) = relative.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let path = relative.to_string_lossy();

        file_name.ends_with(&self.workload_suffix)
            && !self
                .excluded_services
                .iter()
                .any(|service| path.contains(service.as_str()))
    }
}

/// Result of augmenting a manifest tree
#[derive(Debug, Clone, Default)]
pub struct Augmentation {
    /// All documents in traversal order, autoscalers after their source file
    pub documents: Vec<Value>,
    /// Workloads that received an autoscaler, in traversal order
    pub workloads: Vec<String>,
    pub files_scanned: usize,
    pub defaults_filled: usize,
    pub policies: usize,
}

impl Augmentation {
    /// Render the combined artifact as a multi-document stream
    pub fn render(&self) -> BenchResult<String> {
        Ok(render_documents(&self.documents)?)
    }

    /// Write the combined artifact to `path`, replacing any previous file
    pub fn write_to(&self, path: &Path) -> BenchResult<()> {
        let rendered = self.render()?;
        fs::write(path, rendered).map_err(|e| BenchError::io(path, e))?;

        info!(
            path = %path.display(),
            documents = self.documents.len(),
            policies = self.policies,
            "Wrote combined manifest"
        );
        Ok(())
    }
}

/// List manifest files under `root`, one level of service directories deep.
///
/// Directories and files are sorted by name so repeated runs produce the
/// same artifact.
pub fn scan_manifest_files(root: &Path, reserved_dir: &str) -> BenchResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for dir in sorted_entries(root)? {
        if !dir.is_dir() || dir.file_name().and_then(|n| n.to_str()) == Some(reserved_dir) {
            continue;
        }

        files.extend(sorted_entries(&dir)?.into_iter().filter(|path| {
            path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION)
        }));
    }

    Ok(files)
}

fn sorted_entries(dir: &Path) -> BenchResult<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| BenchError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BenchError::io(dir, e))?;
    entries.sort();
    Ok(entries)
}

/// Augment every manifest under `root`.
///
/// Any unreadable file or malformed document aborts the whole pass.
pub fn augment(root: &Path, options: &AugmentOptions) -> BenchResult<Augmentation> {
    let metrics = options.metrics.metric_specs();
    let mut result = Augmentation::default();

    for path in scan_manifest_files(root, &options.reserved_dir)? {
        let text = fs::read_to_string(&path).map_err(|e| BenchError::io(&path, e))?;
        let mut docs = parse_documents(&text).map_err(|source| BenchError::Parse {
            path: path.clone(),
            source,
        })?;

        for doc in docs.iter_mut() {
            result.defaults_filled += fill_resource_defaults(doc, &options.defaults);
        }

        let relative = path.strip_prefix(root).unwrap_or(&path);
        if !metrics.is_empty() && options.is_primary_workload_file(relative) {
            // A primary workload file defines exactly one Deployment
            let name = docs
                .iter()
                .find(|doc| is_workload(doc))
                .and_then(resolve_workload_name);

            match name {
                Some(name) if result.workloads.contains(&name) => {
                    warn!(
                        workload = %name,
                        file = %relative.display(),
                        "Workload already has an autoscaler, skipping duplicate"
                    );
                }
                Some(name) => {
                    debug!(workload = %name, file = %relative.display(), "Attaching autoscaler");
                    docs.push(autoscaler_document(&name, &metrics)?);
                    result.workloads.push(name);
                    result.policies += 1;
                }
                None => {
                    debug!(file = %relative.display(), "No workload name resolvable, skipping autoscaler");
                }
            }
        }

        result.files_scanned += 1;
        result.documents.extend(docs);
    }

    info!(
        files = result.files_scanned,
        documents = result.documents.len(),
        defaults_filled = result.defaults_filled,
        policies = result.policies,
        "Manifest augmentation complete"
    );

    Ok(result)
}
