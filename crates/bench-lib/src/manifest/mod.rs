//! Manifest augmentation
//!
//! Scans a tree of per-service Kubernetes manifests, fills default resource
//! requests and limits into Deployment pod templates, and appends a
//! HorizontalPodAutoscaler for every primary workload file. The result is a
//! single multi-document manifest that the experiment applies and deletes.

mod augment;
mod documents;
mod policy;
mod resources;

#[cfg(test)]
mod tests;

pub use augment::{augment, scan_manifest_files, AugmentOptions, Augmentation};
pub use documents::{parse_documents, render_documents};
pub use policy::{autoscaler_document, resolve_workload_name, KOMPOSE_SERVICE_LABEL};
pub use resources::fill_resource_defaults;

use serde_yaml::Value;

/// Document kind carrying a pod template
pub const WORKLOAD_KIND: &str = "Deployment";

/// Returns true if the document is a workload with a pod template
pub fn is_workload(doc: &Value) -> bool {
    doc.get("kind").and_then(Value::as_str) == Some(WORKLOAD_KIND)
}
