//! HorizontalPodAutoscaler synthesis for workload documents

use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, MetricSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_yaml::Value;

/// Label set by kompose on converted services
pub const KOMPOSE_SERVICE_LABEL: &str = "io.kompose.service";

/// Generic service label used by hand-written manifests
const SERVICE_LABEL: &str = "service";

pub const MIN_REPLICAS: i32 = 1;
pub const MAX_REPLICAS: i32 = 10;

/// Resolve the name a workload is autoscaled and polled under.
///
/// Precedence: the kompose service label, then the generic `service` label,
/// then `metadata.name`. Empty or non-string values fall through to the next
/// candidate.
pub fn resolve_workload_name(doc: &Value) -> Option<String> {
    let metadata = doc.get("metadata")?;
    let labels = metadata.get("labels");

    let candidates = [
        labels.and_then(|l| l.get(KOMPOSE_SERVICE_LABEL)),
        labels.and_then(|l| l.get(SERVICE_LABEL)),
        metadata.get("name"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

/// Build the autoscaler document targeting the named Deployment.
pub fn autoscaler_document(name: &str, metrics: &[MetricSpec]) -> Result<Value, serde_yaml::Error> {
    let hpa = HorizontalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: super::WORKLOAD_KIND.to_string(),
                name: name.to_string(),
            },
            min_replicas: Some(MIN_REPLICAS),
            max_replicas: MAX_REPLICAS,
            metrics: Some(metrics.to_vec()),
            ..Default::default()
        }),
        ..Default::default()
    };

    serde_yaml::to_value(&hpa)
}
