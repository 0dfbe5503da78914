//! Core data models shared by the augmenter and the experiment controller

use k8s_openapi::api::autoscaling::v2::{MetricSpec, MetricTarget, ResourceMetricSource};
use serde::{Deserialize, Serialize};

/// Default target for `averageUtilization` on every resource metric
pub const DEFAULT_TARGET_UTILIZATION: i32 = 50;

/// Resource metric that can drive a HorizontalPodAutoscaler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
}

impl MetricKind {
    /// Resource name as understood by the metrics API
    pub fn resource_name(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
        }
    }

    /// Fragment contributed to the metric tag of an experiment
    pub fn tag(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu_",
            MetricKind::Memory => "memory_",
        }
    }

    /// Build the autoscaling/v2 metric spec for this resource
    pub fn metric_spec(&self, target_utilization: i32) -> MetricSpec {
        MetricSpec {
            type_: "Resource".to_string(),
            resource: Some(ResourceMetricSource {
                name: self.resource_name().to_string(),
                target: MetricTarget {
                    type_: "Utilization".to_string(),
                    average_utilization: Some(target_utilization),
                    ..Default::default()
                },
            }),
            ..Default::default()
        }
    }
}

/// Metrics selected for one experiment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSelection {
    pub cpu: bool,
    pub memory: bool,
    pub target_utilization: i32,
}

impl Default for MetricSelection {
    fn default() -> Self {
        Self {
            cpu: false,
            memory: false,
            target_utilization: DEFAULT_TARGET_UTILIZATION,
        }
    }
}

impl MetricSelection {
    pub fn new(cpu: bool, memory: bool) -> Self {
        Self {
            cpu,
            memory,
            ..Default::default()
        }
    }

    /// Selected kinds, CPU first
    pub fn kinds(&self) -> Vec<MetricKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.cpu {
            kinds.push(MetricKind::Cpu);
        }
        if self.memory {
            kinds.push(MetricKind::Memory);
        }
        kinds
    }

    pub fn is_empty(&self) -> bool {
        !self.cpu && !self.memory
    }

    /// Metric specs attached to every synthesized autoscaler
    pub fn metric_specs(&self) -> Vec<MetricSpec> {
        self.kinds()
            .iter()
            .map(|kind| kind.metric_spec(self.target_utilization))
            .collect()
    }

    /// Tag namespacing the poll output files, e.g. `cpu_memory_`
    ///
    /// Returns `None` when no metric is selected.
    pub fn tag(&self) -> Option<String> {
        let tag: String = self.kinds().iter().map(MetricKind::tag).collect();
        (!tag.is_empty()).then_some(tag)
    }
}

/// Request and limit quantities for one side of a container's resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantities {
    pub cpu: String,
    pub memory: String,
}

/// Quantities filled into containers that do not declare their own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefaults {
    pub requests: ResourceQuantities,
    pub limits: ResourceQuantities,
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        Self {
            requests: ResourceQuantities {
                cpu: "500m".to_string(),
                memory: "128Mi".to_string(),
            },
            limits: ResourceQuantities {
                cpu: "1000m".to_string(),
                memory: "256Mi".to_string(),
            },
        }
    }
}
