//! Default resource requests and limits for workload containers

use super::is_workload;
use crate::models::{ResourceDefaults, ResourceQuantities};
use serde_yaml::{Mapping, Value};

/// Container lists of a pod spec that receive defaults
const CONTAINER_LISTS: [&str; 2] = ["containers", "initContainers"];

/// Fill missing `resources.requests` and `resources.limits` keys on every
/// container of a workload document.
///
/// Existing values are never overwritten. Returns the number of keys that
/// were inserted, so a second pass over the same document returns zero.
/// Documents that are not workloads are left untouched.
pub fn fill_resource_defaults(doc: &mut Value, defaults: &ResourceDefaults) -> usize {
    if !is_workload(doc) {
        return 0;
    }

    let Some(pod_spec) = doc
        .get_mut("spec")
        .and_then(|spec| spec.get_mut("template"))
        .and_then(|template| template.get_mut("spec"))
        .and_then(Value::as_mapping_mut)
    else {
        return 0;
    };

    let mut filled = 0;
    for list in CONTAINER_LISTS {
        let Some(containers) = pod_spec.get_mut(list).and_then(Value::as_sequence_mut) else {
            continue;
        };

        for container in containers.iter_mut().filter_map(Value::as_mapping_mut) {
            let resources = child_mapping(container, "resources");
            filled += fill_quantities(child_mapping(resources, "requests"), &defaults.requests);
            filled += fill_quantities(child_mapping(resources, "limits"), &defaults.limits);
        }
    }

    filled
}

/// Get the mapping stored under `key`, replacing a missing, null or
/// non-mapping value with an empty mapping.
fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    let slot = parent
        .entry(Value::from(key))
        .or_insert_with(|| Value::Mapping(Mapping::new()));

    if !slot.is_mapping() {
        *slot = Value::Mapping(Mapping::new());
    }

    match slot {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!("slot was just set to a mapping"),
    }
}

fn fill_quantities(target: &mut Mapping, defaults: &ResourceQuantities) -> usize {
    let mut filled = 0;
    for (key, value) in [("cpu", &defaults.cpu), ("memory", &defaults.memory)] {
        if !target.contains_key(key) {
            target.insert(Value::from(key), Value::from(value.as_str()));
            filled += 1;
        }
    }
    filled
}
