//! Merging a bundle's base options with one target's overrides.

use std::collections::BTreeMap;

use flotilla_core::{BundleDeploymentOptions, BundleSpec, BundleTarget};
use serde_json::Value;

pub trait OptionsCalculator {
    fn calculate(&self, bundle: &BundleSpec, target: &BundleTarget) -> BundleDeploymentOptions;
}

/// Field-by-field override: a target field wins whenever it is set.
/// Values are merged recursively, with the target winning on conflicts.
/// `keep_resources` is sticky once either side asks for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOptionsCalculator;

impl OptionsCalculator for DefaultOptionsCalculator {
    fn calculate(&self, bundle: &BundleSpec, target: &BundleTarget) -> BundleDeploymentOptions {
        let base = &bundle.options;
        let over = &target.options;

        BundleDeploymentOptions {
            default_namespace: pick(&base.default_namespace, &over.default_namespace),
            target_namespace: pick(&base.target_namespace, &over.target_namespace),
            service_account: pick(&base.service_account, &over.service_account),
            values: merge_values(&base.values, &over.values),
            force_sync_generation: if over.force_sync_generation != 0 {
                over.force_sync_generation
            } else {
                base.force_sync_generation
            },
            keep_resources: base.keep_resources || over.keep_resources,
        }
    }
}

fn pick(base: &str, over: &str) -> String {
    let chosen = if over.is_empty() { base } else { over };
    chosen.to_string()
}

fn merge_values(
    base: &BTreeMap<String, Value>,
    over: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut merged = base.clone();
    for (key, value) in over {
        match merged.get_mut(key) {
            Some(existing) => merge_value(existing, value),
            None => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

fn merge_value(base: &mut Value, over: &Value) {
    match (base, over) {
        (Value::Object(base), Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, over) => *base = over.clone(),
    }
}
