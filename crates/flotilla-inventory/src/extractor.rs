//! Resource inventory extraction.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, warn};

use flotilla_core::{Bundle, BundleStatus, BundleTarget, GroupVersionKind, ResourceKey};

use crate::error::{InventoryError, InventoryResult};
use crate::manifest::{Manifest, ManifestRenderer};
use crate::options::OptionsCalculator;
use crate::scope::ScopeResolver;

/// Computes the set of resources a bundle owns across all its targets.
pub struct InventoryExtractor<'a> {
    renderer: &'a dyn ManifestRenderer,
    options: &'a dyn OptionsCalculator,
    scope: &'a dyn ScopeResolver,
    /// Namespace for namespaced objects when neither the object nor the
    /// options name one.
    fallback_namespace: String,
}

impl<'a> InventoryExtractor<'a> {
    pub fn new(
        renderer: &'a dyn ManifestRenderer,
        options: &'a dyn OptionsCalculator,
        scope: &'a dyn ScopeResolver,
        fallback_namespace: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            options,
            scope,
            fallback_namespace: fallback_namespace.into(),
        }
    }

    /// Recompute `status.resource_key` if the bundle changed since it was
    /// last observed. Returns whether the inventory was recomputed.
    ///
    /// On error the existing inventory is left in place.
    pub fn refresh(&self, bundle: &Bundle, status: &mut BundleStatus) -> InventoryResult<bool> {
        if status.observed_generation == bundle.meta.generation {
            return Ok(false);
        }
        status.resource_key = self.extract(bundle)?;
        Ok(true)
    }

    /// Render every declared target and collect the sorted, deduplicated
    /// resource keys. Any render failure aborts the whole extraction.
    pub fn extract(&self, bundle: &Bundle) -> InventoryResult<Vec<ResourceKey>> {
        let manifest = Manifest::new(&bundle.spec)?;
        let mut keys = BTreeSet::new();

        for (index, target) in bundle.spec.targets.iter().enumerate() {
            let opts = self.options.calculate(&bundle.spec, target);
            let objects = self
                .renderer
                .template(&bundle.meta.name, &manifest, &opts)
                .map_err(|source| InventoryError::Render {
                    target: target_label(target, index),
                    source,
                })?;

            let default_namespace = if opts.default_namespace.is_empty() {
                self.fallback_namespace.as_str()
            } else {
                opts.default_namespace.as_str()
            };
            for object in &objects {
                keys.insert(self.resource_key(object, default_namespace)?);
            }
        }

        debug!(bundle = %bundle.meta.key(), resources = keys.len(), "inventory extracted");
        Ok(keys.into_iter().collect())
    }

    fn resource_key(&self, object: &Value, default_namespace: &str) -> InventoryResult<ResourceKey> {
        let api_version = str_field(object, &["apiVersion"])
            .ok_or(InventoryError::MalformedObject { field: "apiVersion" })?;
        let kind =
            str_field(object, &["kind"]).ok_or(InventoryError::MalformedObject { field: "kind" })?;
        let name = str_field(object, &["metadata", "name"])
            .ok_or(InventoryError::MalformedObject { field: "metadata.name" })?;
        let mut namespace = str_field(object, &["metadata", "namespace"])
            .unwrap_or_default()
            .to_string();

        let gvk = GroupVersionKind::from_api_version(api_version, kind);
        if namespace.is_empty() && self.namespaced(&gvk) {
            namespace = default_namespace.to_string();
        }

        Ok(ResourceKey {
            api_version: gvk.api_version(),
            kind: gvk.kind,
            namespace,
            name: name.to_string(),
        })
    }

    /// Scope lookup failures count as namespaced.
    fn namespaced(&self, gvk: &GroupVersionKind) -> bool {
        match self.scope.is_namespaced(gvk) {
            Ok(namespaced) => namespaced,
            Err(e) => {
                warn!(gvk = %gvk, error = %e, "scope lookup failed, assuming namespaced");
                true
            }
        }
    }
}

fn str_field<'v>(object: &'v Value, path: &[&str]) -> Option<&'v str> {
    path.iter()
        .try_fold(object, |v, segment| v.get(segment))?
        .as_str()
        .filter(|s| !s.is_empty())
}

fn target_label(target: &BundleTarget, index: usize) -> String {
    if !target.name.is_empty() {
        target.name.clone()
    } else if !target.cluster_name.is_empty() {
        target.cluster_name.clone()
    } else {
        format!("#{index}")
    }
}
