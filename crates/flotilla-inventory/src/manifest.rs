//! Bundle manifests and the rendering capability.

use std::collections::BTreeSet;

use flotilla_core::digest;
use flotilla_core::{BundleDeploymentOptions, BundleResource, BundleSpec};
use serde_json::Value;

use crate::error::{InventoryError, InventoryResult};

/// The raw resources of a bundle, identified by their content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub id: String,
    pub resources: Vec<BundleResource>,
}

impl Manifest {
    /// Build the manifest of a bundle. Resource names must be non-empty
    /// and unique.
    pub fn new(spec: &BundleSpec) -> InventoryResult<Self> {
        let mut seen = BTreeSet::new();
        for resource in &spec.resources {
            if resource.name.is_empty() {
                return Err(InventoryError::Manifest("resource with empty name".into()));
            }
            if !seen.insert(resource.name.as_str()) {
                return Err(InventoryError::Manifest(format!(
                    "duplicate resource {}",
                    resource.name
                )));
            }
        }

        Ok(Self {
            id: digest::manifest_id(&spec.resources),
            resources: spec.resources.clone(),
        })
    }

    /// Deployment id for this manifest rendered with `options`.
    pub fn deployment_id(&self, options: &BundleDeploymentOptions) -> InventoryResult<String> {
        Ok(digest::deployment_id(&self.id, options)?)
    }
}

/// Turns a manifest plus options into concrete objects.
pub trait ManifestRenderer {
    fn template(
        &self,
        bundle_name: &str,
        manifest: &Manifest,
        options: &BundleDeploymentOptions,
    ) -> anyhow::Result<Vec<Value>>;
}

/// Renderer for manifests whose resources are already plain JSON.
///
/// Each resource holds one object or an array of objects. Blank resources
/// are skipped. No value substitution takes place.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonManifestRenderer;

impl ManifestRenderer for JsonManifestRenderer {
    fn template(
        &self,
        _bundle_name: &str,
        manifest: &Manifest,
        _options: &BundleDeploymentOptions,
    ) -> anyhow::Result<Vec<Value>> {
        let mut objects = Vec::new();
        for resource in &manifest.resources {
            if resource.content.trim().is_empty() {
                continue;
            }
            let parsed: Value = serde_json::from_str(&resource.content)
                .map_err(|e| anyhow::anyhow!("resource {}: {e}", resource.name))?;
            match parsed {
                Value::Array(items) => objects.extend(items),
                Value::Object(_) => objects.push(parsed),
                _ => anyhow::bail!("resource {} is not an object", resource.name),
            }
        }
        Ok(objects)
    }
}
