//! Domain types shared across Flotilla crates.
//!
//! These mirror the persisted objects of the fleet: bundles, deployment
//! records, clusters, parent repositories and image scans. All types are
//! serde-serializable; maps are `BTreeMap` so that serialized output is
//! stable across runs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::labels::{BUNDLE_NAME_LABEL, BUNDLE_NAMESPACE_LABEL};

/// Label set attached to an object.
pub type Labels = BTreeMap<String, String>;

// ── Object identity ────────────────────────────────────────────────

/// Namespace/name pair identifying a namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Metadata common to every stored object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Bumped by the API server on every spec change.
    #[serde(default)]
    pub generation: i64,
    /// Unix timestamp set once deletion of the object has been requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<u64>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Look up a label, treating an empty value as absent.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }
}

// ── Deployment options ─────────────────────────────────────────────

/// Options that control how a bundle is deployed to one cluster.
///
/// A bundle carries base options; each target may override them. The merged
/// result is what gets staged on a deployment record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleDeploymentOptions {
    /// Namespace assigned to namespaced objects that do not declare one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_namespace: String,
    /// Forces every namespaced object into this namespace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account: String,
    /// Values handed to the manifest renderer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, serde_json::Value>,
    /// Bumping this forces a redeploy even when nothing else changed.
    #[serde(default)]
    pub force_sync_generation: i64,
    /// Keep applied resources when the deployment record is deleted.
    #[serde(default)]
    pub keep_resources: bool,
}

// ── Bundle ─────────────────────────────────────────────────────────

/// Either an absolute count or a percentage string such as `"25%"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrPercent {
    Int(u32),
    Percent(String),
}

impl IntOrPercent {
    /// Resolve against `total`; percentages round up. A percentage whose
    /// result does not fit in a `u32` is rejected.
    pub fn scaled(&self, total: u32) -> CoreResult<u32> {
        match self {
            IntOrPercent::Int(n) => Ok(*n),
            IntOrPercent::Percent(raw) => {
                let invalid = || CoreError::InvalidIntOrPercent(raw.clone());
                let pct: u64 = raw
                    .trim()
                    .strip_suffix('%')
                    .and_then(|n| n.trim().parse().ok())
                    .ok_or_else(invalid)?;
                let scaled = u64::from(total)
                    .checked_mul(pct)
                    .ok_or_else(invalid)?
                    .div_ceil(100);
                u32::try_from(scaled).map_err(|_| invalid())
            }
        }
    }
}

/// Progressive-rollout policy declared on a bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolloutStrategy {
    /// Clusters allowed to be unavailable at once, fleet-wide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<IntOrPercent>,
    /// Partitions allowed to be unavailable before the rollout halts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable_partitions: Option<IntOrPercent>,
    /// Size of automatically created partitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_partition_size: Option<IntOrPercent>,
}

/// Reference to another bundle this one depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: Labels,
}

/// One raw manifest file carried by a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleResource {
    pub name: String,
    pub content: String,
}

/// Declares which clusters a bundle applies to, with per-target overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleTarget {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_group: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_selector: Labels,
    #[serde(default)]
    pub options: BundleDeploymentOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleSpec {
    /// Base options; targets override them.
    #[serde(default)]
    pub options: BundleDeploymentOptions,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_strategy: Option<RolloutStrategy>,
    #[serde(default)]
    pub resources: Vec<BundleResource>,
    #[serde(default)]
    pub targets: Vec<BundleTarget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<BundleRef>,
}

/// A versioned, declarative unit of desired resources targeting clusters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub meta: ObjectMeta,
    pub spec: BundleSpec,
    #[serde(default)]
    pub status: BundleStatus,
}

// ── Bundle status ──────────────────────────────────────────────────

/// Per-state counts of deployment records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSummary {
    pub not_ready: u32,
    pub wait_applied: u32,
    pub err_applied: u32,
    pub out_of_sync: u32,
    pub modified: u32,
    pub ready: u32,
    pub pending: u32,
    pub desired_ready: u32,
}

/// Availability of one rollout partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStatus {
    pub name: String,
    /// Number of targets in the partition.
    pub count: u32,
    pub unavailable: u32,
    pub max_unavailable: u32,
    #[serde(default)]
    pub summary: BundleSummary,
}

/// Human-readable status strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDisplay {
    /// `"<ready>/<desired>"`.
    pub ready_clusters: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    /// `"True"`, `"False"` or `"Unknown"`.
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleStatus {
    pub summary: BundleSummary,
    pub newly_created: u32,
    pub unavailable: u32,
    pub unavailable_partitions: u32,
    pub max_unavailable: u32,
    pub max_unavailable_partitions: u32,
    pub max_new: u32,
    #[serde(default)]
    pub partition_status: Vec<PartitionStatus>,
    #[serde(default)]
    pub display: BundleDisplay,
    /// Sorted inventory of resources the bundle owns.
    #[serde(default)]
    pub resource_key: Vec<ResourceKey>,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ── Deployment record ──────────────────────────────────────────────

/// Active and staged halves of a deployment record.
///
/// The staged half always tracks the latest computed desired state; the
/// active half is what has been promoted and should be applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleDeploymentSpec {
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub staged_options: BundleDeploymentOptions,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub staged_deployment_id: String,
    #[serde(default)]
    pub options: BundleDeploymentOptions,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deployment_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<BundleRef>,
}

/// Reported by the agent running in the downstream cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDeploymentStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub applied_deployment_id: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub non_modified: bool,
}

/// Persisted per-(bundle, cluster) child state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleDeployment {
    pub meta: ObjectMeta,
    pub spec: BundleDeploymentSpec,
    #[serde(default)]
    pub status: BundleDeploymentStatus,
}

impl BundleDeployment {
    /// Owning bundle, as recorded in the owner labels.
    pub fn owner(&self) -> Option<ObjectKey> {
        let namespace = self.meta.label(BUNDLE_NAMESPACE_LABEL)?;
        let name = self.meta.label(BUNDLE_NAME_LABEL)?;
        Some(ObjectKey::new(namespace, name))
    }
}

// ── Cluster, repos, scans ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub paused: bool,
}

/// A downstream cluster registered with the fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepoSpec {
    pub repo: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
}

/// Source repository that bundles and image scans are generated from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitRepo {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub spec: GitRepoSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageScanSpec {
    /// Name of the parent repository in the same namespace.
    pub git_repo_name: String,
    pub image: String,
}

/// Periodic image-tag scan owned by a parent repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageScan {
    pub meta: ObjectMeta,
    pub spec: ImageScanSpec,
}

// ── Resource keys ──────────────────────────────────────────────────

/// Group, version and kind of a rendered object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// Split an `apiVersion` such as `apps/v1` (or core `v1`) into group and version.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Fully-qualified identity of one rendered resource.
///
/// Field order matters: the derived `Ord` sorts by API version, then kind,
/// then namespace, then name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{} {}", self.api_version, self.kind, self.name)
        } else {
            write!(
                f,
                "{}/{} {}/{}",
                self.api_version, self.kind, self.namespace, self.name
            )
        }
    }
}
