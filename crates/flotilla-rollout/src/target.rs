//! Targets, partitions and the target-resolution capability.

use flotilla_core::{
    Bundle, BundleDeployment, BundleDeploymentOptions, BundleSummary, ObjectKey, PartitionStatus,
    RolloutStrategy,
};

/// One bundle paired with one matching cluster.
///
/// Targets are rebuilt on every pass and never persisted; only the
/// deployment record they may carry is.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub bundle: ObjectKey,
    pub cluster: ObjectKey,
    /// Pause inherited from the cluster or the bundle.
    pub paused: bool,
    /// Merged options for this cluster.
    pub options: BundleDeploymentOptions,
    /// Content hash of the manifest rendered with `options`.
    pub deployment_id: String,
    /// Rollout policy of the bundle, consulted when computing budgets.
    pub strategy: RolloutStrategy,
    /// Existing deployment record, if any.
    pub deployment: Option<BundleDeployment>,
}

impl Target {
    /// True when either the target or its record is paused.
    pub fn is_paused(&self) -> bool {
        self.paused || self.deployment.as_ref().is_some_and(|d| d.spec.paused)
    }
}

/// An ordered group of targets sharing an availability budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub status: PartitionStatus,
    pub targets: Vec<Target>,
}

/// Everything the engine needs to know about targets, supplied by the
/// target-resolution manager.
///
/// Cluster matching, partitioning policy and budget arithmetic all live
/// behind this trait so the engine can be driven by fakes in tests.
pub trait TargetResolver {
    /// Compute one target per cluster matching the bundle.
    fn targets(&self, bundle: &Bundle) -> anyhow::Result<Vec<Target>>;

    /// Group targets into ordered partitions with initial statuses.
    fn partitions(&self, targets: Vec<Target>) -> anyhow::Result<Vec<Partition>>;

    fn summary(&self, targets: &[Target]) -> BundleSummary;

    /// Number of targets whose record is currently unavailable.
    fn unavailable(&self, targets: &[Target]) -> u32;

    /// Fleet-wide budget of concurrently unavailable targets.
    fn max_unavailable(&self, targets: &[Target]) -> anyhow::Result<u32>;

    /// Budget of unavailable partitions before the rollout halts.
    fn max_unavailable_partitions(&self, partitions: &[Partition]) -> anyhow::Result<u32>;

    fn is_partition_unavailable(&self, status: &PartitionStatus, targets: &[Target]) -> bool;

    fn is_unavailable(&self, deployment: &BundleDeployment) -> bool;

    /// Attach a freshly identified, empty deployment record to the target.
    fn assign_new_deployment(&self, target: &mut Target);
}
