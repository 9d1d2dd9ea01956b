//! Which bundles a cluster belongs to.
//!
//! Deployment records for a cluster live in the namespace given by
//! `digest::cluster_namespace` for the cluster's key, and carry owner labels
//! naming their bundle.

use flotilla_core::digest::cluster_namespace;
use flotilla_core::{Bundle, BundleDeployment, BundleTarget, Cluster, ObjectKey};
use flotilla_state::StateStore;

/// Bundles affected by a cluster change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterMembership {
    /// Bundles that target the cluster and must be re-evaluated.
    pub to_refresh: Vec<Bundle>,
    /// Bundles that no longer target the cluster but may still have
    /// deployment records in it.
    pub to_cleanup: Vec<Bundle>,
}

pub trait MembershipIndex {
    fn bundles_for_cluster(&self, cluster: &Cluster) -> anyhow::Result<ClusterMembership>;

    fn deployments_for_bundle_in_cluster(
        &self,
        bundle: &Bundle,
        cluster: &Cluster,
    ) -> anyhow::Result<Vec<BundleDeployment>>;

    /// Owning bundle of a deployment record, if it names one.
    fn bundle_from_deployment(&self, deployment: &BundleDeployment) -> Option<ObjectKey> {
        deployment.owner()
    }
}

/// Membership computed from the objects in a `StateStore`.
///
/// A bundle targets a cluster when one of its targets names the cluster
/// or carries a non-empty selector that the cluster's labels satisfy.
/// Cluster groups are not resolved.
pub struct StoreMembership<'a> {
    store: &'a StateStore,
}

impl<'a> StoreMembership<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }
}

impl MembershipIndex for StoreMembership<'_> {
    fn bundles_for_cluster(&self, cluster: &Cluster) -> anyhow::Result<ClusterMembership> {
        let owners: Vec<ObjectKey> = self
            .store
            .list_bundle_deployments(&cluster_namespace(&cluster.meta.key()))?
            .iter()
            .filter_map(BundleDeployment::owner)
            .collect();

        let mut membership = ClusterMembership::default();
        for bundle in self.store.list_bundles()? {
            if bundle.spec.targets.iter().any(|t| matches_cluster(t, cluster)) {
                membership.to_refresh.push(bundle);
            } else if owners.contains(&bundle.meta.key()) {
                membership.to_cleanup.push(bundle);
            }
        }
        Ok(membership)
    }

    fn deployments_for_bundle_in_cluster(
        &self,
        bundle: &Bundle,
        cluster: &Cluster,
    ) -> anyhow::Result<Vec<BundleDeployment>> {
        let key = bundle.meta.key();
        Ok(self
            .store
            .list_bundle_deployments(&cluster_namespace(&cluster.meta.key()))?
            .into_iter()
            .filter(|d| d.owner().as_ref() == Some(&key))
            .collect())
    }
}

pub(crate) fn matches_cluster(target: &BundleTarget, cluster: &Cluster) -> bool {
    if !target.cluster_name.is_empty() {
        return target.cluster_name == cluster.meta.name;
    }
    !target.cluster_selector.is_empty()
        && target
            .cluster_selector
            .iter()
            .all(|(k, v)| cluster.meta.labels.get(k) == Some(v))
}
