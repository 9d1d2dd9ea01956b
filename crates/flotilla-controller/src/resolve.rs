//! Routes deployment record changes to the owning bundle.

use tracing::debug;

use flotilla_core::{BundleDeployment, ObjectKey};

use crate::membership::MembershipIndex;

/// Bundles to re-reconcile when `deployment` changes: its owner, or
/// nothing if the record names no owner.
pub fn resolve_bundle(index: &dyn MembershipIndex, deployment: &BundleDeployment) -> Vec<ObjectKey> {
    match index.bundle_from_deployment(deployment) {
        Some(owner) if !owner.namespace.is_empty() && !owner.name.is_empty() => {
            debug!(bundle = %owner, deployment = %deployment.meta.key(), "enqueue bundle for deployment change");
            vec![owner]
        }
        _ => Vec::new(),
    }
}
