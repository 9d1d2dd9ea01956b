//! Content digests for manifests, deployments and cluster namespaces.
//!
//! A deployment id is `<manifest id>:<options digest>`, so two targets get
//! the same id exactly when they render the same resources with the same
//! merged options.

use sha2::{Digest, Sha256};

use crate::error::CoreResult;
use crate::types::{BundleDeploymentOptions, BundleResource, ObjectKey};

/// Identify a set of raw resources by content.
pub fn manifest_id(resources: &[BundleResource]) -> String {
    let mut hasher = Sha256::new();
    for resource in resources {
        // Length prefixes keep ("ab","c") distinct from ("a","bc").
        for part in [&resource.name, &resource.content] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
    }
    format!("s-{}", hex::encode(hasher.finalize()))
}

/// Identify a manifest deployed with a particular set of options.
pub fn deployment_id(manifest_id: &str, options: &BundleDeploymentOptions) -> CoreResult<String> {
    let encoded = serde_json::to_vec(options)?;
    let digest = hex::encode(Sha256::digest(&encoded));
    Ok(format!("{manifest_id}:{digest}"))
}

/// Namespace holding the deployment records of one cluster.
///
/// Readable prefix plus a short hash of `namespace/name`, so clusters that
/// share a name across namespaces never share records.
pub fn cluster_namespace(cluster: &ObjectKey) -> String {
    let digest = Sha256::digest(format!("{}/{}", cluster.namespace, cluster.name));
    let short = hex::encode(&digest[..6]);
    format!("cluster-{}-{}-{short}", cluster.namespace, cluster.name)
}
