//! Write-back projection of changed deployment records.

use flotilla_core::{Bundle, BundleDeployment, BundleDeploymentStatus, ObjectMeta};

/// Minimal object to persist for a changed record.
///
/// Carries identity, labels and the full spec. Annotations, status and
/// any other metadata are dropped, and `depends_on` is taken from the
/// bundle so it cannot drift per cluster.
pub fn project(deployment: &BundleDeployment, bundle: &Bundle) -> BundleDeployment {
    let mut spec = deployment.spec.clone();
    spec.depends_on = bundle.spec.depends_on.clone();

    BundleDeployment {
        meta: ObjectMeta {
            name: deployment.meta.name.clone(),
            namespace: deployment.meta.namespace.clone(),
            labels: deployment.meta.labels.clone(),
            ..Default::default()
        },
        spec,
        status: BundleDeploymentStatus::default(),
    }
}

pub fn project_all(deployments: &[BundleDeployment], bundle: &Bundle) -> Vec<BundleDeployment> {
    deployments.iter().map(|d| project(d, bundle)).collect()
}
