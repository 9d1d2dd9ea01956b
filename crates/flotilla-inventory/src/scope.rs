//! Namespaced vs cluster-scoped kinds.

use std::collections::BTreeSet;

use flotilla_core::GroupVersionKind;

pub trait ScopeResolver {
    /// Whether objects of this kind live in a namespace. Errors mean the
    /// kind could not be looked up.
    fn is_namespaced(&self, gvk: &GroupVersionKind) -> anyhow::Result<bool>;
}

/// Cluster-scoped kinds that ship with every cluster, keyed by (group, kind).
const CLUSTER_SCOPED: &[(&str, &str)] = &[
    ("", "Namespace"),
    ("", "Node"),
    ("", "PersistentVolume"),
    ("apiextensions.k8s.io", "CustomResourceDefinition"),
    ("rbac.authorization.k8s.io", "ClusterRole"),
    ("rbac.authorization.k8s.io", "ClusterRoleBinding"),
    ("storage.k8s.io", "StorageClass"),
    ("scheduling.k8s.io", "PriorityClass"),
    ("admissionregistration.k8s.io", "MutatingWebhookConfiguration"),
    ("admissionregistration.k8s.io", "ValidatingWebhookConfiguration"),
    ("apiregistration.k8s.io", "APIService"),
];

const NAMESPACED: &[(&str, &str)] = &[
    ("", "ConfigMap"),
    ("", "Secret"),
    ("", "Service"),
    ("", "ServiceAccount"),
    ("", "Pod"),
    ("", "PersistentVolumeClaim"),
    ("apps", "Deployment"),
    ("apps", "StatefulSet"),
    ("apps", "DaemonSet"),
    ("apps", "ReplicaSet"),
    ("batch", "Job"),
    ("batch", "CronJob"),
    ("networking.k8s.io", "Ingress"),
    ("networking.k8s.io", "NetworkPolicy"),
    ("rbac.authorization.k8s.io", "Role"),
    ("rbac.authorization.k8s.io", "RoleBinding"),
    ("policy", "PodDisruptionBudget"),
    ("autoscaling", "HorizontalPodAutoscaler"),
];

/// Scope table for well-known kinds, extensible with custom kinds.
///
/// Kinds in neither table are reported as lookup errors.
#[derive(Debug, Clone)]
pub struct StaticScopeResolver {
    cluster_scoped: BTreeSet<(String, String)>,
    namespaced: BTreeSet<(String, String)>,
}

impl Default for StaticScopeResolver {
    fn default() -> Self {
        let owned = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(g, k)| (g.to_string(), k.to_string()))
                .collect()
        };
        Self {
            cluster_scoped: owned(CLUSTER_SCOPED),
            namespaced: owned(NAMESPACED),
        }
    }
}

impl StaticScopeResolver {
    pub fn with_kind(mut self, group: &str, kind: &str, namespaced: bool) -> Self {
        let key = (group.to_string(), kind.to_string());
        if namespaced {
            self.cluster_scoped.remove(&key);
            self.namespaced.insert(key);
        } else {
            self.namespaced.remove(&key);
            self.cluster_scoped.insert(key);
        }
        self
    }
}

impl ScopeResolver for StaticScopeResolver {
    fn is_namespaced(&self, gvk: &GroupVersionKind) -> anyhow::Result<bool> {
        let key = (gvk.group.clone(), gvk.kind.clone());
        if self.namespaced.contains(&key) {
            Ok(true)
        } else if self.cluster_scoped.contains(&key) {
            Ok(false)
        } else {
            anyhow::bail!("no scope known for {gvk}")
        }
    }
}
