//! Target resolution over the clusters and records in a `StateStore`.
//!
//! Every stored cluster matched by one of the bundle's declared targets
//! becomes a `Target`: options are merged, the deployment id is the
//! manifest digest combined with those options, and the existing record
//! is looked up in the cluster's record namespace. Budgets and partition
//! sizes come from the bundle's rollout strategy.

use flotilla_core::digest::cluster_namespace;
use flotilla_core::labels::{BUNDLE_NAME_LABEL, BUNDLE_NAMESPACE_LABEL};
use flotilla_core::{
    Bundle, BundleDeployment, BundleSummary, IntOrPercent, ObjectKey, ObjectMeta, PartitionStatus,
    RolloutStrategy,
};
use flotilla_inventory::{Manifest, OptionsCalculator};
use flotilla_rollout::{Partition, Target, TargetResolver};
use flotilla_state::StateStore;
use tracing::debug;

use crate::membership::matches_cluster;

/// Fleets smaller than this roll out as a single partition.
const AUTO_PARTITION_THRESHOLD: usize = 200;
const DEFAULT_AUTO_PARTITION_SIZE: &str = "25%";
const DEFAULT_MAX_UNAVAILABLE: &str = "100%";

pub struct StoreTargets<'a> {
    store: &'a StateStore,
    options: &'a dyn OptionsCalculator,
}

impl<'a> StoreTargets<'a> {
    pub fn new(store: &'a StateStore, options: &'a dyn OptionsCalculator) -> Self {
        Self { store, options }
    }
}

impl TargetResolver for StoreTargets<'_> {
    fn targets(&self, bundle: &Bundle) -> anyhow::Result<Vec<Target>> {
        let manifest = Manifest::new(&bundle.spec)?;
        let strategy = bundle.spec.rollout_strategy.clone().unwrap_or_default();
        let bundle_key = bundle.meta.key();

        let mut targets = Vec::new();
        for cluster in self.store.list_clusters()? {
            let Some(declared) = bundle
                .spec
                .targets
                .iter()
                .find(|t| matches_cluster(t, &cluster))
            else {
                continue;
            };
            let options = self.options.calculate(&bundle.spec, declared);
            let deployment_id = manifest.deployment_id(&options)?;
            let cluster_key = cluster.meta.key();
            let deployment = self
                .store
                .get_bundle_deployment(&cluster_namespace(&cluster_key), &record_name(&bundle_key))?;

            targets.push(Target {
                bundle: bundle_key.clone(),
                cluster: cluster_key,
                paused: bundle.spec.paused || cluster.spec.paused,
                options,
                deployment_id,
                strategy: strategy.clone(),
                deployment,
            });
        }

        debug!(bundle = %bundle_key, targets = targets.len(), "targets resolved");
        Ok(targets)
    }

    fn partitions(&self, targets: Vec<Target>) -> anyhow::Result<Vec<Partition>> {
        let strategy = strategy_of(&targets);
        let single = targets.len() < AUTO_PARTITION_THRESHOLD;
        let size = if single {
            targets.len().max(1)
        } else {
            let default = IntOrPercent::Percent(DEFAULT_AUTO_PARTITION_SIZE.into());
            let size = strategy
                .auto_partition_size
                .as_ref()
                .unwrap_or(&default)
                .scaled(count(targets.len()))?;
            usize::try_from(size.max(1))?
        };

        let mut partitions = Vec::new();
        let mut rest = targets.into_iter().peekable();
        while rest.peek().is_some() {
            let chunk: Vec<Target> = rest.by_ref().take(size).collect();
            let name = if single {
                "All".to_string()
            } else {
                format!("Partition {}", partitions.len())
            };
            let status = PartitionStatus {
                name,
                count: count(chunk.len()),
                unavailable: self.unavailable(&chunk),
                max_unavailable: limit(chunk.len(), strategy.max_unavailable.as_ref())?,
                summary: self.summary(&chunk),
            };
            partitions.push(Partition {
                status,
                targets: chunk,
            });
        }
        Ok(partitions)
    }

    fn summary(&self, targets: &[Target]) -> BundleSummary {
        let mut summary = BundleSummary {
            desired_ready: count(targets.len()),
            ..Default::default()
        };
        for target in targets {
            let Some(d) = target.deployment.as_ref() else {
                summary.pending += 1;
                continue;
            };
            if d.spec.deployment_id.is_empty() {
                summary.pending += 1;
            } else if d.spec.deployment_id != d.spec.staged_deployment_id {
                summary.out_of_sync += 1;
            } else if d.status.applied_deployment_id != d.spec.deployment_id {
                summary.wait_applied += 1;
            } else if !d.status.ready {
                summary.not_ready += 1;
            } else if !d.status.non_modified {
                summary.modified += 1;
            } else {
                summary.ready += 1;
            }
        }
        summary
    }

    fn unavailable(&self, targets: &[Target]) -> u32 {
        let n = targets
            .iter()
            .filter_map(|t| t.deployment.as_ref())
            .filter(|d| self.is_unavailable(d))
            .count();
        count(n)
    }

    fn max_unavailable(&self, targets: &[Target]) -> anyhow::Result<u32> {
        limit(targets.len(), strategy_of(targets).max_unavailable.as_ref())
    }

    fn max_unavailable_partitions(&self, partitions: &[Partition]) -> anyhow::Result<u32> {
        let strategy = partitions
            .first()
            .map(|p| strategy_of(&p.targets))
            .unwrap_or_default();
        match strategy.max_unavailable_partitions {
            Some(value) => Ok(value.scaled(count(partitions.len()))?),
            None => Ok(0),
        }
    }

    fn is_partition_unavailable(&self, status: &PartitionStatus, targets: &[Target]) -> bool {
        self.unavailable(targets) > status.max_unavailable
    }

    fn is_unavailable(&self, deployment: &BundleDeployment) -> bool {
        deployment.status.applied_deployment_id != deployment.spec.deployment_id
            || !deployment.status.ready
    }

    fn assign_new_deployment(&self, target: &mut Target) {
        target.deployment = Some(BundleDeployment {
            meta: ObjectMeta::new(cluster_namespace(&target.cluster), record_name(&target.bundle))
                .with_label(BUNDLE_NAMESPACE_LABEL, &target.bundle.namespace)
                .with_label(BUNDLE_NAME_LABEL, &target.bundle.name),
            ..Default::default()
        });
    }
}

/// Name of a bundle's record inside a cluster namespace. Namespaces never
/// contain dots, so the name is unique per bundle.
fn record_name(bundle: &ObjectKey) -> String {
    format!("{}.{}", bundle.namespace, bundle.name)
}

fn strategy_of(targets: &[Target]) -> RolloutStrategy {
    targets
        .first()
        .map(|t| t.strategy.clone())
        .unwrap_or_default()
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Unavailability budget among `total` targets, never below one.
fn limit(total: usize, value: Option<&IntOrPercent>) -> anyhow::Result<u32> {
    if total <= 1 {
        return Ok(1);
    }
    let default = IntOrPercent::Percent(DEFAULT_MAX_UNAVAILABLE.into());
    let scaled = value.unwrap_or(&default).scaled(count(total))?;
    Ok(scaled.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleHandler;
    use crate::membership::{MembershipIndex, StoreMembership};
    use crate::summary::DefaultSummarizer;
    use flotilla_core::{
        BundleResource, BundleSpec, BundleStatus, BundleTarget, Cluster, ClusterSpec,
        ControllerConfig,
    };
    use flotilla_inventory::{
        DefaultOptionsCalculator, InventoryExtractor, JsonManifestRenderer, StaticScopeResolver,
    };

    fn cluster(namespace: &str, name: &str, env: &str) -> Cluster {
        Cluster {
            meta: ObjectMeta::new(namespace, name).with_label("env", env),
            ..Default::default()
        }
    }

    fn bundle(content: &str, strategy: Option<RolloutStrategy>) -> Bundle {
        Bundle {
            meta: ObjectMeta::new("fleet-default", "web"),
            spec: BundleSpec {
                rollout_strategy: strategy,
                resources: vec![BundleResource {
                    name: "cm.json".into(),
                    content: content.into(),
                }],
                targets: vec![BundleTarget {
                    cluster_selector: [("env".to_string(), "prod".to_string())].into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn bare(n: usize, strategy: &RolloutStrategy) -> Vec<Target> {
        (0..n)
            .map(|i| Target {
                bundle: ObjectKey::new("fleet-default", "web"),
                cluster: ObjectKey::new("fleet-default", format!("c{i}")),
                paused: false,
                options: Default::default(),
                deployment_id: "s-a".into(),
                strategy: strategy.clone(),
                deployment: None,
            })
            .collect()
    }

    const CONFIG_MAP: &str =
        r#"{"apiVersion":"v1","kind":"ConfigMap","metadata":{"name":"settings"}}"#;

    #[test]
    fn matching_clusters_become_targets_with_existing_records() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_cluster(&cluster("fleet-default", "edge-1", "prod")).unwrap();
        store.put_cluster(&cluster("fleet-default", "edge-2", "dev")).unwrap();
        let mut paused = cluster("fleet-local", "edge-1", "prod");
        paused.spec = ClusterSpec { paused: true };
        store.put_cluster(&paused).unwrap();

        let b = bundle(CONFIG_MAP, None);
        let resolver = StoreTargets::new(&store, &DefaultOptionsCalculator);

        let mut existing = bare(1, &RolloutStrategy::default()).remove(0);
        existing.cluster = ObjectKey::new("fleet-default", "edge-1");
        resolver.assign_new_deployment(&mut existing);
        store.put_bundle_deployment(existing.deployment.as_ref().unwrap()).unwrap();

        let targets = resolver.targets(&b).unwrap();

        assert_eq!(targets.len(), 2);
        let manifest = Manifest::new(&b.spec).unwrap();
        assert!(targets.iter().all(|t| t.deployment_id.starts_with(&manifest.id)));
        assert_eq!(targets[0].deployment_id, targets[1].deployment_id);

        let default = targets.iter().find(|t| t.cluster.namespace == "fleet-default").unwrap();
        let local = targets.iter().find(|t| t.cluster.namespace == "fleet-local").unwrap();
        assert!(default.deployment.is_some());
        assert!(!default.paused);
        assert!(local.deployment.is_none());
        assert!(local.paused);
    }

    #[test]
    fn new_record_lives_in_cluster_namespace_with_owner_labels() {
        let store = StateStore::open_in_memory().unwrap();
        let resolver = StoreTargets::new(&store, &DefaultOptionsCalculator);
        let mut target = bare(1, &RolloutStrategy::default()).remove(0);

        resolver.assign_new_deployment(&mut target);

        let record = target.deployment.unwrap();
        assert_eq!(record.meta.namespace, cluster_namespace(&target.cluster));
        assert_eq!(record.meta.name, "fleet-default.web");
        let index = StoreMembership::new(&store);
        assert_eq!(
            index.bundle_from_deployment(&record),
            Some(ObjectKey::new("fleet-default", "web"))
        );
    }

    #[test]
    fn small_fleet_is_one_partition() {
        let store = StateStore::open_in_memory().unwrap();
        let resolver = StoreTargets::new(&store, &DefaultOptionsCalculator);

        let partitions = resolver.partitions(bare(12, &RolloutStrategy::default())).unwrap();

        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].status.name, "All");
        assert_eq!(partitions[0].status.count, 12);
        assert_eq!(partitions[0].status.max_unavailable, 12);
        assert_eq!(partitions[0].status.summary.pending, 12);
    }

    #[test]
    fn large_fleet_is_auto_partitioned() {
        let store = StateStore::open_in_memory().unwrap();
        let resolver = StoreTargets::new(&store, &DefaultOptionsCalculator);
        let strategy = RolloutStrategy {
            max_unavailable: Some(IntOrPercent::Percent("10%".into())),
            ..Default::default()
        };

        let partitions = resolver.partitions(bare(450, &strategy)).unwrap();

        let counts: Vec<u32> = partitions.iter().map(|p| p.status.count).collect();
        assert_eq!(counts, vec![113, 113, 113, 111]);
        assert_eq!(partitions[3].status.name, "Partition 3");
        assert_eq!(partitions[0].status.max_unavailable, 12);
    }

    #[test]
    fn budgets_follow_rollout_strategy() {
        let store = StateStore::open_in_memory().unwrap();
        let resolver = StoreTargets::new(&store, &DefaultOptionsCalculator);

        let strategy = RolloutStrategy {
            max_unavailable: Some(IntOrPercent::Percent("10%".into())),
            max_unavailable_partitions: Some(IntOrPercent::Percent("50%".into())),
            auto_partition_size: Some(IntOrPercent::Int(50)),
        };
        let targets = bare(15, &strategy);
        assert_eq!(resolver.max_unavailable(&targets).unwrap(), 2);

        let partitions = resolver.partitions(bare(200, &strategy)).unwrap();
        assert_eq!(partitions.len(), 4);
        assert_eq!(resolver.max_unavailable_partitions(&partitions).unwrap(), 2);

        let none = RolloutStrategy {
            max_unavailable: Some(IntOrPercent::Int(0)),
            ..Default::default()
        };
        assert_eq!(resolver.max_unavailable(&bare(5, &none)).unwrap(), 1);
        let default_partitions = resolver.partitions(bare(5, &none)).unwrap();
        assert_eq!(resolver.max_unavailable_partitions(&default_partitions).unwrap(), 0);

        let broken = RolloutStrategy {
            max_unavailable: Some(IntOrPercent::Percent("many".into())),
            ..Default::default()
        };
        assert!(resolver.max_unavailable(&bare(5, &broken)).is_err());
    }

    #[test]
    fn summary_counts_each_state() {
        let store = StateStore::open_in_memory().unwrap();
        let resolver = StoreTargets::new(&store, &DefaultOptionsCalculator);
        let mut targets = bare(4, &RolloutStrategy::default());
        for t in targets.iter_mut().skip(1) {
            resolver.assign_new_deployment(t);
        }
        let record = |t: &Target| t.deployment.clone().unwrap();

        // targets[1]: active, applied and ready
        let mut ready = record(&targets[1]);
        ready.spec.deployment_id = "s-a".into();
        ready.spec.staged_deployment_id = "s-a".into();
        ready.status.applied_deployment_id = "s-a".into();
        ready.status.ready = true;
        ready.status.non_modified = true;
        targets[1].deployment = Some(ready);

        // targets[2]: newer spec staged but not promoted
        let mut staged = record(&targets[2]);
        staged.spec.deployment_id = "s-a".into();
        staged.spec.staged_deployment_id = "s-b".into();
        targets[2].deployment = Some(staged);

        let summary = resolver.summary(&targets);
        assert_eq!(summary.desired_ready, 4);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.ready, 1);
        assert_eq!(summary.out_of_sync, 1);
    }

    #[test]
    fn bundle_pass_over_store_rolls_out_within_budget() {
        let store = StateStore::open_in_memory().unwrap();
        for name in ["edge-1", "edge-2", "edge-3"] {
            store.put_cluster(&cluster("fleet-default", name, "prod")).unwrap();
        }
        let strategy = RolloutStrategy {
            max_unavailable: Some(IntOrPercent::Int(1)),
            ..Default::default()
        };
        let config = ControllerConfig::default();
        let scope = StaticScopeResolver::default();
        let resolver = StoreTargets::new(&store, &DefaultOptionsCalculator);
        let pass = |b: &Bundle, status: &BundleStatus| {
            let inventory = InventoryExtractor::new(
                &JsonManifestRenderer,
                &DefaultOptionsCalculator,
                &scope,
                config.inventory.fallback_namespace.clone(),
            );
            BundleHandler::new(&resolver, inventory, &DefaultSummarizer, &config.rollout)
                .on_bundle_change(b, status)
                .unwrap()
        };

        // first pass creates and activates every record
        let v1 = bundle(CONFIG_MAP, Some(strategy.clone()));
        let (objects, status) = pass(&v1, &BundleStatus::default());
        assert_eq!(objects.len(), 3);
        assert_eq!(status.newly_created, 3);

        // agents apply and report ready
        for mut record in objects {
            record.status.applied_deployment_id = record.spec.deployment_id.clone();
            record.status.ready = true;
            record.status.non_modified = true;
            store.put_bundle_deployment(&record).unwrap();
        }

        // new content: every record is restaged, one is promoted
        let secret = r#"{"apiVersion":"v1","kind":"Secret","metadata":{"name":"s"}}"#;
        let mut v2 = bundle(secret, Some(strategy));
        v2.meta.generation = 2;
        let (objects, status) = pass(&v2, &status);

        assert_eq!(objects.len(), 3);
        let promoted = objects
            .iter()
            .filter(|o| o.spec.deployment_id == o.spec.staged_deployment_id)
            .count();
        assert_eq!(promoted, 1);
        assert_eq!(status.unavailable, 1);
        assert_eq!(status.max_unavailable, 1);
        assert_eq!(status.newly_created, 0);
    }
}
