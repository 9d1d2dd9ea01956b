//! Reacting to cluster additions and updates.

use std::time::Instant;

use tracing::{debug, info, warn};

use flotilla_core::Cluster;

use crate::client::{BundleDeploymentClient, BundleQueue};
use crate::error::{ControllerError, ControllerResult};
use crate::membership::MembershipIndex;

pub struct ClusterHandler<'a> {
    membership: &'a dyn MembershipIndex,
    deployments: &'a dyn BundleDeploymentClient,
    queue: &'a dyn BundleQueue,
}

impl<'a> ClusterHandler<'a> {
    pub fn new(
        membership: &'a dyn MembershipIndex,
        deployments: &'a dyn BundleDeploymentClient,
        queue: &'a dyn BundleQueue,
    ) -> Self {
        Self {
            membership,
            deployments,
            queue,
        }
    }

    /// Delete records of bundles that no longer target the cluster, then
    /// enqueue every bundle that does.
    ///
    /// Lookup failures are returned. Failed deletes are only logged; a
    /// later pass picks them up.
    pub fn on_cluster_change(&self, cluster: Option<&Cluster>) -> ControllerResult<()> {
        let Some(cluster) = cluster else {
            return Ok(());
        };
        let key = cluster.meta.key();
        debug!(cluster = %key, "cluster changed, checking bundles to refresh or clean up");
        let start = Instant::now();

        let membership = self
            .membership
            .bundles_for_cluster(cluster)
            .map_err(ControllerError::Membership)?;

        for bundle in &membership.to_cleanup {
            let records = self
                .membership
                .deployments_for_bundle_in_cluster(bundle, cluster)
                .map_err(ControllerError::Membership)?;
            for record in records {
                info!(
                    deployment = %record.meta.key(),
                    bundle = %bundle.meta.key(),
                    cluster = %key,
                    "cleaning up deployment no longer matching cluster"
                );
                if let Err(e) = self
                    .deployments
                    .delete(&record.meta.namespace, &record.meta.name)
                {
                    warn!(deployment = %record.meta.key(), error = %e, "failed to delete deployment");
                }
            }
        }

        for bundle in &membership.to_refresh {
            self.queue.enqueue(bundle.meta.key());
        }

        debug!(
            cluster = %key,
            refreshed = membership.to_refresh.len(),
            elapsed = ?start.elapsed(),
            "cluster change handled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, ClientResult};
    use crate::membership::{ClusterMembership, StoreMembership};
    use flotilla_core::digest::cluster_namespace;
    use flotilla_core::labels::{BUNDLE_NAME_LABEL, BUNDLE_NAMESPACE_LABEL};
    use flotilla_core::{Bundle, BundleDeployment, BundleSpec, BundleTarget, ObjectKey, ObjectMeta};
    use flotilla_state::StateStore;
    use std::cell::RefCell;

    struct BrokenIndex {
        listing_works: bool,
    }

    impl MembershipIndex for BrokenIndex {
        fn bundles_for_cluster(&self, _cluster: &Cluster) -> anyhow::Result<ClusterMembership> {
            if !self.listing_works {
                anyhow::bail!("bundle cache unavailable");
            }
            Ok(ClusterMembership {
                to_refresh: vec![bundle("web", "edge-1")],
                to_cleanup: vec![bundle("legacy", "edge-9")],
            })
        }

        fn deployments_for_bundle_in_cluster(
            &self,
            _bundle: &Bundle,
            _cluster: &Cluster,
        ) -> anyhow::Result<Vec<BundleDeployment>> {
            anyhow::bail!("deployment cache unavailable")
        }
    }

    /// Deployment client whose deletes always fail.
    #[derive(Default)]
    struct FailingDeletes(RefCell<u32>);

    impl BundleDeploymentClient for FailingDeletes {
        fn delete(&self, _namespace: &str, _name: &str) -> ClientResult<()> {
            *self.0.borrow_mut() += 1;
            Err(ClientError::Backend(anyhow::anyhow!("forbidden")))
        }
    }

    #[derive(Default)]
    struct RecordingQueue(RefCell<Vec<ObjectKey>>);

    impl BundleQueue for RecordingQueue {
        fn enqueue(&self, key: ObjectKey) {
            self.0.borrow_mut().push(key);
        }
    }

    fn bundle(name: &str, cluster: &str) -> Bundle {
        Bundle {
            meta: ObjectMeta::new("fleet-default", name),
            spec: BundleSpec {
                targets: vec![BundleTarget {
                    cluster_name: cluster.into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn records_of(cluster: &str) -> String {
        cluster_namespace(&ObjectKey::new("fleet-default", cluster))
    }

    fn record(cluster: &str, bundle: &str) -> BundleDeployment {
        BundleDeployment {
            meta: ObjectMeta::new(records_of(cluster), bundle)
                .with_label(BUNDLE_NAMESPACE_LABEL, "fleet-default")
                .with_label(BUNDLE_NAME_LABEL, bundle),
            ..Default::default()
        }
    }

    fn cluster(name: &str) -> Cluster {
        Cluster {
            meta: ObjectMeta::new("fleet-default", name),
            ..Default::default()
        }
    }

    fn seeded_store() -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        store.put_bundle(&bundle("web", "edge-1")).unwrap();
        store.put_bundle(&bundle("legacy", "edge-9")).unwrap();
        store.put_bundle_deployment(&record("edge-1", "web")).unwrap();
        store.put_bundle_deployment(&record("edge-1", "legacy")).unwrap();
        store
    }

    #[test]
    fn stale_records_deleted_and_targeting_bundles_enqueued() {
        let store = seeded_store();
        let index = StoreMembership::new(&store);
        let queue = RecordingQueue::default();
        let handler = ClusterHandler::new(&index, &store, &queue);

        handler.on_cluster_change(Some(&cluster("edge-1"))).unwrap();

        assert!(store.get_bundle_deployment(&records_of("edge-1"), "legacy").unwrap().is_none());
        assert!(store.get_bundle_deployment(&records_of("edge-1"), "web").unwrap().is_some());
        assert_eq!(*queue.0.borrow(), vec![ObjectKey::new("fleet-default", "web")]);
    }

    #[test]
    fn delete_failures_are_swallowed() {
        let store = seeded_store();
        let index = StoreMembership::new(&store);
        let deletes = FailingDeletes::default();
        let queue = RecordingQueue::default();
        let handler = ClusterHandler::new(&index, &deletes, &queue);

        handler.on_cluster_change(Some(&cluster("edge-1"))).unwrap();

        assert_eq!(*deletes.0.borrow(), 1);
        assert_eq!(queue.0.borrow().len(), 1);
    }

    #[test]
    fn lookup_failures_are_returned() {
        let store = StateStore::open_in_memory().unwrap();
        let queue = RecordingQueue::default();

        let index = BrokenIndex { listing_works: false };
        let err = ClusterHandler::new(&index, &store, &queue)
            .on_cluster_change(Some(&cluster("edge-1")))
            .unwrap_err();
        assert!(matches!(err, ControllerError::Membership(_)));

        let index = BrokenIndex { listing_works: true };
        let err = ClusterHandler::new(&index, &store, &queue)
            .on_cluster_change(Some(&cluster("edge-1")))
            .unwrap_err();
        assert!(matches!(err, ControllerError::Membership(_)));
        assert!(queue.0.borrow().is_empty());
    }

    #[test]
    fn absent_cluster_is_a_no_op() {
        let store = StateStore::open_in_memory().unwrap();
        let queue = RecordingQueue::default();
        let index = BrokenIndex { listing_works: false };
        ClusterHandler::new(&index, &store, &queue)
            .on_cluster_change(None)
            .unwrap();
        assert!(queue.0.borrow().is_empty());
    }

    #[test]
    fn works_with_channel_queue() {
        let store = seeded_store();
        let index = StoreMembership::new(&store);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        ClusterHandler::new(&index, &store, &tx)
            .on_cluster_change(Some(&cluster("edge-1")))
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), ObjectKey::new("fleet-default", "web"));
        assert!(rx.try_recv().is_err());
    }
}
