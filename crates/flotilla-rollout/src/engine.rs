//! Rollout engine: decides which deployment records to create, restage
//! and promote in one reconciliation pass.
//!
//! Partitions are processed in order. Within a partition, creation comes
//! first, then staging, then promotion, and only then is the partition
//! checked for unavailability. Once more partitions are unavailable than
//! the budget allows, the remaining partitions are left for a later pass.

use tracing::{debug, trace};

use flotilla_core::{BundleDeployment, BundleDeploymentOptions, BundleStatus};

use crate::error::{RolloutError, RolloutResult};
use crate::ledger::BudgetLedger;
use crate::promotion::{PromotionOutcome, promote};
use crate::target::{Partition, Target, TargetResolver};

/// Runs rollout passes against a target resolver.
pub struct RolloutEngine<'a, R: ?Sized> {
    resolver: &'a R,
    max_new: u32,
}

impl<'a, R: TargetResolver + ?Sized> RolloutEngine<'a, R> {
    pub fn new(resolver: &'a R, max_new: u32) -> Self {
        Self { resolver, max_new }
    }

    /// Recompute `status` from `targets` and return every changed record.
    ///
    /// Summary, counters, budgets and partition statuses in `status` are
    /// replaced; its inventory, conditions and observed generation are left
    /// alone. On error `status` is untouched and nothing is returned.
    pub fn calculate_changes(
        &self,
        status: &mut BundleStatus,
        targets: Vec<Target>,
    ) -> RolloutResult<Vec<BundleDeployment>> {
        let summary = self.resolver.summary(&targets);
        let max_unavailable = self
            .resolver
            .max_unavailable(&targets)
            .map_err(RolloutError::Budget)?;
        let mut ledger = BudgetLedger::new(
            self.max_new,
            self.resolver.unavailable(&targets),
            max_unavailable,
        );

        let mut partitions = self
            .resolver
            .partitions(targets)
            .map_err(RolloutError::Partitions)?;
        ledger.max_unavailable_partitions = self
            .resolver
            .max_unavailable_partitions(&partitions)
            .map_err(RolloutError::Budget)?;

        let total = partitions.len();
        let mut changed = Vec::new();
        for (index, partition) in partitions.iter_mut().enumerate() {
            changed.extend(self.reconcile_partition(partition, &mut ledger));

            if self
                .resolver
                .is_partition_unavailable(&partition.status, &partition.targets)
            {
                ledger.record_unavailable_partition();
            }

            if ledger.partitions_exhausted() {
                debug!(
                    partition = %partition.status.name,
                    unavailable_partitions = ledger.unavailable_partitions,
                    max_unavailable_partitions = ledger.max_unavailable_partitions,
                    skipped = total - index - 1,
                    "partition budget exhausted, halting rollout for this pass"
                );
                break;
            }
        }

        status.summary = summary;
        ledger.apply_to(status);
        status.partition_status = partitions.into_iter().map(|p| p.status).collect();

        Ok(changed)
    }

    /// Create, stage and promote within one partition; returns the records
    /// that changed, in target order.
    fn reconcile_partition(
        &self,
        partition: &mut Partition,
        ledger: &mut BudgetLedger,
    ) -> Vec<BundleDeployment> {
        let mut dirty = vec![false; partition.targets.len()];
        let mut created = vec![false; partition.targets.len()];

        for (i, target) in partition.targets.iter_mut().enumerate() {
            if target.deployment.is_none() && ledger.try_admit_new() {
                self.resolver.assign_new_deployment(target);
                created[i] = true;
                debug!(cluster = %target.cluster, bundle = %target.bundle, "creating deployment");
            }
            if let Some(deployment) = target.deployment.as_mut() {
                dirty[i] |= stage(deployment, &target.options, &target.deployment_id);
            }
        }

        for (i, target) in partition.targets.iter_mut().enumerate() {
            match promote(self.resolver, target, ledger, &mut partition.status, created[i]) {
                PromotionOutcome::Held(reason) => {
                    trace!(cluster = %target.cluster, reason = reason.as_str(), "promotion held");
                }
                PromotionOutcome::Activated { to } => {
                    debug!(cluster = %target.cluster, deployment_id = %to, "deployment activated");
                    dirty[i] = true;
                }
                PromotionOutcome::Promoted { from, to } => {
                    debug!(cluster = %target.cluster, %from, %to, "deployment promoted");
                    dirty[i] = true;
                }
            }
        }

        partition
            .targets
            .iter()
            .zip(dirty)
            .filter(|(_, dirty)| *dirty)
            .filter_map(|(target, _)| target.deployment.clone())
            .collect()
    }
}

/// Overwrite the staged half of a record with freshly computed values.
/// Returns true if anything differed.
fn stage(
    deployment: &mut BundleDeployment,
    options: &BundleDeploymentOptions,
    deployment_id: &str,
) -> bool {
    let spec = &mut deployment.spec;
    if spec.staged_options == *options && spec.staged_deployment_id == deployment_id {
        return false;
    }
    spec.staged_options = options.clone();
    spec.staged_deployment_id = deployment_id.to_string();
    true
}
