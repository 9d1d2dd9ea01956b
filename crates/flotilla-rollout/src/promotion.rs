//! Deployment phases and the staged → active promotion.
//!
//! A deployment record holds two specs: the staged one, which always tracks
//! the latest computed desired state, and the active one, which is what the
//! agent applies. `promote` is the only place the active spec changes.

use crate::ledger::{BudgetLedger, partition_has_room};
use crate::target::{Target, TargetResolver};
use flotilla_core::{BundleDeployment, PartitionStatus};

/// Where a target stands in the two-phase deployment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPhase<'a> {
    /// No deployment record exists yet.
    NoRecord,
    /// A staged id differs from the active one. `active` is `None` when
    /// the record has never been activated.
    Staged {
        active: Option<&'a str>,
        pending: &'a str,
        unavailable: bool,
    },
    /// Active spec is current but the cluster has not converged on it yet.
    Promoting { active: &'a str },
    /// Active spec is current and available, or nothing is staged.
    Settled { active: &'a str },
}

impl<'a> DeploymentPhase<'a> {
    pub fn of<R: TargetResolver + ?Sized>(target: &'a Target, resolver: &R) -> Self {
        match target.deployment.as_ref() {
            Some(deployment) => Self::of_record(deployment, resolver),
            None => DeploymentPhase::NoRecord,
        }
    }

    pub fn of_record<R: TargetResolver + ?Sized>(
        deployment: &'a BundleDeployment,
        resolver: &R,
    ) -> Self {
        let spec = &deployment.spec;
        let unavailable = resolver.is_unavailable(deployment);

        if !spec.staged_deployment_id.is_empty() && spec.staged_deployment_id != spec.deployment_id {
            return DeploymentPhase::Staged {
                active: (!spec.deployment_id.is_empty()).then_some(spec.deployment_id.as_str()),
                pending: &spec.staged_deployment_id,
                unavailable,
            };
        }
        if unavailable {
            DeploymentPhase::Promoting {
                active: &spec.deployment_id,
            }
        } else {
            DeploymentPhase::Settled {
                active: &spec.deployment_id,
            }
        }
    }
}

/// Why a staged spec was not promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    NoRecord,
    Paused,
    /// Nothing staged, or the staged id is already active.
    InSync,
    GlobalBudget,
    PartitionBudget,
}

impl HoldReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldReason::NoRecord => "no-record",
            HoldReason::Paused => "paused",
            HoldReason::InSync => "in-sync",
            HoldReason::GlobalBudget => "global-budget",
            HoldReason::PartitionBudget => "partition-budget",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// First activation of a record that has never been active.
    Activated { to: String },
    /// Staged spec replaced the active one.
    Promoted { from: String, to: String },
    Held(HoldReason),
}

impl PromotionOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, PromotionOutcome::Held(_))
    }
}

/// Make the staged spec active if pause state and both budgets allow it.
///
/// A record created in this pass, or one that is already unavailable, may
/// always continue. Otherwise the fleet-wide and partition counters must
/// both have room, and both are incremented: an upgrade in progress counts
/// as unavailable. This holds for records that were created in an earlier
/// pass and have never been active.
pub fn promote<R: TargetResolver + ?Sized>(
    resolver: &R,
    target: &mut Target,
    ledger: &mut BudgetLedger,
    partition: &mut PartitionStatus,
    created: bool,
) -> PromotionOutcome {
    let paused = target.is_paused();
    let Some(deployment) = target.deployment.as_mut() else {
        return PromotionOutcome::Held(HoldReason::NoRecord);
    };
    if paused {
        return PromotionOutcome::Held(HoldReason::Paused);
    }
    let (first, already_unavailable) = match DeploymentPhase::of_record(deployment, resolver) {
        DeploymentPhase::Staged {
            active, unavailable, ..
        } => (active.is_none(), unavailable),
        _ => return PromotionOutcome::Held(HoldReason::InSync),
    };

    if !created && !already_unavailable {
        if !ledger.has_unavailable_room() {
            return PromotionOutcome::Held(HoldReason::GlobalBudget);
        }
        if !partition_has_room(partition) {
            return PromotionOutcome::Held(HoldReason::PartitionBudget);
        }
        ledger.record_unavailable(partition);
    }

    let spec = &mut deployment.spec;
    let to = spec.staged_deployment_id.clone();
    let from = std::mem::replace(&mut spec.deployment_id, to.clone());
    spec.options = spec.staged_options.clone();

    if first {
        PromotionOutcome::Activated { to }
    } else {
        PromotionOutcome::Promoted { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::testing::{FakeResolver, deployed, rolling, target};

    fn budgets(global: u32, partition: u32) -> (BudgetLedger, PartitionStatus) {
        (
            BudgetLedger::new(50, 0, global),
            PartitionStatus {
                max_unavailable: partition,
                ..Default::default()
            },
        )
    }

    #[test]
    fn phase_of_each_state() {
        let r = FakeResolver::default();

        assert_eq!(DeploymentPhase::of(&target("c1", "s-b"), &r), DeploymentPhase::NoRecord);

        let pending = deployed("c1", "s-a", "s-b");
        assert_eq!(
            DeploymentPhase::of(&pending, &r),
            DeploymentPhase::Staged {
                active: Some("s-a"),
                pending: "s-b",
                unavailable: false
            }
        );

        let settled = deployed("c1", "s-a", "s-a");
        assert_eq!(
            DeploymentPhase::of(&settled, &r),
            DeploymentPhase::Settled { active: "s-a" }
        );

        let converging = rolling("c1", "s-a", "s-a");
        assert_eq!(
            DeploymentPhase::of(&converging, &r),
            DeploymentPhase::Promoting { active: "s-a" }
        );
    }

    #[test]
    fn promotes_and_counts_unavailable() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(1, 1);
        let mut t = deployed("c1", "s-a", "s-b");

        let outcome = promote(&r, &mut t, &mut ledger, &mut partition, false);

        assert_eq!(
            outcome,
            PromotionOutcome::Promoted {
                from: "s-a".into(),
                to: "s-b".into()
            }
        );
        let spec = &t.deployment.as_ref().unwrap().spec;
        assert_eq!(spec.deployment_id, "s-b");
        assert_eq!(spec.options, spec.staged_options);
        assert_eq!(ledger.unavailable, 1);
        assert_eq!(partition.unavailable, 1);
    }

    #[test]
    fn promotion_copies_staged_options() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(1, 1);
        let mut t = deployed("c1", "s-a", "s-b");
        t.deployment.as_mut().unwrap().spec.staged_options.target_namespace = "apps".into();

        assert!(promote(&r, &mut t, &mut ledger, &mut partition, false).changed());
        assert_eq!(t.deployment.unwrap().spec.options.target_namespace, "apps");
    }

    #[test]
    fn paused_record_is_held() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(1, 1);
        let mut t = deployed("c1", "s-a", "s-b");
        t.deployment.as_mut().unwrap().spec.paused = true;

        let outcome = promote(&r, &mut t, &mut ledger, &mut partition, false);
        assert_eq!(outcome, PromotionOutcome::Held(HoldReason::Paused));
        assert_eq!(t.deployment.unwrap().spec.deployment_id, "s-a");
        assert_eq!(ledger.unavailable, 0);
    }

    #[test]
    fn paused_target_is_held() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(1, 1);
        let mut t = deployed("c1", "s-a", "s-b");
        t.paused = true;

        let outcome = promote(&r, &mut t, &mut ledger, &mut partition, false);
        assert_eq!(outcome, PromotionOutcome::Held(HoldReason::Paused));
    }

    #[test]
    fn nothing_staged_or_already_active_is_in_sync() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(1, 1);

        let mut empty = deployed("c1", "s-a", "");
        let mut same = deployed("c2", "s-a", "s-a");

        assert_eq!(
            promote(&r, &mut empty, &mut ledger, &mut partition, false),
            PromotionOutcome::Held(HoldReason::InSync)
        );
        assert_eq!(
            promote(&r, &mut same, &mut ledger, &mut partition, false),
            PromotionOutcome::Held(HoldReason::InSync)
        );
    }

    #[test]
    fn global_budget_blocks_available_record() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(1, 5);
        ledger.unavailable = 1;
        let mut t = deployed("c1", "s-a", "s-b");

        let outcome = promote(&r, &mut t, &mut ledger, &mut partition, false);
        assert_eq!(outcome, PromotionOutcome::Held(HoldReason::GlobalBudget));
        assert_eq!(ledger.unavailable, 1);
    }

    #[test]
    fn partition_budget_blocks_available_record() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(5, 0);
        let mut t = deployed("c1", "s-a", "s-b");

        let outcome = promote(&r, &mut t, &mut ledger, &mut partition, false);
        assert_eq!(outcome, PromotionOutcome::Held(HoldReason::PartitionBudget));
        assert_eq!(ledger.unavailable, 0);
        assert_eq!(partition.unavailable, 0);
    }

    #[test]
    fn already_unavailable_record_continues_past_exhausted_budgets() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(0, 0);
        let mut t = rolling("c1", "s-a", "s-b");

        let outcome = promote(&r, &mut t, &mut ledger, &mut partition, false);

        assert!(matches!(outcome, PromotionOutcome::Promoted { .. }));
        assert_eq!(ledger.unavailable, 0);
        assert_eq!(partition.unavailable, 0);
    }

    #[test]
    fn record_created_this_pass_consumes_no_budget() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(0, 0);
        let mut t = deployed("c1", "", "s-b");

        let outcome = promote(&r, &mut t, &mut ledger, &mut partition, true);

        assert_eq!(outcome, PromotionOutcome::Activated { to: "s-b".into() });
        assert_eq!(t.deployment.unwrap().spec.deployment_id, "s-b");
        assert_eq!(ledger.unavailable, 0);
    }

    #[test]
    fn never_active_record_from_earlier_pass_is_budgeted() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(1, 1);
        let mut first = deployed("c1", "", "s-b");
        let mut second = deployed("c2", "", "s-b");

        assert_eq!(
            promote(&r, &mut first, &mut ledger, &mut partition, false),
            PromotionOutcome::Activated { to: "s-b".into() }
        );
        assert_eq!(ledger.unavailable, 1);
        assert_eq!(partition.unavailable, 1);

        assert_eq!(
            promote(&r, &mut second, &mut ledger, &mut partition, false),
            PromotionOutcome::Held(HoldReason::GlobalBudget)
        );
        assert_eq!(second.deployment.unwrap().spec.deployment_id, "");
    }

    #[test]
    fn promotion_is_one_way_within_a_pass() {
        let r = FakeResolver::default();
        let (mut ledger, mut partition) = budgets(2, 2);
        let mut t = deployed("c1", "s-a", "s-b");

        assert!(promote(&r, &mut t, &mut ledger, &mut partition, false).changed());
        assert_eq!(
            promote(&r, &mut t, &mut ledger, &mut partition, false),
            PromotionOutcome::Held(HoldReason::InSync)
        );
        assert_eq!(ledger.unavailable, 1);
    }
}
