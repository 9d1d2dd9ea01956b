//! Budget ledger: the mutable counters of one rollout pass.
//!
//! A ledger is built fresh from the current targets at the start of every
//! pass and folded into the bundle status at the end. Nothing carries over
//! between passes except what was persisted.

use flotilla_core::{BundleStatus, PartitionStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetLedger {
    /// Cap on records created this pass.
    pub max_new: u32,
    pub newly_created: u32,
    /// Targets currently unavailable, fleet-wide.
    pub unavailable: u32,
    pub max_unavailable: u32,
    pub unavailable_partitions: u32,
    pub max_unavailable_partitions: u32,
}

impl BudgetLedger {
    pub fn new(max_new: u32, unavailable: u32, max_unavailable: u32) -> Self {
        Self {
            max_new,
            unavailable,
            max_unavailable,
            ..Default::default()
        }
    }

    /// Reserve one creation slot. Returns false once `max_new` is reached.
    pub fn try_admit_new(&mut self) -> bool {
        if self.newly_created >= self.max_new {
            return false;
        }
        self.newly_created += 1;
        true
    }

    pub fn has_unavailable_room(&self) -> bool {
        self.unavailable < self.max_unavailable
    }

    /// Count a target going unavailable, fleet-wide and in its partition.
    pub fn record_unavailable(&mut self, partition: &mut PartitionStatus) {
        self.unavailable += 1;
        partition.unavailable += 1;
    }

    pub fn record_unavailable_partition(&mut self) {
        self.unavailable_partitions += 1;
    }

    /// True once more partitions are unavailable than the budget allows.
    pub fn partitions_exhausted(&self) -> bool {
        self.unavailable_partitions > self.max_unavailable_partitions
    }

    /// Copy the counters and budgets into the bundle status.
    pub fn apply_to(&self, status: &mut BundleStatus) {
        status.max_new = self.max_new;
        status.newly_created = self.newly_created;
        status.unavailable = self.unavailable;
        status.max_unavailable = self.max_unavailable;
        status.unavailable_partitions = self.unavailable_partitions;
        status.max_unavailable_partitions = self.max_unavailable_partitions;
    }
}

/// True when the partition can absorb one more unavailable target.
pub fn partition_has_room(partition: &PartitionStatus) -> bool {
    partition.unavailable < partition.max_unavailable
}
