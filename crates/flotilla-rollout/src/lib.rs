//! Flotilla rollout decisions: creation, staging and promotion of
//! per-cluster deployment records.
//!
//! One reconciliation pass takes the targets of a bundle (one per matching
//! cluster, each optionally carrying its existing deployment record) and
//! decides which records must be written back. Every pass recomputes its
//! budgets from the targets, so passes can be retried or repeated freely.
//!
//! # Components
//!
//! - **`target`**: `Target`, `Partition` and the `TargetResolver` capability trait
//! - **`ledger`**: per-pass budget ledger (new records, unavailable targets/partitions)
//! - **`promotion`**: deployment phase and the staged → active transition
//! - **`engine`**: the partition-by-partition decision loop
//! - **`projection`**: minimal write-back objects for changed records

pub mod engine;
pub mod error;
pub mod ledger;
pub mod projection;
pub mod promotion;
pub mod target;

pub use engine::RolloutEngine;
pub use error::{RolloutError, RolloutResult};
pub use ledger::BudgetLedger;
pub use projection::{project, project_all};
pub use promotion::{DeploymentPhase, HoldReason, PromotionOutcome, promote};
pub use target::{Partition, Target, TargetResolver};
