//! Rollout error types.

use thiserror::Error;

/// Errors raised while preparing a rollout pass.
///
/// Every variant wraps a failure reported by the target resolver. No
/// deployment record is returned when a pass fails.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("failed to partition targets: {0}")]
    Partitions(#[source] anyhow::Error),

    #[error("failed to compute unavailability budget: {0}")]
    Budget(#[source] anyhow::Error),
}

pub type RolloutResult<T> = Result<T, RolloutError>;
