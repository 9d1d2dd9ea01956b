//! Controller error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("failed to resolve targets: {0}")]
    Targets(#[source] anyhow::Error),

    #[error("failed to resolve cluster membership: {0}")]
    Membership(#[source] anyhow::Error),

    #[error(transparent)]
    Rollout(#[from] flotilla_rollout::RolloutError),

    #[error(transparent)]
    Inventory(#[from] flotilla_inventory::InventoryError),

    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    #[error("state store error: {0}")]
    State(#[from] flotilla_state::StateError),
}

pub type ControllerResult<T> = Result<T, ControllerError>;
