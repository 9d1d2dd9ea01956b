//! Inventory error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("failed to render target {target}: {source}")]
    Render {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("rendered object is missing {field}")]
    MalformedObject { field: &'static str },

    #[error(transparent)]
    Core(#[from] flotilla_core::CoreError),
}

pub type InventoryResult<T> = Result<T, InventoryError>;
