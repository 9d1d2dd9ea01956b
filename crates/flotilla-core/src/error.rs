//! Error types for flotilla-core.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("failed to encode digest input: {0}")]
    Digest(#[from] serde_json::Error),

    #[error("invalid int-or-percent value: {0}")]
    InvalidIntOrPercent(String),
}
