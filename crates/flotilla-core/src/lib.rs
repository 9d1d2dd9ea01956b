//! flotilla-core: shared domain types for the Flotilla fleet controller.
//!
//! Every other crate in the workspace speaks in terms of these types:
//! bundles (desired state), deployment records (per-cluster child state),
//! clusters, parent repositories, and the resource keys that make up a
//! bundle's inventory. Nothing here talks to a cluster or a database.

pub mod config;
pub mod digest;
pub mod error;
pub mod labels;
pub mod types;

pub use config::ControllerConfig;
pub use error::{CoreError, CoreResult};
pub use types::*;
