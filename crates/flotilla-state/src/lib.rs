//! flotilla-state: embedded object store for Flotilla.
//!
//! Backed by [redb](https://docs.rs/redb), holds bundles, deployment
//! records, clusters, parent repositories and image scans.
//!
//! # Architecture
//!
//! All objects are JSON-serialized into redb's `&[u8]` value columns under
//! `{namespace}/{name}` keys, so listing the deployment records of one
//! cluster namespace is a prefix scan.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across worker threads.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
