//! Flotilla bundle controller.
//!
//! Event handlers invoked by an external reconciliation framework. Each
//! handler is a single synchronous pass over already-materialized inputs;
//! the framework serializes passes per object and retries on error.
//!
//! # Components
//!
//! - **`bundle`**: one full bundle pass: targets, rollout, inventory, status
//! - **`reaper`**: deletes bundles and image scans whose parent repo is gone
//! - **`cluster`**: re-enqueues and cleans up after cluster membership changes
//! - **`resolve`**: maps a changed deployment record to its owning bundle
//! - **`client`**: capability traits for lookups, deletes and the work queue
//! - **`membership`**: which bundles a cluster belongs to
//! - **`summary`**: ready condition and display state
//! - **`store`**: store-backed client implementations
//! - **`targets`**: store-backed target resolution and rollout budgets

pub mod bundle;
pub mod client;
pub mod cluster;
pub mod error;
pub mod membership;
pub mod reaper;
pub mod resolve;
pub mod store;
pub mod summary;
pub mod targets;

pub use bundle::BundleHandler;
pub use client::{
    BundleClient, BundleDeploymentClient, BundleQueue, ClientError, ClientResult, GitRepoCache,
    ImageScanClient,
};
pub use cluster::ClusterHandler;
pub use error::{ControllerError, ControllerResult};
pub use membership::{ClusterMembership, MembershipIndex, StoreMembership};
pub use reaper::OrphanReaper;
pub use resolve::resolve_bundle;
pub use store::open_store;
pub use summary::{DefaultSummarizer, Summarizer};
pub use targets::StoreTargets;
