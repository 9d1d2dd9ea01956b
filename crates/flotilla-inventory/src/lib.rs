//! Flotilla resource inventory: which objects does a bundle own?
//!
//! A bundle's manifest is rendered once per declared target with that
//! target's merged options. Every rendered object contributes one
//! `ResourceKey`; the deduplicated, sorted set is published on the bundle
//! status.
//!
//! # Components
//!
//! - **`manifest`**: `Manifest` and the `ManifestRenderer` capability
//! - **`options`**: bundle/target option merging
//! - **`scope`**: namespaced vs cluster-scoped kinds
//! - **`extractor`**: the generation-guarded inventory refresh

pub mod error;
pub mod extractor;
pub mod manifest;
pub mod options;
pub mod scope;

pub use error::{InventoryError, InventoryResult};
pub use extractor::InventoryExtractor;
pub use manifest::{JsonManifestRenderer, Manifest, ManifestRenderer};
pub use options::{DefaultOptionsCalculator, OptionsCalculator};
pub use scope::{ScopeResolver, StaticScopeResolver};
