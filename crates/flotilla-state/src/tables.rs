//! redb table definitions for the Flotilla state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized objects).
//! Keys follow the pattern `{namespace}/{name}`.

use redb::TableDefinition;

pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Bundles keyed by `{namespace}/{name}`.
pub const BUNDLES: JsonTable = TableDefinition::new("bundles");

/// Deployment records keyed by `{cluster namespace}/{name}`.
pub const BUNDLE_DEPLOYMENTS: JsonTable = TableDefinition::new("bundle_deployments");

/// Clusters keyed by `{namespace}/{name}`.
pub const CLUSTERS: JsonTable = TableDefinition::new("clusters");

/// Parent repositories keyed by `{namespace}/{name}`.
pub const GIT_REPOS: JsonTable = TableDefinition::new("git_repos");

/// Image scans keyed by `{namespace}/{name}`.
pub const IMAGE_SCANS: JsonTable = TableDefinition::new("image_scans");

pub(crate) const ALL: [JsonTable; 5] = [BUNDLES, BUNDLE_DEPLOYMENTS, CLUSTERS, GIT_REPOS, IMAGE_SCANS];

/// Build the composite key for an object.
pub fn table_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}
