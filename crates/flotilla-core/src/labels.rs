//! Well-known label keys.

/// Set on bundles created from a repository; names the parent repo.
pub const REPO_LABEL: &str = "flotilla.io/repo-name";

/// Set on deployment records; namespace of the owning bundle.
pub const BUNDLE_NAMESPACE_LABEL: &str = "flotilla.io/bundle-namespace";

/// Set on deployment records; name of the owning bundle.
pub const BUNDLE_NAME_LABEL: &str = "flotilla.io/bundle-name";
