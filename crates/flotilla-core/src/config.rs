//! flotilla.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Cap on deployment records created in a single reconciliation pass.
pub const DEFAULT_MAX_NEW: u32 = 50;

/// Namespace used for namespaced objects when nothing else names one.
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub rollout: RolloutConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutConfig {
    #[serde(default = "default_max_new")]
    pub max_new: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_namespace")]
    pub fallback_namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            max_new: DEFAULT_MAX_NEW,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            fallback_namespace: default_namespace(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_max_new() -> u32 {
    DEFAULT_MAX_NEW
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/flotilla/flotilla.redb")
}

impl ControllerConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
