//! Client capabilities backed by the embedded object store.

use flotilla_core::GitRepo;
use flotilla_core::config::StoreConfig;
use flotilla_state::StateStore;
use tracing::{debug, info};

use crate::client::{
    BundleClient, BundleDeploymentClient, ClientError, ClientResult, GitRepoCache, ImageScanClient,
};
use crate::error::ControllerResult;

/// Open the store named in the configuration.
pub fn open_store(config: &StoreConfig) -> ControllerResult<StateStore> {
    let store = StateStore::open(&config.path)?;
    info!(path = %config.path.display(), "object store ready");
    Ok(store)
}

impl GitRepoCache for StateStore {
    fn get(&self, namespace: &str, name: &str) -> ClientResult<GitRepo> {
        self.get_git_repo(namespace, name)
            .map_err(anyhow::Error::from)?
            .ok_or_else(|| ClientError::not_found("gitrepo", namespace, name))
    }
}

impl BundleClient for StateStore {
    fn delete(&self, namespace: &str, name: &str) -> ClientResult<()> {
        let existed = self
            .delete_bundle(namespace, name)
            .map_err(anyhow::Error::from)?;
        debug!(namespace, name, existed, "bundle delete");
        Ok(())
    }
}

impl ImageScanClient for StateStore {
    fn delete(&self, namespace: &str, name: &str) -> ClientResult<()> {
        let existed = self
            .delete_image_scan(namespace, name)
            .map_err(anyhow::Error::from)?;
        debug!(namespace, name, existed, "image scan delete");
        Ok(())
    }
}

impl BundleDeploymentClient for StateStore {
    fn delete(&self, namespace: &str, name: &str) -> ClientResult<()> {
        let existed = self
            .delete_bundle_deployment(namespace, name)
            .map_err(anyhow::Error::from)?;
        debug!(namespace, name, existed, "bundle deployment delete");
        Ok(())
    }
}
