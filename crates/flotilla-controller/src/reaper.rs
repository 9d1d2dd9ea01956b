//! Deletes bundles and image scans whose parent repository is gone.
//!
//! Only a confirmed "not found" from the repository lookup leads to a
//! delete. Any other lookup failure is returned so the framework retries.

use tracing::{debug, info};

use flotilla_core::labels::REPO_LABEL;
use flotilla_core::{Bundle, ImageScan};

use crate::client::{BundleClient, GitRepoCache, ImageScanClient, delete_idempotent};
use crate::error::ControllerResult;

pub struct OrphanReaper<'a> {
    repos: &'a dyn GitRepoCache,
    bundles: &'a dyn BundleClient,
    images: &'a dyn ImageScanClient,
}

impl<'a> OrphanReaper<'a> {
    pub fn new(
        repos: &'a dyn GitRepoCache,
        bundles: &'a dyn BundleClient,
        images: &'a dyn ImageScanClient,
    ) -> Self {
        Self {
            repos,
            bundles,
            images,
        }
    }

    /// Returns whether the bundle was deleted.
    pub fn on_purge_orphaned(&self, bundle: Option<&Bundle>) -> ControllerResult<bool> {
        let Some(bundle) = bundle else {
            return Ok(false);
        };
        let Some(repo) = bundle.meta.label(REPO_LABEL) else {
            return Ok(false);
        };
        debug!(bundle = %bundle.meta.key(), repo, "checking parent repo of bundle");

        if !self.repo_missing(&bundle.meta.namespace, repo)? {
            return Ok(false);
        }
        info!(bundle = %bundle.meta.key(), repo, "deleting orphaned bundle");
        delete_idempotent(self.bundles.delete(&bundle.meta.namespace, &bundle.meta.name))?;
        Ok(true)
    }

    /// Returns whether the image scan was deleted. Scans already being
    /// deleted are left alone.
    pub fn on_purge_orphaned_image_scan(&self, scan: Option<&ImageScan>) -> ControllerResult<bool> {
        let Some(scan) = scan else {
            return Ok(false);
        };
        if scan.meta.deletion_timestamp.is_some() {
            return Ok(false);
        }
        let repo = scan.spec.git_repo_name.as_str();
        debug!(scan = %scan.meta.key(), repo, "checking parent repo of image scan");

        if !self.repo_missing(&scan.meta.namespace, repo)? {
            return Ok(false);
        }
        info!(scan = %scan.meta.key(), repo, "deleting orphaned image scan");
        delete_idempotent(self.images.delete(&scan.meta.namespace, &scan.meta.name))?;
        Ok(true)
    }

    fn repo_missing(&self, namespace: &str, name: &str) -> ControllerResult<bool> {
        match self.repos.get(namespace, name) {
            Ok(_) => Ok(false),
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}
