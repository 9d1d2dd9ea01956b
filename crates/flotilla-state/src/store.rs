//! StateStore: redb-backed object persistence for Flotilla.
//!
//! Provides typed CRUD operations over bundles, deployment records,
//! clusters, parent repositories and image scans. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableHandle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use flotilla_core::{Bundle, BundleDeployment, Cluster, GitRepo, ImageScan, ObjectMeta};

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe object store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for table in ALL {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic table access ───────────────────────────────────────

    fn put<T: Serialize>(&self, table: JsonTable, meta: &ObjectMeta, value: &T) -> StateResult<()> {
        let key = table_key(&meta.namespace, &meta.name);
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            t.insert(key.as_str(), bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(table = table.name(), %key, "object stored");
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, table: JsonTable, namespace: &str, name: &str) -> StateResult<Option<T>> {
        let key = table_key(namespace, name);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        match t.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let value = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// List values whose key starts with `prefix` (empty prefix lists everything).
    fn list<T: DeserializeOwned>(&self, table: JsonTable, prefix: &str) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in t.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let item = serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }

    /// Delete by key. Returns true if it existed.
    fn remove(&self, table: JsonTable, namespace: &str, name: &str) -> StateResult<bool> {
        let key = table_key(namespace, name);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            existed = t.remove(key.as_str()).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(table = table.name(), %key, existed, "object deleted");
        Ok(existed)
    }

    // ── Bundles ────────────────────────────────────────────────────

    /// Insert or update a bundle.
    pub fn put_bundle(&self, bundle: &Bundle) -> StateResult<()> {
        self.put(BUNDLES, &bundle.meta, bundle)
    }

    pub fn get_bundle(&self, namespace: &str, name: &str) -> StateResult<Option<Bundle>> {
        self.load(BUNDLES, namespace, name)
    }

    /// List all bundles.
    pub fn list_bundles(&self) -> StateResult<Vec<Bundle>> {
        self.list(BUNDLES, "")
    }

    pub fn delete_bundle(&self, namespace: &str, name: &str) -> StateResult<bool> {
        self.remove(BUNDLES, namespace, name)
    }

    // ── Deployment records ─────────────────────────────────────────

    /// Insert or update a deployment record.
    pub fn put_bundle_deployment(&self, deployment: &BundleDeployment) -> StateResult<()> {
        self.put(BUNDLE_DEPLOYMENTS, &deployment.meta, deployment)
    }

    pub fn get_bundle_deployment(&self, namespace: &str, name: &str) -> StateResult<Option<BundleDeployment>> {
        self.load(BUNDLE_DEPLOYMENTS, namespace, name)
    }

    /// List the deployment records in one (cluster) namespace.
    pub fn list_bundle_deployments(&self, namespace: &str) -> StateResult<Vec<BundleDeployment>> {
        self.list(BUNDLE_DEPLOYMENTS, &format!("{namespace}/"))
    }

    pub fn delete_bundle_deployment(&self, namespace: &str, name: &str) -> StateResult<bool> {
        self.remove(BUNDLE_DEPLOYMENTS, namespace, name)
    }

    // ── Clusters ───────────────────────────────────────────────────

    pub fn put_cluster(&self, cluster: &Cluster) -> StateResult<()> {
        self.put(CLUSTERS, &cluster.meta, cluster)
    }

    /// List clusters in every namespace.
    pub fn list_clusters(&self) -> StateResult<Vec<Cluster>> {
        self.list(CLUSTERS, "")
    }

    // ── Parent repositories ────────────────────────────────────────

    pub fn put_git_repo(&self, repo: &GitRepo) -> StateResult<()> {
        self.put(GIT_REPOS, &repo.meta, repo)
    }

    pub fn get_git_repo(&self, namespace: &str, name: &str) -> StateResult<Option<GitRepo>> {
        self.load(GIT_REPOS, namespace, name)
    }

    // ── Image scans ────────────────────────────────────────────────

    pub fn put_image_scan(&self, scan: &ImageScan) -> StateResult<()> {
        self.put(IMAGE_SCANS, &scan.meta, scan)
    }

    pub fn get_image_scan(&self, namespace: &str, name: &str) -> StateResult<Option<ImageScan>> {
        self.load(IMAGE_SCANS, namespace, name)
    }

    pub fn delete_image_scan(&self, namespace: &str, name: &str) -> StateResult<bool> {
        self.remove(IMAGE_SCANS, namespace, name)
    }
}
