//! Capabilities the handlers need from the outside world.

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use flotilla_core::{GitRepo, ObjectKey};

/// Failure of a lookup or delete. `NotFound` is distinct from every other
/// failure: only a confirmed absence may lead to deletions.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: ObjectKey },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl ClientError {
    pub fn not_found(kind: &'static str, namespace: &str, name: &str) -> Self {
        ClientError::NotFound {
            kind,
            key: ObjectKey::new(namespace, name),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Read access to parent repositories.
pub trait GitRepoCache {
    fn get(&self, namespace: &str, name: &str) -> ClientResult<GitRepo>;
}

pub trait BundleClient {
    fn delete(&self, namespace: &str, name: &str) -> ClientResult<()>;
}

pub trait ImageScanClient {
    fn delete(&self, namespace: &str, name: &str) -> ClientResult<()>;
}

pub trait BundleDeploymentClient {
    fn delete(&self, namespace: &str, name: &str) -> ClientResult<()>;
}

/// Schedules a bundle for another reconciliation pass.
pub trait BundleQueue {
    fn enqueue(&self, key: ObjectKey);
}

impl BundleQueue for UnboundedSender<ObjectKey> {
    fn enqueue(&self, key: ObjectKey) {
        if let Err(e) = self.send(key) {
            warn!(bundle = %e.0, "work queue closed, dropping bundle");
        }
    }
}

/// Delete treating a missing object as already deleted.
pub(crate) fn delete_idempotent(result: ClientResult<()>) -> ClientResult<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
