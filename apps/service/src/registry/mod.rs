//! Target registry - the authoritative set of monitored targets
//!
//! Many readers (cycle snapshots, on-demand checks) proceed in parallel; a
//! mutation holds the write lock for the in-memory change and the optional
//! persistence write together. Mutations are transactional: the new set is
//! written to the store first and only committed in memory once that succeeds.

pub mod store;

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub use store::{StoreError, TargetStore};

use crate::metrics::Metrics;
use crate::monitoring::types::Target;
use crate::validation::UrlRejection;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: UrlRejection },
    #[error("invalid target id '{id}': {reason}")]
    InvalidId { id: String, reason: String },
    #[error("target '{0}' not found")]
    NotFound(String),
    #[error("failed to persist targets: {0}")]
    Persistence(#[from] StoreError),
}

pub struct TargetRegistry {
    targets: RwLock<BTreeMap<String, Target>>,
    store: Option<TargetStore>,
    metrics: Arc<Metrics>,
}

impl TargetRegistry {
    /// Registry without durable storage
    pub fn in_memory(metrics: Arc<Metrics>) -> Self {
        Self { targets: RwLock::new(BTreeMap::new()), store: None, metrics }
    }

    /// Registry backed by `store`, seeded with whatever it currently holds
    pub async fn open(store: TargetStore, metrics: Arc<Metrics>) -> Result<Self, RegistryError> {
        let loaded = store.load().await?;
        let targets: BTreeMap<String, Target> =
            loaded.into_iter().map(|t| (t.id.clone(), t)).collect();

        info!(path = %store.path().display(), count = targets.len(), "Loaded stored targets");
        metrics.set_registered_targets(targets.len());

        Ok(Self { targets: RwLock::new(targets), store: Some(store), metrics })
    }

    /// Insert `target`, replacing any target with the same id
    pub async fn add(&self, target: Target) -> Result<(), RegistryError> {
        let mut targets = self.targets.write().await;

        let mut next = targets.clone();
        let id = target.id.clone();
        let url = target.url.clone();
        let replaced = next.insert(id.clone(), target).is_some();

        self.persist(&next).await?;
        *targets = next;
        self.metrics.set_registered_targets(targets.len());

        info!(target_id = %id, %url, replaced, "Registered target");
        Ok(())
    }

    /// Remove the target with `id`; removing an unknown id is not an error
    pub async fn remove(&self, id: &str) -> Result<(), RegistryError> {
        let mut targets = self.targets.write().await;

        if !targets.contains_key(id) {
            return Ok(());
        }

        let mut next = targets.clone();
        next.remove(id);

        self.persist(&next).await?;
        *targets = next;
        self.metrics.set_registered_targets(targets.len());
        self.metrics.forget_target(id);

        info!(target_id = %id, "Unregistered target");
        Ok(())
    }

    /// Point-in-time copy of every target, ordered by id
    pub async fn snapshot(&self) -> Vec<Target> {
        self.targets.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Result<Target, RegistryError> {
        self.targets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Run `f` only while `target` is still registered unchanged
    ///
    /// The read lock is held for the duration of `f`, so a concurrent removal
    /// either completes first (and `f` is skipped) or waits for `f` to return.
    pub async fn while_registered<R>(&self, target: &Target, f: impl FnOnce() -> R) -> Option<R> {
        let targets = self.targets.read().await;
        (targets.get(&target.id) == Some(target)).then(f)
    }

    pub async fn len(&self) -> usize {
        self.targets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.targets.read().await.is_empty()
    }

    async fn persist(&self, targets: &BTreeMap<String, Target>) -> Result<(), StoreError> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        store.save(targets.values()).await.inspect_err(|e| {
            warn!(path = %store.path().display(), error = %e, "Registry change rejected");
        })
    }
}
