//! Synchronous persistence strategy
//!
//! Every persist call blocks the updater until the snapshot is on disk.
//! Simple and always durable, at the cost of coupling update latency to
//! disk I/O latency.

use crate::cache::ContentCache;
use crate::persistence::store::SnapshotStore;
use crate::persistence::{load_or_none, PersistenceStrategy};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Strategy that writes the snapshot inline on every update
#[derive(Debug, Clone)]
pub struct SyncStrategy {
    store: SnapshotStore,
}

impl SyncStrategy {
    /// Create a synchronous strategy over the given store
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    async fn write(&self, cache: &ContentCache) {
        if let Err(e) = self.store.write(cache).await {
            // Previous snapshot file stays intact; serving continues
            warn!("Skipping snapshot write: {e}");
        }
    }
}

#[async_trait]
impl PersistenceStrategy for SyncStrategy {
    async fn load(&self) -> Option<ContentCache> {
        load_or_none(&self.store).await
    }

    async fn persist_on_partial_update(&self, cache: Arc<ContentCache>) {
        self.write(&cache).await;
    }

    async fn persist_on_complete_update(&self, cache: Arc<ContentCache>) {
        self.write(&cache).await;
    }

    async fn persist_on_shutdown(&self, cache: Arc<ContentCache>) {
        self.write(&cache).await;
    }

    async fn cleanup(&self) {
        if let Err(e) = self.store.remove().await {
            warn!("Failed to remove snapshot file: {e}");
        }
    }
}
