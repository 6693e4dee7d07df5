//! Strategy without any persistence
//!
//! Used when restart-time recovery is not required; every restart starts
//! with a cold cache and a full rebuild.

use crate::cache::ContentCache;
use crate::persistence::PersistenceStrategy;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence strategy that never touches disk
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStrategy;

#[async_trait]
impl PersistenceStrategy for NoopStrategy {
    async fn load(&self) -> Option<ContentCache> {
        None
    }

    async fn persist_on_partial_update(&self, _cache: Arc<ContentCache>) {}

    async fn persist_on_complete_update(&self, _cache: Arc<ContentCache>) {}

    async fn persist_on_shutdown(&self, _cache: Arc<ContentCache>) {}

    async fn cleanup(&self) {}
}
