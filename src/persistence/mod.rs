//! Snapshot persistence strategies
//!
//! A strategy decides when and how the published cache reaches disk. All
//! variants share one contract: persistence is a best-effort durability
//! optimization, so storage failures are logged and swallowed, never
//! surfaced on request paths. Only `persist_on_shutdown` guarantees the
//! given state is durable before it returns.

pub mod debounced;
pub mod noop;
pub mod store;
pub mod sync;

pub use debounced::DebouncedStrategy;
pub use noop::NoopStrategy;
pub use store::{SnapshotStore, SNAPSHOT_VERSION};
pub use sync::SyncStrategy;

use crate::cache::ContentCache;
use crate::config::{CacheConfig, PersistenceKind};
use crate::error::ObsCacheResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Decides when and how cache snapshots are written to and read from disk
#[async_trait]
pub trait PersistenceStrategy: Send + Sync {
    /// Startup recovery: read the last snapshot, if any
    ///
    /// Defensive by contract: any I/O or decode failure is logged and
    /// reported as "no snapshot", leaving a full rebuild to the caller.
    async fn load(&self) -> Option<ContentCache>;

    /// Called after a partial update was published
    async fn persist_on_partial_update(&self, cache: Arc<ContentCache>);

    /// Called after a complete rebuild was published
    async fn persist_on_complete_update(&self, cache: Arc<ContentCache>);

    /// Final flush; must not return before `cache` is durably written
    async fn persist_on_shutdown(&self, cache: Arc<ContentCache>);

    /// Discard any snapshot file
    async fn cleanup(&self);
}

/// Construct the strategy selected by the configuration
///
/// Fails only on misconfiguration (missing snapshot location, write delay
/// too short); those are fatal at startup by design.
pub fn for_config(config: &CacheConfig) -> ObsCacheResult<Box<dyn PersistenceStrategy>> {
    config.validate()?;
    match config.persistence {
        PersistenceKind::None => Ok(Box::new(NoopStrategy)),
        PersistenceKind::Sync => {
            let store = SnapshotStore::new(config.resolved_snapshot_path()?);
            Ok(Box::new(SyncStrategy::new(store)))
        }
        PersistenceKind::Debounced => {
            let store = SnapshotStore::new(config.resolved_snapshot_path()?);
            let delay = Duration::from_secs(config.write_delay_secs);
            Ok(Box::new(DebouncedStrategy::new(store, delay)?))
        }
    }
}

/// Defensive snapshot read shared by the disk-backed strategies
pub(crate) async fn load_or_none(store: &SnapshotStore) -> Option<ContentCache> {
    if !store.exists() {
        return None;
    }
    match store.read().await {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(
                "Ignoring unreadable snapshot at {}: {e}",
                store.path().display()
            );
            None
        }
    }
}
