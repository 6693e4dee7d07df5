//! Debounced persistence strategy
//!
//! Persist calls never block the updater: they drop the new cache state
//! into a single-slot pending cell (last write wins) and return. A
//! background worker wakes every write delay, takes-and-clears the cell and
//! writes whatever it found, coalescing bursts of updates into at most one
//! disk write per window. Shutdown stops the worker, waits a bounded time
//! for an in-flight write, then writes the final state itself.

use crate::cache::ContentCache;
use crate::error::{ObsCacheError, ObsCacheResult};
use crate::persistence::store::SnapshotStore;
use crate::persistence::{load_or_none, PersistenceStrategy};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Strategy that coalesces updates and writes them in the background
#[derive(Debug)]
pub struct DebouncedStrategy {
    store: Arc<SnapshotStore>,
    /// Latest unwritten cache state; overwritten, never queued
    pending: Arc<ArcSwapOption<ContentCache>>,
    delay: Duration,
    shutting_down: Arc<AtomicBool>,
    stop: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedStrategy {
    /// Create the strategy and start its background worker
    ///
    /// Rejects a write delay of one second or less as misconfiguration
    /// before any worker is spawned. Must be called from within a tokio
    /// runtime.
    pub fn new(store: SnapshotStore, delay: Duration) -> ObsCacheResult<Self> {
        if delay <= Duration::from_secs(1) {
            return Err(ObsCacheError::WriteDelayTooShort {
                secs: delay.as_secs(),
            });
        }

        let store = Arc::new(store);
        let pending: Arc<ArcSwapOption<ContentCache>> = Arc::new(ArcSwapOption::empty());
        let stop = Arc::new(Notify::new());

        let worker = Self::spawn_worker(store.clone(), pending.clone(), stop.clone(), delay);

        Ok(Self {
            store,
            pending,
            delay,
            shutting_down: Arc::new(AtomicBool::new(false)),
            stop,
            worker: Mutex::new(Some(worker)),
        })
    }

    fn spawn_worker(
        store: Arc<SnapshotStore>,
        pending: Arc<ArcSwapOption<ContentCache>>,
        stop: Arc<Notify>,
        delay: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        // Take-and-clear; submissions during the write land
                        // in the now-empty cell for the next window
                        if let Some(cache) = pending.swap(None) {
                            match store.write(&cache).await {
                                Ok(()) => debug!("Debounced snapshot write completed"),
                                Err(e) => warn!("Skipping debounced snapshot write: {e}"),
                            }
                        }
                    }
                    _ = stop.notified() => break,
                }
            }
            debug!("Snapshot worker stopped");
        })
    }

    /// Store the latest state for the worker to pick up
    fn submit(&self, cache: Arc<ContentCache>) {
        if self.shutting_down.load(Ordering::SeqCst) {
            warn!("Dropping snapshot submission after shutdown");
            return;
        }
        self.pending.store(Some(cache));
    }
}

#[async_trait]
impl PersistenceStrategy for DebouncedStrategy {
    async fn load(&self) -> Option<ContentCache> {
        load_or_none(&self.store).await
    }

    async fn persist_on_partial_update(&self, cache: Arc<ContentCache>) {
        self.submit(cache);
    }

    async fn persist_on_complete_update(&self, cache: Arc<ContentCache>) {
        self.submit(cache);
    }

    async fn persist_on_shutdown(&self, cache: Arc<ContentCache>) {
        self.shutting_down.store(true, Ordering::SeqCst);
        // notify_one leaves a permit, so the worker also stops if it is
        // mid-write and not currently awaiting the signal
        self.stop.notify_one();

        let handle = match self.worker.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            if timeout(self.delay, handle).await.is_err() {
                warn!("Snapshot worker did not stop within the write delay, aborting it");
                abort.abort();
            }
        }

        // The final state supersedes anything still pending
        self.pending.store(None);
        match self.store.write(&cache).await {
            Ok(()) => info!("Final snapshot written on shutdown"),
            Err(e) => warn!("Failed to write final snapshot on shutdown: {e}"),
        }
    }

    async fn cleanup(&self) {
        self.pending.store(None);
        if let Err(e) = self.store.remove().await {
            warn!("Failed to remove snapshot file: {e}");
        }
    }
}

impl Drop for DebouncedStrategy {
    fn drop(&mut self) {
        // A strategy dropped without shutdown must not leak its worker
        if let Ok(mut slot) = self.worker.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
