//! Cache update orchestration
//!
//! The controller owns the published cache slot and serializes every
//! cache-mutating operation behind one async mutex: full rebuilds and
//! partial refreshes run one at a time, end to end. Readers are never part
//! of that discipline — they grab an `Arc` to the currently published
//! instance and keep using it, unaffected by concurrent updates.
//!
//! A partial update requested while a full rebuild runs simply waits for
//! the lock and then replays against the freshly published cache, so no
//! update is ever applied to an instance that is being replaced.

use crate::cache::{ContentCache, OfferingEntry};
use crate::error::{FeedFailure, ObsCacheResult};
use crate::event::{CacheChangedEvent, CacheNotifier, ChangeScope};
use crate::feed::CacheFeeder;
use crate::persistence::PersistenceStrategy;
use arc_swap::ArcSwap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of a full or partial update
///
/// Feeder failures do not roll back the update: offerings that succeeded
/// are committed, and the failures travel back to whoever triggered the
/// update so it can decide whether to retry.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// Offerings in the cache after the update
    pub offerings: usize,
    /// Offerings the feeder could not refresh
    pub failures: Vec<FeedFailure>,
}

impl UpdateReport {
    /// Whether the feeder reported no failures
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrates cache rebuilds, publication and persistence
pub struct CacheController {
    published: ArcSwap<ContentCache>,
    update_lock: Mutex<()>,
    feeder: Arc<dyn CacheFeeder>,
    notifier: Arc<dyn CacheNotifier>,
    strategy: Box<dyn PersistenceStrategy>,
}

impl CacheController {
    /// Create a controller with an empty published cache
    pub fn new(
        feeder: Arc<dyn CacheFeeder>,
        notifier: Arc<dyn CacheNotifier>,
        strategy: Box<dyn PersistenceStrategy>,
    ) -> Self {
        Self {
            published: ArcSwap::from_pointee(ContentCache::new()),
            update_lock: Mutex::new(()),
            feeder,
            notifier,
            strategy,
        }
    }

    /// The currently published cache, lock-free
    pub fn current(&self) -> Arc<ContentCache> {
        self.published.load_full()
    }

    /// Startup recovery from the persisted snapshot
    ///
    /// Returns true if a snapshot was loaded and published. On false the
    /// caller should trigger a full update to populate the cache.
    pub async fn recover(&self) -> bool {
        let _guard = self.update_lock.lock().await;
        match self.strategy.load().await {
            Some(cache) => {
                let offerings = cache.len();
                self.published.store(Arc::new(cache));
                info!("Recovered cache with {offerings} offering(s) from snapshot");
                true
            }
            None => {
                debug!("No usable snapshot, cache stays empty until the first update");
                false
            }
        }
    }

    /// Rebuild the whole cache from the backing store and publish it
    ///
    /// A rebuild that yields nothing but failures is treated as a backing
    /// store outage: the previously published cache and its snapshot stay
    /// untouched, and only the failure report is returned.
    pub async fn full_update(&self) -> ObsCacheResult<UpdateReport> {
        let _guard = self.update_lock.lock().await;

        let mut working = ContentCache::new();
        let failures = self.feeder.feed_all(&mut working).await;

        if working.is_empty() && !failures.is_empty() {
            warn!(
                "Full update produced no offerings ({} failure(s)), keeping current cache",
                failures.len()
            );
            return Ok(UpdateReport {
                offerings: self.published.load().len(),
                failures,
            });
        }

        let report = UpdateReport {
            offerings: working.len(),
            failures,
        };
        self.commit(working, ChangeScope::Full, &report, true).await;
        Ok(report)
    }

    /// Refresh only the named offerings, carrying everything else over
    pub async fn partial_update(&self, ids: &BTreeSet<String>) -> ObsCacheResult<UpdateReport> {
        let _guard = self.update_lock.lock().await;

        // Structural copy of the published instance; the original is never
        // touched, so readers holding it see no mutation
        let previous = self.published.load_full();
        let mut working = ContentCache::clone(&previous);
        for id in ids {
            working.remove_offering(id);
        }
        let failures = self.feeder.feed_offerings(&mut working, ids).await;

        // A failed fetch is not a deletion: put the pre-update entry back.
        // Only offerings the feeder resolved without failure and did not
        // re-add stay deleted.
        for failure in &failures {
            if !working.has_offering(&failure.offering) {
                if let Some(entry) = previous.offering(&failure.offering) {
                    working.set_offering(failure.offering.clone(), entry.clone());
                }
            }
        }

        let report = UpdateReport {
            offerings: working.len(),
            failures,
        };
        self.commit(working, ChangeScope::Offerings(ids.clone()), &report, false)
            .await;
        Ok(report)
    }

    /// Publish a working cache, hand it to persistence, notify listeners
    async fn commit(
        &self,
        working: ContentCache,
        scope: ChangeScope,
        report: &UpdateReport,
        complete: bool,
    ) {
        let published = Arc::new(working);
        self.published.store(published.clone());

        if report.is_clean() {
            info!(
                "Published {} cache update with {} offering(s)",
                if complete { "full" } else { "partial" },
                report.offerings
            );
        } else {
            warn!(
                "Published degraded {} cache update: {} offering(s), {} failure(s)",
                if complete { "full" } else { "partial" },
                report.offerings,
                report.failures.len()
            );
        }

        if complete {
            self.strategy.persist_on_complete_update(published).await;
        } else {
            self.strategy.persist_on_partial_update(published).await;
        }
        self.notifier.publish(CacheChangedEvent::new(scope));
    }

    /// Final flush: blocks until the latest published state is durable
    pub async fn shutdown(&self) {
        let _guard = self.update_lock.lock().await;
        let cache = self.published.load_full();
        info!("Shutting down, flushing cache with {} offering(s)", cache.len());
        self.strategy.persist_on_shutdown(cache).await;
    }

    /// Discard the persisted snapshot
    pub async fn discard_snapshot(&self) {
        self.strategy.cleanup().await;
    }
}

/// Feeder over a fixed in-memory catalog, for tests and examples
#[derive(Debug, Default)]
pub struct StaticFeeder {
    entries: std::collections::BTreeMap<String, OfferingEntry>,
    failing: BTreeSet<String>,
}

impl StaticFeeder {
    /// Create a feeder serving the given entries
    pub fn new(entries: std::collections::BTreeMap<String, OfferingEntry>) -> Self {
        Self {
            entries,
            failing: BTreeSet::new(),
        }
    }

    /// Mark offerings that the feeder will report as failed
    pub fn with_failing(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.failing = ids.into_iter().collect();
        self
    }
}

#[async_trait::async_trait]
impl CacheFeeder for StaticFeeder {
    async fn feed_all(&self, cache: &mut ContentCache) -> Vec<FeedFailure> {
        let ids: BTreeSet<String> = self.entries.keys().cloned().collect();
        self.feed_offerings(cache, &ids).await
    }

    async fn feed_offerings(
        &self,
        cache: &mut ContentCache,
        ids: &BTreeSet<String>,
    ) -> Vec<FeedFailure> {
        let mut failures = Vec::new();
        for id in ids {
            if self.failing.contains(id) {
                failures.push(FeedFailure::new(id.clone(), "backing store unavailable"));
                continue;
            }
            if let Some(entry) = self.entries.get(id) {
                cache.set_offering(id.clone(), entry.clone());
            }
        }
        failures
    }
}
