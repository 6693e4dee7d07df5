//! Feeder seam to the backing store
//!
//! A feeder fills a working cache copy from the (slow) backing store. It
//! reports failures per offering rather than all-or-nothing: whatever it
//! managed to write into the cache is committed by the controller.

use crate::cache::ContentCache;
use crate::error::FeedFailure;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Populates a working cache from the backing store
///
/// Implemented outside this crate by the service's data-access layer.
/// Both methods mutate the given working copy in place and return the
/// offerings they could not refresh; partial success is the norm, not an
/// error.
#[async_trait]
pub trait CacheFeeder: Send + Sync {
    /// Populate an empty working cache with the full catalog
    async fn feed_all(&self, cache: &mut ContentCache) -> Vec<FeedFailure>;

    /// Refresh only the named offerings in the working cache
    ///
    /// The controller removes the named offerings before the call, so an
    /// offering the feeder does not re-add ends up deleted.
    async fn feed_offerings(
        &self,
        cache: &mut ContentCache,
        ids: &BTreeSet<String>,
    ) -> Vec<FeedFailure>;
}
