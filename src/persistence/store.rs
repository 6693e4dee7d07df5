//! Snapshot file codec
//!
//! One file holds one serialized cache. Writes go to a sibling temp file
//! first and land with a rename, so the snapshot is never observed half
//! written. The envelope carries an explicit format version so an old
//! binary reading a newer snapshot degrades cleanly instead of crashing.

use crate::cache::{ContentCache, OfferingEntry};
use crate::error::{ObsCacheError, ObsCacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk snapshot envelope
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    /// Format version; bump on incompatible layout changes
    version: u32,
    /// When the snapshot was written
    saved_at: DateTime<Utc>,
    /// Offerings map; back-references are rebuilt on load
    offerings: BTreeMap<String, OfferingEntry>,
}

/// Reads and writes the single snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store for the given snapshot location
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot file currently exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write a snapshot, replacing any previous one atomically
    pub async fn write(&self, cache: &ContentCache) -> ObsCacheResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ObsCacheError::io("creating snapshot directory", e))?;
        }

        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            offerings: cache.offerings().clone(),
        };
        let content = serde_json::to_string(&file)?;

        // Temp file in the same directory so the rename stays on one filesystem
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).await.map_err(|e| {
            ObsCacheError::io(format!("writing snapshot temp file {}", tmp.display()), e)
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            ObsCacheError::io(
                format!("replacing snapshot file {}", self.path.display()),
                e,
            )
        })?;

        debug!(
            "Wrote snapshot with {} offering(s) to {}",
            cache.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read and decode the snapshot file
    ///
    /// Strict: any failure surfaces as an error. The strategies wrap this
    /// with the defensive "treat as absent" policy.
    pub async fn read(&self) -> ObsCacheResult<ContentCache> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            ObsCacheError::io(format!("reading snapshot file {}", self.path.display()), e)
        })?;

        let file: SnapshotFile = serde_json::from_str(&content)
            .map_err(|e| ObsCacheError::decode(&self.path, e.to_string()))?;

        if file.version != SNAPSHOT_VERSION {
            return Err(ObsCacheError::SnapshotVersion {
                path: self.path.clone(),
                found: file.version,
                supported: SNAPSHOT_VERSION,
            });
        }

        info!(
            "Loaded snapshot with {} offering(s) saved at {}",
            file.offerings.len(),
            file.saved_at
        );
        Ok(ContentCache::from_offerings(file.offerings))
    }

    /// Delete the snapshot file if present
    pub async fn remove(&self) -> ObsCacheResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed snapshot file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ObsCacheError::io(
                format!("removing snapshot file {}", self.path.display()),
                e,
            )),
        }
    }
}
