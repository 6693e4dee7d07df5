//! Cache configuration
//!
//! Selects the persistence strategy, the snapshot file location and the
//! debounce write delay. Misconfiguration is fatal at startup, not deferred.

use crate::error::{ObsCacheError, ObsCacheResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Smallest accepted debounce write delay, in seconds
pub const MIN_WRITE_DELAY_SECS: u64 = 2;

/// Which persistence strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceKind {
    /// No snapshotting; every restart starts cold
    None,
    /// Every update blocks until the snapshot is on disk
    Sync,
    /// Updates are coalesced and written by a background worker
    Debounced,
}

/// Cache subsystem configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Persistence strategy to construct at startup
    pub persistence: PersistenceKind,

    /// Snapshot file location; defaults to the platform state directory
    pub snapshot_path: Option<PathBuf>,

    /// Debounce window for the debounced strategy, in seconds
    pub write_delay_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistence: PersistenceKind::Debounced,
            snapshot_path: None,
            write_delay_secs: 5,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a TOML file, using defaults if it is missing
    pub async fn load(path: &Path) -> ObsCacheResult<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ObsCacheError::io(format!("reading config from {}", path.display()), e))?;

        let config: Self = toml::from_str(&content).map_err(|e| ObsCacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject misconfiguration before any strategy is constructed
    pub fn validate(&self) -> ObsCacheResult<()> {
        if self.persistence == PersistenceKind::Debounced
            && self.write_delay_secs < MIN_WRITE_DELAY_SECS
        {
            return Err(ObsCacheError::WriteDelayTooShort {
                secs: self.write_delay_secs,
            });
        }
        Ok(())
    }

    /// Resolve the snapshot path, falling back to the platform default
    pub fn resolved_snapshot_path(&self) -> ObsCacheResult<PathBuf> {
        match &self.snapshot_path {
            Some(path) => Ok(path.clone()),
            None => default_snapshot_path().ok_or(ObsCacheError::SnapshotPathUnavailable),
        }
    }
}

/// Default snapshot location under the platform state directory
pub fn default_snapshot_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("obscache").join("snapshot.json"))
}
