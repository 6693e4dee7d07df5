//! Error types for obscache
//!
//! All modules use `ObsCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for obscache operations
pub type ObsCacheResult<T> = Result<T, ObsCacheError>;

/// All errors that can occur in obscache
#[derive(Error, Debug)]
pub enum ObsCacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Snapshot write delay of {secs}s is too short, must be longer than 1 second")]
    WriteDelayTooShort { secs: u64 },

    #[error("No snapshot path configured and no platform state directory available")]
    SnapshotPathUnavailable,

    // Extent errors
    #[error("Invalid extent: {reason}")]
    ExtentInvalid { reason: String },

    // Snapshot errors
    #[error("Snapshot at {path} has unsupported version {found} (supported: {supported})")]
    SnapshotVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("Failed to decode snapshot at {path}: {reason}")]
    SnapshotDecode { path: PathBuf, reason: String },

    // Feeder errors
    #[error("Cache feed completed with {} failed offering(s)", .failures.len())]
    Feed { failures: Vec<FeedFailure> },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single offering the feeder could not refresh
///
/// Feed errors are aggregated per offering rather than failing the whole
/// update: offerings that succeeded are still committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    /// Offering identifier that failed to refresh
    pub offering: String,
    /// Human-readable failure reason from the backing store
    pub reason: String,
}

impl FeedFailure {
    /// Create a feed failure for an offering
    pub fn new(offering: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            offering: offering.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FeedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.offering, self.reason)
    }
}

impl ObsCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a snapshot decode error
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SnapshotDecode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error leaves the cache servable (degraded) rather than broken
    ///
    /// Storage and decode failures degrade to "no snapshot" / "write skipped";
    /// misconfiguration does not.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Json(_)
                | Self::SnapshotDecode { .. }
                | Self::SnapshotVersion { .. }
        )
    }
}
