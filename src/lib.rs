//! obscache - Sensor-Catalog Content Cache
//!
//! An in-memory, multi-indexed snapshot of slowly-changing sensor catalog
//! metadata (offerings, procedures, observable properties, features and
//! their extents), served lock-free to concurrent readers, rebuilt by a
//! single-writer controller and persisted to disk without stalling
//! request processing.

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod feed;
pub mod persistence;

pub use cache::{ContentCache, Envelope, OfferingEntry, TimeRange};
pub use config::{CacheConfig, PersistenceKind};
pub use controller::{CacheController, UpdateReport};
pub use error::{FeedFailure, ObsCacheError, ObsCacheResult};
pub use event::{CacheChangedEvent, CacheNotifier, ChangeScope};
pub use feed::CacheFeeder;
pub use persistence::PersistenceStrategy;
