//! Catalog metadata cache
//!
//! An immutable, multi-indexed snapshot of slowly-changing sensor catalog
//! metadata. Published instances are shared read-only; rebuilds happen on
//! private working copies and replace the published instance atomically
//! (see [`crate::controller`]).
//!
//! # Snapshot discipline
//!
//! | Instance | Mutable | Visible to readers |
//! |----------|---------|--------------------|
//! | Working copy | yes | no |
//! | Published | no | yes, lock-free |

pub mod content;
pub mod extent;

pub use content::{ContentCache, OfferingEntry, PropertyRefs};
pub use extent::{Envelope, TimeRange};
