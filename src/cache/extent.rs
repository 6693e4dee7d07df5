//! Temporal and spatial extent value types
//!
//! Extents attached to an offering are the union of the extents of its
//! constituent observations. They may be absent, but a constructed extent
//! is never contradictory (min > max).

use crate::error::{ObsCacheError, ObsCacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed time interval with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Earliest instant covered
    pub start: DateTime<Utc>,
    /// Latest instant covered
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ObsCacheResult<Self> {
        if start > end {
            return Err(ObsCacheError::ExtentInvalid {
                reason: format!("time range start {start} is after end {end}"),
            });
        }
        Ok(Self { start, end })
    }

    /// Degenerate range covering a single instant
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    /// Smallest range covering both `self` and `other`
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Whether `at` falls within this range (inclusive)
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Axis-aligned 2D bounding box in the catalog's coordinate reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Create an envelope, rejecting inverted axes
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> ObsCacheResult<Self> {
        if min_x > max_x || min_y > max_y {
            return Err(ObsCacheError::ExtentInvalid {
                reason: format!("inverted envelope: ({min_x}, {min_y}) .. ({max_x}, {max_y})"),
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Degenerate envelope around a single point
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Grow this envelope to cover `other`
    pub fn extend(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Smallest envelope covering both `self` and `other`
    pub fn union(&self, other: &Envelope) -> Envelope {
        let mut merged = *self;
        merged.extend(other);
        merged
    }
}
