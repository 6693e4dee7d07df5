//! Multi-indexed catalog metadata snapshot
//!
//! A `ContentCache` answers catalog queries (which offerings exist, what
//! they measure, where, over what time range) without touching the backing
//! store. Published instances are immutable: readers share them via
//! `Arc<ContentCache>` and never need a lock. The write operations here are
//! only ever called on a private working copy owned by the update path,
//! before publication.

use crate::cache::extent::{Envelope, TimeRange};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Metadata for a single offering (a named grouping of observations)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferingEntry {
    /// Human-readable offering name
    pub name: String,
    /// Procedures (sensors/processes) contributing observations
    #[serde(default)]
    pub procedures: BTreeSet<String>,
    /// Phenomena measured within this offering
    #[serde(default)]
    pub observable_properties: BTreeSet<String>,
    /// Features of interest observed within this offering
    #[serde(default)]
    pub features: BTreeSet<String>,
    /// Spatial bounds of all observations, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Envelope>,
    /// [min, max] phenomenon time over all observations, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phenomenon_time: Option<TimeRange>,
    /// [min, max] result time over all observations, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_time: Option<TimeRange>,
}

impl OfferingEntry {
    /// Create an entry with the given display name and no members
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Back-references from an observable property
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyRefs {
    /// Offerings in which this property is measured
    pub offerings: BTreeSet<String>,
    /// Procedures measuring this property (union over carrying offerings)
    pub procedures: BTreeSet<String>,
}

/// In-memory catalog metadata snapshot
///
/// The offerings map is the source of truth; the procedure, property and
/// feature indexes are derived from it and kept consistent by the write
/// operations. Deterministic `BTreeMap` ordering keeps serialized snapshots
/// byte-stable for identical content.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    offerings: BTreeMap<String, OfferingEntry>,
    procedures: BTreeMap<String, BTreeSet<String>>,
    properties: BTreeMap<String, PropertyRefs>,
    features: BTreeMap<String, BTreeSet<String>>,
}

impl PartialEq for ContentCache {
    fn eq(&self, other: &Self) -> bool {
        // Derived indexes are a function of the offerings map
        self.offerings == other.offerings
    }
}

impl ContentCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct a cache from a decoded offerings map
    ///
    /// Back-references are rebuilt from scratch, so a snapshot only needs
    /// to carry the offerings map.
    pub fn from_offerings(offerings: BTreeMap<String, OfferingEntry>) -> Self {
        let mut cache = Self {
            offerings,
            ..Self::default()
        };
        cache.rebuild_back_references();
        cache
    }

    // --- Write operations (working copies only) ---

    /// Insert or replace an offering's metadata
    pub fn set_offering(&mut self, id: impl Into<String>, entry: OfferingEntry) {
        let id = id.into();
        let replaced = self.offerings.insert(id.clone(), entry).is_some();
        if replaced {
            // The old entry's memberships may linger in the indexes
            self.rebuild_back_references();
        } else {
            self.index_offering(&id);
        }
    }

    /// Remove an offering and its back-references
    pub fn remove_offering(&mut self, id: &str) -> Option<OfferingEntry> {
        let removed = self.offerings.remove(id);
        if removed.is_some() {
            self.rebuild_back_references();
        }
        removed
    }

    /// Drop all content
    pub fn clear(&mut self) {
        self.offerings.clear();
        self.procedures.clear();
        self.properties.clear();
        self.features.clear();
    }

    /// Recompute all derived indexes from the offerings map
    fn rebuild_back_references(&mut self) {
        self.procedures.clear();
        self.properties.clear();
        self.features.clear();
        let ids: Vec<String> = self.offerings.keys().cloned().collect();
        for id in ids {
            self.index_offering(&id);
        }
    }

    /// Merge one offering's memberships into the derived indexes
    fn index_offering(&mut self, id: &str) {
        let Some(entry) = self.offerings.get(id) else {
            return;
        };
        for procedure in &entry.procedures {
            self.procedures
                .entry(procedure.clone())
                .or_default()
                .insert(id.to_string());
        }
        for property in &entry.observable_properties {
            let refs = self.properties.entry(property.clone()).or_default();
            refs.offerings.insert(id.to_string());
            refs.procedures.extend(entry.procedures.iter().cloned());
        }
        for feature in &entry.features {
            self.features
                .entry(feature.clone())
                .or_default()
                .insert(id.to_string());
        }
    }

    // --- Read operations (safe on shared published instances) ---

    /// All offerings, keyed by identifier
    pub fn offerings(&self) -> &BTreeMap<String, OfferingEntry> {
        &self.offerings
    }

    /// Offering identifiers in stable order
    pub fn offering_ids(&self) -> impl Iterator<Item = &str> {
        self.offerings.keys().map(String::as_str)
    }

    /// Look up a single offering
    pub fn offering(&self, id: &str) -> Option<&OfferingEntry> {
        self.offerings.get(id)
    }

    /// Whether an offering exists
    pub fn has_offering(&self, id: &str) -> bool {
        self.offerings.contains_key(id)
    }

    /// Procedures contributing to an offering
    pub fn procedures_for_offering(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.offerings.get(id).map(|e| &e.procedures)
    }

    /// Properties measured within an offering
    pub fn observable_properties_for_offering(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.offerings.get(id).map(|e| &e.observable_properties)
    }

    /// Features observed within an offering
    pub fn features_for_offering(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.offerings.get(id).map(|e| &e.features)
    }

    /// Spatial bounds of an offering, if known
    pub fn envelope_for_offering(&self, id: &str) -> Option<&Envelope> {
        self.offerings.get(id).and_then(|e| e.envelope.as_ref())
    }

    /// Phenomenon-time extent of an offering, if known
    pub fn phenomenon_time_for_offering(&self, id: &str) -> Option<&TimeRange> {
        self.offerings
            .get(id)
            .and_then(|e| e.phenomenon_time.as_ref())
    }

    /// Result-time extent of an offering, if known
    pub fn result_time_for_offering(&self, id: &str) -> Option<&TimeRange> {
        self.offerings.get(id).and_then(|e| e.result_time.as_ref())
    }

    /// Offerings a procedure participates in
    pub fn offerings_for_procedure(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.procedures.get(id)
    }

    /// Offerings in which a property is measured
    pub fn offerings_for_observable_property(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.properties.get(id).map(|r| &r.offerings)
    }

    /// Procedures measuring a property
    pub fn procedures_for_observable_property(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.properties.get(id).map(|r| &r.procedures)
    }

    /// Offerings a feature is associated with
    pub fn offerings_for_feature(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.features.get(id)
    }

    /// All known procedure identifiers
    pub fn procedure_ids(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    /// All known observable property identifiers
    pub fn observable_property_ids(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// All known feature identifiers
    pub fn feature_ids(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Number of offerings
    pub fn len(&self) -> usize {
        self.offerings.len()
    }

    /// Whether the cache holds no offerings
    pub fn is_empty(&self) -> bool {
        self.offerings.is_empty()
    }

    /// Check referential symmetry between offerings and derived indexes
    ///
    /// Holds for every cache built through the write operations; exposed so
    /// tests can assert it on arbitrary published instances.
    pub fn back_references_consistent(&self) -> bool {
        let rebuilt = Self::from_offerings(self.offerings.clone());
        self.procedures == rebuilt.procedures
            && self.properties == rebuilt.properties
            && self.features == rebuilt.features
    }
}
