//! Integration tests for obscache
//!
//! End-to-end checks of the cache + persistence + controller contract:
//! round-tripping, debounce coalescing, shutdown durability, update
//! isolation and defensive snapshot recovery.

use obscache::cache::{ContentCache, OfferingEntry, TimeRange};
use obscache::controller::{CacheController, StaticFeeder};
use obscache::event::NoopNotifier;
use obscache::persistence::{
    DebouncedStrategy, NoopStrategy, PersistenceStrategy, SnapshotStore, SyncStrategy,
};
use chrono::{TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn catalog() -> BTreeMap<String, OfferingEntry> {
    let mut entries = BTreeMap::new();
    for (id, proc_id, prop) in [
        ("off-tide", "gauge-1", "water-level"),
        ("off-weather", "station-7", "air-temperature"),
        ("off-currents", "adcp-2", "current-speed"),
    ] {
        let mut entry = OfferingEntry::named(format!("Offering {id}"));
        entry.procedures.insert(proc_id.to_string());
        entry.observable_properties.insert(prop.to_string());
        entry.features.insert(format!("feature-{id}"));
        entry.phenomenon_time = Some(
            TimeRange::new(
                Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            )
            .unwrap(),
        );
        entries.insert(id.to_string(), entry);
    }
    entries
}

fn controller_with(strategy: Box<dyn PersistenceStrategy>) -> CacheController {
    init_tracing();
    CacheController::new(
        Arc::new(StaticFeeder::new(catalog())),
        Arc::new(NoopNotifier),
        strategy,
    )
}

async fn wait_for_file(store: &SnapshotStore, max: Duration) -> bool {
    let deadline = std::time::Instant::now() + max;
    while std::time::Instant::now() < deadline {
        if store.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    store.exists()
}

mod roundtrip {
    use super::*;

    #[tokio::test]
    async fn persisted_cache_recovers_identically() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.json");

        let controller =
            controller_with(Box::new(SyncStrategy::new(SnapshotStore::new(&path))));
        controller.full_update().await.unwrap();
        let persisted = controller.current();

        // Fresh process: same storage, empty cache until recovery
        let recovered = CacheController::new(
            Arc::new(StaticFeeder::new(BTreeMap::new())),
            Arc::new(NoopNotifier),
            Box::new(SyncStrategy::new(SnapshotStore::new(&path))),
        );
        assert!(recovered.current().is_empty());
        assert!(recovered.recover().await);

        let loaded = recovered.current();
        assert_eq!(*loaded, *persisted);
        assert!(loaded.back_references_consistent());
        assert_eq!(
            loaded.phenomenon_time_for_offering("off-tide"),
            persisted.phenomenon_time_for_offering("off-tide")
        );
    }

    #[tokio::test]
    async fn recovery_without_snapshot_reports_cold_start() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("snapshot.json"));
        let controller = controller_with(Box::new(SyncStrategy::new(store)));

        assert!(!controller.recover().await);
        assert!(controller.current().is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_degrades_to_cold_start() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.json");
        tokio::fs::write(&path, "][ definitely not a snapshot").await.unwrap();

        let controller =
            controller_with(Box::new(SyncStrategy::new(SnapshotStore::new(&path))));
        assert!(!controller.recover().await);

        // A full rebuild then overwrites the bad file
        controller.full_update().await.unwrap();
        let reread = SnapshotStore::new(&path).read().await.unwrap();
        assert_eq!(reread, *controller.current());
    }
}

mod debounce {
    use super::*;

    #[tokio::test]
    async fn burst_of_updates_coalesces_to_latest_state() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("snapshot.json"));
        let strategy =
            DebouncedStrategy::new(store.clone(), Duration::from_secs(2)).unwrap();

        for generation in 0..5 {
            let mut cache = ContentCache::new();
            cache.set_offering(
                format!("off-gen-{generation}"),
                OfferingEntry::named(format!("generation {generation}")),
            );
            strategy.persist_on_partial_update(Arc::new(cache)).await;
        }

        // Nothing may hit disk before the write delay elapses
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!store.exists());

        assert!(wait_for_file(&store, Duration::from_secs(6)).await);
        let written = store.read().await.unwrap();
        assert_eq!(written.len(), 1);
        assert!(written.has_offering("off-gen-4"));
    }

    #[tokio::test]
    async fn shutdown_flushes_pending_state() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("snapshot.json"));
        let strategy =
            DebouncedStrategy::new(store.clone(), Duration::from_secs(30)).unwrap();

        let mut pending = ContentCache::new();
        pending.set_offering("off-pending", OfferingEntry::named("pending"));
        strategy.persist_on_partial_update(Arc::new(pending)).await;

        let mut final_state = ContentCache::new();
        final_state.set_offering("off-final", OfferingEntry::named("final"));
        strategy.persist_on_shutdown(Arc::new(final_state.clone())).await;

        // Durable the moment persist_on_shutdown returns
        let written = store.read().await.unwrap();
        assert_eq!(written, final_state);
    }

    #[tokio::test]
    async fn controller_shutdown_persists_latest_publish() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("snapshot.json"));
        let controller = controller_with(Box::new(
            DebouncedStrategy::new(store.clone(), Duration::from_secs(30)).unwrap(),
        ));

        controller.full_update().await.unwrap();
        let published = controller.current();
        controller.shutdown().await;

        assert_eq!(store.read().await.unwrap(), *published);
    }
}

mod isolation {
    use super::*;

    #[tokio::test]
    async fn partial_update_is_byte_identical_outside_its_scope() {
        let controller = controller_with(Box::new(NoopStrategy));
        controller.full_update().await.unwrap();
        let before = controller.current();

        let ids: BTreeSet<String> = ["off-tide".to_string()].into();
        controller.partial_update(&ids).await.unwrap();
        let after = controller.current();

        for id in ["off-weather", "off-currents"] {
            let untouched_before = serde_json::to_vec(before.offering(id).unwrap()).unwrap();
            let untouched_after = serde_json::to_vec(after.offering(id).unwrap()).unwrap();
            assert_eq!(untouched_before, untouched_after, "offering {id} changed");
        }
    }

    #[tokio::test]
    async fn readers_keep_their_snapshot_across_updates() {
        let controller = Arc::new(controller_with(Box::new(NoopStrategy)));
        controller.full_update().await.unwrap();

        let held = controller.current();
        let held_copy = ContentCache::clone(&held);

        // Concurrent partial updates while the reader keeps its reference
        let mut tasks = Vec::new();
        for id in ["off-tide", "off-weather", "off-currents"] {
            let controller = controller.clone();
            tasks.push(tokio::spawn(async move {
                let ids: BTreeSet<String> = [id.to_string()].into();
                controller.partial_update(&ids).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        controller.full_update().await.unwrap();

        assert_eq!(*held, held_copy);
    }

    #[tokio::test]
    async fn symmetry_holds_after_any_update_sequence() {
        let controller = controller_with(Box::new(NoopStrategy));
        controller.full_update().await.unwrap();

        let ids: BTreeSet<String> = ["off-tide".to_string(), "off-weather".to_string()].into();
        controller.partial_update(&ids).await.unwrap();

        let cache = controller.current();
        assert!(cache.back_references_consistent());
        for offering_id in cache.offering_ids() {
            let entry = cache.offering(offering_id).unwrap();
            for procedure in &entry.procedures {
                assert!(cache
                    .offerings_for_procedure(procedure)
                    .unwrap()
                    .contains(offering_id));
            }
            for property in &entry.observable_properties {
                assert!(cache
                    .offerings_for_observable_property(property)
                    .unwrap()
                    .contains(offering_id));
            }
            for feature in &entry.features {
                assert!(cache
                    .offerings_for_feature(feature)
                    .unwrap()
                    .contains(offering_id));
            }
        }
    }
}

mod degradation {
    use super::*;
    use obscache::error::ObsCacheError;

    #[tokio::test]
    async fn failing_subset_commits_the_rest() {
        let feeder = StaticFeeder::new(catalog())
            .with_failing(["off-weather".to_string()]);
        let controller = CacheController::new(
            Arc::new(feeder),
            Arc::new(NoopNotifier),
            Box::new(NoopStrategy),
        );

        let report = controller.full_update().await.unwrap();
        assert_eq!(report.offerings, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].offering, "off-weather");

        let cache = controller.current();
        assert!(cache.has_offering("off-tide"));
        assert!(!cache.has_offering("off-weather"));
    }

    #[tokio::test]
    async fn outage_during_full_update_preserves_catalog_and_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.json");

        let healthy =
            controller_with(Box::new(SyncStrategy::new(SnapshotStore::new(&path))));
        healthy.full_update().await.unwrap();
        let served = healthy.current();

        // Same storage, but the backing store is now fully unreachable
        let failing = StaticFeeder::new(catalog()).with_failing(catalog().into_keys());
        let controller = CacheController::new(
            Arc::new(failing),
            Arc::new(NoopNotifier),
            Box::new(SyncStrategy::new(SnapshotStore::new(&path))),
        );
        assert!(controller.recover().await);

        let report = controller.full_update().await.unwrap();
        assert_eq!(report.failures.len(), 3);
        assert_eq!(*controller.current(), *served);
        assert_eq!(SnapshotStore::new(&path).read().await.unwrap(), *served);
    }

    #[tokio::test]
    async fn failed_partial_refresh_keeps_served_entry() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.json");

        let healthy =
            controller_with(Box::new(SyncStrategy::new(SnapshotStore::new(&path))));
        healthy.full_update().await.unwrap();
        let served = healthy.current();

        let failing = StaticFeeder::new(catalog()).with_failing(["off-tide".to_string()]);
        let controller = CacheController::new(
            Arc::new(failing),
            Arc::new(NoopNotifier),
            Box::new(SyncStrategy::new(SnapshotStore::new(&path))),
        );
        assert!(controller.recover().await);

        let ids: BTreeSet<String> = ["off-tide".to_string()].into();
        let report = controller.partial_update(&ids).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        let cache = controller.current();
        assert_eq!(cache.offering("off-tide"), served.offering("off-tide"));
        assert_eq!(cache.len(), served.len());
    }

    #[tokio::test]
    async fn debounced_strategy_rejects_misconfigured_delay() {
        let temp = TempDir::new().unwrap();
        for secs in [0, 1] {
            let store = SnapshotStore::new(temp.path().join("snapshot.json"));
            let err = DebouncedStrategy::new(store, Duration::from_secs(secs)).unwrap_err();
            assert!(matches!(err, ObsCacheError::WriteDelayTooShort { .. }));
        }
        assert!(!temp.path().join("snapshot.json").exists());
    }
}
