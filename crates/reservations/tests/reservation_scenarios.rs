//! End-to-end lease scenarios against the in-memory store.

use std::sync::Arc;

use catalog::{InMemoryCatalog, StockItem};
use chrono::{TimeDelta, Utc};
use common::{Clock, Dimensions, HolderId, ItemId, ManualClock};
use futures_util::future::join_all;
use reservations::{
    Admission, InMemoryReservationStore, ReservationError, ReservationManager, ReservationStore,
};

type TestManager = ReservationManager<InMemoryReservationStore, InMemoryCatalog>;

struct TestHarness {
    manager: Arc<TestManager>,
    store: InMemoryReservationStore,
    catalog: InMemoryCatalog,
    clock: ManualClock,
}

impl TestHarness {
    fn new() -> Self {
        let clock = ManualClock::new(Utc::now());
        let store = InMemoryReservationStore::new();
        let catalog = InMemoryCatalog::with_items([StockItem::new(
            "ITEM-A",
            "Throttle body",
            1,
            Dimensions::new(12.0, 10.0, 8.0),
            1.0,
        )]);
        let manager = ReservationManager::new(store.clone(), catalog.clone())
            .with_clock(Arc::new(clock.clone()));

        Self {
            manager: Arc::new(manager),
            store,
            catalog,
            clock,
        }
    }
}

#[tokio::test]
async fn lease_blocks_until_expiry_and_sweep() {
    let h = TestHarness::new();
    let item = ItemId::new("ITEM-A");
    let u1 = HolderId::new("u1");
    let u2 = HolderId::new("u2");

    // t0: u1 takes the last unit.
    let admission = h.manager.admit(&item, &u1, 1).await.unwrap();
    assert!(matches!(admission, Admission::Reserved(_)));

    // t0 + 19 min: still held.
    h.clock.advance(TimeDelta::minutes(19));
    let err = h.manager.admit(&item, &u2, 1).await.unwrap_err();
    assert!(matches!(err, ReservationError::Busy { .. }));

    // t0 + 21 min: sweep reclaims, u2 gets it.
    h.clock.advance(TimeDelta::minutes(2));
    let report = h.manager.sweep_expired().await.unwrap();
    assert_eq!(report.released_count, 1);
    assert_eq!(report.released[0].holder_id, u1);

    let admission = h.manager.admit(&item, &u2, 1).await.unwrap();
    match admission {
        Admission::Reserved(r) => assert_eq!(r.holder_id, u2),
        Admission::Unrestricted => panic!("expected reservation"),
    }
}

#[tokio::test]
async fn concurrent_admissions_yield_exactly_one_holder() {
    let h = TestHarness::new();
    let item = ItemId::new("ITEM-A");

    let attempts = (0..32).map(|i| {
        let manager = Arc::clone(&h.manager);
        let item = item.clone();
        tokio::spawn(async move {
            manager
                .admit(&item, &HolderId::new(format!("holder-{i}")), 1)
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(ReservationError::Busy { .. })))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(busy, 31);
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn concurrent_sweeps_release_each_lease_once() {
    let h = TestHarness::new();
    for i in 0..10 {
        h.manager
            .try_reserve(&ItemId::new(format!("ITEM-{i}")), &HolderId::new("u1"))
            .await
            .unwrap();
    }
    h.clock.advance(TimeDelta::minutes(30));

    let sweeps = (0..4).map(|_| {
        let manager = Arc::clone(&h.manager);
        tokio::spawn(async move { manager.sweep_expired().await })
    });

    let total: usize = join_all(sweeps)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().released_count)
        .sum();

    assert_eq!(total, 10);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn lease_extended_after_expiry_read_survives_sweep() {
    let h = TestHarness::new();
    let item = ItemId::new("ITEM-A");
    let u1 = HolderId::new("u1");
    let t0 = h.clock.now();

    h.manager.try_reserve(&item, &u1).await.unwrap();

    // The holder re-validates right at the edge of expiry.
    h.clock.set(t0 + TimeDelta::minutes(20));
    let extended = h.manager.extend(&item, &u1).await.unwrap();
    assert!(extended.is_some());

    // A sweep whose cutoff was computed from the old expiry must keep it.
    let released = h
        .store
        .delete_expired(t0 + TimeDelta::minutes(20) + TimeDelta::seconds(1))
        .await
        .unwrap();
    assert!(released.is_empty());
    assert!(h.manager.active_reservation(&item).await.unwrap().is_some());
}

#[tokio::test]
async fn restocked_item_no_longer_needs_lease() {
    let h = TestHarness::new();
    let item = ItemId::new("ITEM-A");

    h.manager.admit(&item, &HolderId::new("u1"), 1).await.unwrap();
    h.catalog.set_quantity(&item, 4).await;

    let admission = h.manager.admit(&item, &HolderId::new("u2"), 2).await.unwrap();
    assert_eq!(admission, Admission::Unrestricted);
}

#[tokio::test]
async fn storage_outage_surfaces_as_transient_error() {
    let h = TestHarness::new();
    h.store.set_unavailable(true);

    let err = h
        .manager
        .admit(&ItemId::new("ITEM-A"), &HolderId::new("u1"), 1)
        .await
        .unwrap_err();
    assert!(err.is_transient());

    let err = h.manager.sweep_expired().await.unwrap_err();
    assert!(matches!(err, ReservationError::Database(_)));
}
