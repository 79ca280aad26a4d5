use std::sync::Arc;

use catalog::{InMemoryCatalog, StockItem};
use chrono::{TimeDelta, Utc};
use common::{Dimensions, HolderId, ItemId, ManualClock};
use criterion::{Criterion, criterion_group, criterion_main};
use reservations::{InMemoryReservationStore, ReservationManager};

fn manager() -> (
    ReservationManager<InMemoryReservationStore, InMemoryCatalog>,
    ManualClock,
) {
    let clock = ManualClock::new(Utc::now());
    let items = (0..1_000).map(|i| {
        StockItem::new(
            format!("SKU-{i:04}"),
            "Bench part",
            1,
            Dimensions::new(10.0, 10.0, 10.0),
            1.0,
        )
    });
    let manager = ReservationManager::new(
        InMemoryReservationStore::new(),
        InMemoryCatalog::with_items(items),
    )
    .with_clock(Arc::new(clock.clone()));
    (manager, clock)
}

fn bench_admit_and_release(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (manager, _clock) = manager();
    let item = ItemId::new("SKU-0001");
    let holder = HolderId::new("bench");

    c.bench_function("reservations/admit_release", |b| {
        b.iter(|| {
            rt.block_on(async {
                manager.admit(&item, &holder, 1).await.unwrap();
                manager.release(&item, &holder).await.unwrap();
            });
        });
    });
}

fn bench_sweep_1000_expired(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (manager, clock) = manager();
    let holder = HolderId::new("bench");

    c.bench_function("reservations/sweep_1000_expired", |b| {
        b.iter(|| {
            rt.block_on(async {
                for i in 0..1_000 {
                    manager
                        .try_reserve(&ItemId::new(format!("SKU-{i:04}")), &holder)
                        .await
                        .unwrap();
                }
                clock.advance(TimeDelta::minutes(21));
                manager.sweep_expired().await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_admit_and_release, bench_sweep_1000_expired);
criterion_main!(benches);
