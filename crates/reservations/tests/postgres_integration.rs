//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p reservations --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use common::{HolderId, ItemId};
use futures_util::future::join_all;
use reservations::{AcquireOutcome, AcquireRequest, PostgresReservationStore, ReservationStore};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_reservations_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and an empty table
async fn get_test_store() -> PostgresReservationStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE reservations")
        .execute(&pool)
        .await
        .unwrap();

    PostgresReservationStore::new(pool)
}

/// Postgres stores microseconds; keep test instants on that grid.
fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap()
}

fn request(item: &str, holder: &str, at: DateTime<Utc>) -> AcquireRequest {
    AcquireRequest {
        item_id: ItemId::new(item),
        holder_id: HolderId::new(holder),
        now: at,
        expires_at: at + TimeDelta::minutes(20),
    }
}

#[tokio::test]
async fn acquire_and_conflict() {
    let store = get_test_store().await;
    let t0 = now();

    let first = store.acquire(request("ITEM-A", "u1", t0)).await.unwrap();
    let AcquireOutcome::Acquired(lease) = first else {
        panic!("expected Acquired, got {first:?}");
    };
    assert_eq!(lease.expires_at, t0 + TimeDelta::minutes(20));

    let second = store
        .acquire(request("ITEM-A", "u2", t0 + TimeDelta::minutes(19)))
        .await
        .unwrap();
    match second {
        AcquireOutcome::HeldByOther(existing) => {
            assert_eq!(existing.holder_id.as_str(), "u1");
            assert_eq!(existing.reservation_id, lease.reservation_id);
        }
        other => panic!("expected HeldByOther, got {other:?}"),
    }
}

#[tokio::test]
async fn same_holder_refresh_keeps_identity() {
    let store = get_test_store().await;
    let t0 = now();

    let AcquireOutcome::Acquired(first) = store.acquire(request("ITEM-A", "u1", t0)).await.unwrap()
    else {
        panic!("expected Acquired");
    };

    let t1 = t0 + TimeDelta::minutes(5);
    let AcquireOutcome::Refreshed(refreshed) =
        store.acquire(request("ITEM-A", "u1", t1)).await.unwrap()
    else {
        panic!("expected Refreshed");
    };

    assert_eq!(refreshed.reservation_id, first.reservation_id);
    assert_eq!(refreshed.created_at, first.created_at);
    assert_eq!(refreshed.expires_at, t1 + TimeDelta::minutes(20));
}

#[tokio::test]
async fn expired_lease_is_taken_over_by_new_holder() {
    let store = get_test_store().await;
    let t0 = now();
    store.acquire(request("ITEM-A", "u1", t0)).await.unwrap();

    let t1 = t0 + TimeDelta::minutes(21);
    let outcome = store.acquire(request("ITEM-A", "u2", t1)).await.unwrap();
    match outcome {
        AcquireOutcome::Acquired(lease) => {
            assert_eq!(lease.holder_id.as_str(), "u2");
            assert_eq!(lease.created_at, t1);
        }
        other => panic!("expected Acquired, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_acquire_has_single_winner() {
    let store = get_test_store().await;
    let t0 = now();

    let attempts = (0..16).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .acquire(request("ITEM-A", &format!("holder-{i}"), t0))
                .await
        })
    });

    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let acquired = outcomes
        .iter()
        .filter(|o| matches!(o, AcquireOutcome::Acquired(_)))
        .count();
    let held = outcomes
        .iter()
        .filter(|o| matches!(o, AcquireOutcome::HeldByOther(_)))
        .count();

    assert_eq!(acquired, 1);
    assert_eq!(held, 15);
}

#[tokio::test]
async fn release_and_extend() {
    let store = get_test_store().await;
    let t0 = now();
    let item = ItemId::new("ITEM-A");
    let u1 = HolderId::new("u1");

    store.acquire(request("ITEM-A", "u1", t0)).await.unwrap();

    let extended = store
        .extend(&item, &u1, t0, t0 + TimeDelta::minutes(45))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(extended.expires_at, t0 + TimeDelta::minutes(45));

    assert!(
        store
            .release(&item, &HolderId::new("u2"))
            .await
            .unwrap()
            .is_none()
    );
    assert!(store.release(&item, &u1).await.unwrap().is_some());
    assert!(store.get(&item).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_expired_returns_each_row_once() {
    let store = get_test_store().await;
    let t0 = now();

    store.acquire(request("ITEM-A", "u1", t0)).await.unwrap();
    store.acquire(request("ITEM-B", "u2", t0)).await.unwrap();
    store
        .acquire(request("ITEM-C", "u3", t0 + TimeDelta::minutes(10)))
        .await
        .unwrap();

    let cutoff = t0 + TimeDelta::minutes(21);
    let first = store.delete_expired(cutoff).await.unwrap();
    let second = store.delete_expired(cutoff).await.unwrap();

    let released: Vec<_> = first.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(released, vec!["ITEM-A", "ITEM-B"]);
    assert!(second.is_empty());
    assert!(store.get(&ItemId::new("ITEM-C")).await.unwrap().is_some());
}
