use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{HolderId, ItemId, ReservationId};
use tokio::sync::RwLock;

use crate::{
    AcquireOutcome, AcquireRequest, Reservation, ReservationError, Result,
    store::ReservationStore,
};

/// In-memory lease store.
///
/// Every mutation runs under a single write lock, which gives the same
/// check-and-set atomicity as the conditional upsert in PostgreSQL.
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    reservations: Arc<RwLock<HashMap<ItemId, Reservation>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryReservationStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of stored leases, expired ones included.
    pub async fn len(&self) -> usize {
        self.reservations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reservations.read().await.is_empty()
    }

    /// Clears all leases.
    pub async fn clear(&self) {
        self.reservations.write().await.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ReservationError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn acquire(&self, request: AcquireRequest) -> Result<AcquireOutcome> {
        self.check_available()?;
        let mut store = self.reservations.write().await;

        if let Some(existing) = store.get_mut(&request.item_id)
            && !existing.is_expired(request.now)
        {
            if existing.holder_id != request.holder_id {
                return Ok(AcquireOutcome::HeldByOther(existing.clone()));
            }
            existing.expires_at = request.expires_at;
            return Ok(AcquireOutcome::Refreshed(existing.clone()));
        }

        let reservation = Reservation {
            reservation_id: ReservationId::new(),
            item_id: request.item_id.clone(),
            holder_id: request.holder_id,
            created_at: request.now,
            expires_at: request.expires_at,
        };
        store.insert(request.item_id, reservation.clone());
        Ok(AcquireOutcome::Acquired(reservation))
    }

    async fn extend(
        &self,
        item_id: &ItemId,
        holder_id: &HolderId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Reservation>> {
        self.check_available()?;
        let mut store = self.reservations.write().await;

        match store.get_mut(item_id) {
            Some(existing) if &existing.holder_id == holder_id && !existing.is_expired(now) => {
                existing.expires_at = expires_at;
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn release(
        &self,
        item_id: &ItemId,
        holder_id: &HolderId,
    ) -> Result<Option<Reservation>> {
        self.check_available()?;
        let mut store = self.reservations.write().await;

        if store
            .get(item_id)
            .is_some_and(|existing| &existing.holder_id == holder_id)
        {
            return Ok(store.remove(item_id));
        }
        Ok(None)
    }

    async fn get(&self, item_id: &ItemId) -> Result<Option<Reservation>> {
        self.check_available()?;
        Ok(self.reservations.read().await.get(item_id).cloned())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        self.check_available()?;
        let mut store = self.reservations.write().await;

        let expired: Vec<ItemId> = store
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.item_id.clone())
            .collect();

        let mut released: Vec<Reservation> = expired
            .iter()
            .filter_map(|item_id| store.remove(item_id))
            .collect();
        released.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(released)
    }
}
