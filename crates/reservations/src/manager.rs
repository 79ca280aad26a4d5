//! Lease lifecycle on top of a [`ReservationStore`].

use std::sync::Arc;
use std::time::Duration;

use catalog::Catalog;
use chrono::TimeDelta;
use common::{Clock, HolderId, ItemId, SystemClock};

use crate::{
    AcquireOutcome, AcquireRequest, Reservation, ReservationError, Result, SweepReport,
    store::ReservationStore,
};

/// Default lease length: 20 minutes from the last reservation attempt.
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(20 * 60);

/// Outcome of admitting an item into a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The item is down to its last unit; the holder now leases it.
    Reserved(Reservation),
    /// Enough units remain that no lease is needed.
    Unrestricted,
}

/// Owns the single-holder invariant for singleton-stock items.
///
/// Per `(item, holder)` a lease moves `NONE -> HELD -> RELEASED | EXPIRED`.
/// Repeated attempts by the holder keep it `HELD` with a later expiry; after
/// release or expiry only a fresh acquisition brings it back.
pub struct ReservationManager<S: ReservationStore, C: Catalog> {
    store: S,
    catalog: C,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl<S: ReservationStore, C: Catalog> ReservationManager<S, C> {
    /// Creates a manager using the system clock and the default TTL.
    pub fn new(store: S, catalog: C) -> Self {
        Self {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            ttl: lease_length(DEFAULT_RESERVATION_TTL),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the lease length.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = lease_length(ttl);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Admits `requested_quantity` units of an item into the holder's cart.
    ///
    /// Items down to their last unit are leased via [`Self::try_reserve`];
    /// multi-unit items pass without a lease.
    #[tracing::instrument(skip(self), fields(item_id = %item_id, holder_id = %holder_id))]
    pub async fn admit(
        &self,
        item_id: &ItemId,
        holder_id: &HolderId,
        requested_quantity: u32,
    ) -> Result<Admission> {
        if requested_quantity == 0 {
            return Err(ReservationError::InvalidQuantity {
                item_id: item_id.clone(),
                quantity: requested_quantity,
            });
        }

        let item = self
            .catalog
            .get(item_id)
            .await?
            .ok_or_else(|| ReservationError::ItemNotFound(item_id.clone()))?;

        if !item.active {
            return Err(ReservationError::ItemInactive(item_id.clone()));
        }

        if item.quantity == 0 || item.quantity < requested_quantity {
            return Err(ReservationError::OutOfStock {
                item_id: item_id.clone(),
                available: item.quantity,
                requested: requested_quantity,
            });
        }

        if item.is_singleton_stock() {
            let reservation = self.try_reserve(item_id, holder_id).await?;
            return Ok(Admission::Reserved(reservation));
        }

        Ok(Admission::Unrestricted)
    }

    /// Leases the item to the holder, or fails with
    /// [`ReservationError::Busy`] if another holder has a live lease.
    ///
    /// Idempotent for the same holder: repeating the call refreshes the
    /// expiry to `now + ttl`.
    #[tracing::instrument(skip(self), fields(item_id = %item_id, holder_id = %holder_id))]
    pub async fn try_reserve(&self, item_id: &ItemId, holder_id: &HolderId) -> Result<Reservation> {
        let now = self.clock.now();
        let request = AcquireRequest {
            item_id: item_id.clone(),
            holder_id: holder_id.clone(),
            now,
            expires_at: now + self.ttl,
        };

        match self.store.acquire(request).await? {
            AcquireOutcome::Acquired(reservation) => {
                metrics::counter!("reservations_acquired_total").increment(1);
                tracing::info!(
                    reservation_id = %reservation.reservation_id,
                    expires_at = %reservation.expires_at,
                    "reservation acquired"
                );
                Ok(reservation)
            }
            AcquireOutcome::Refreshed(reservation) => {
                metrics::counter!("reservations_refreshed_total").increment(1);
                tracing::debug!(expires_at = %reservation.expires_at, "reservation refreshed");
                Ok(reservation)
            }
            AcquireOutcome::HeldByOther(existing) => {
                metrics::counter!("reservations_busy_total").increment(1);
                tracing::debug!(held_until = %existing.expires_at, "item held by another cart");
                Err(ReservationError::Busy {
                    item_id: item_id.clone(),
                    held_until: existing.expires_at,
                })
            }
        }
    }

    /// Refreshes the holder's live lease during cart re-validation.
    ///
    /// Never creates a lease and never revives an expired one.
    #[tracing::instrument(skip(self), fields(item_id = %item_id, holder_id = %holder_id))]
    pub async fn extend(
        &self,
        item_id: &ItemId,
        holder_id: &HolderId,
    ) -> Result<Option<Reservation>> {
        let now = self.clock.now();
        let extended = self
            .store
            .extend(item_id, holder_id, now, now + self.ttl)
            .await?;

        if extended.is_none() {
            tracing::debug!("no live reservation to extend");
        }
        Ok(extended)
    }

    /// Deletes the holder's lease on the item. No-op if there is none.
    ///
    /// Returns true if a lease was removed.
    #[tracing::instrument(skip(self), fields(item_id = %item_id, holder_id = %holder_id))]
    pub async fn release(&self, item_id: &ItemId, holder_id: &HolderId) -> Result<bool> {
        let released = self.store.release(item_id, holder_id).await?;
        if let Some(reservation) = &released {
            metrics::counter!("reservations_released_total").increment(1);
            tracing::info!(
                reservation_id = %reservation.reservation_id,
                "reservation released"
            );
        }
        Ok(released.is_some())
    }

    /// Releases the holder's leases on every listed item, e.g. once an
    /// order has been placed. Returns how many leases were removed.
    #[tracing::instrument(skip(self, item_ids), fields(holder_id = %holder_id, items = item_ids.len()))]
    pub async fn release_all(&self, holder_id: &HolderId, item_ids: &[ItemId]) -> Result<usize> {
        let mut released = 0;
        for item_id in item_ids {
            if self.release(item_id, holder_id).await? {
                released += 1;
            }
        }
        Ok(released)
    }

    /// True iff a live lease on the item belongs to someone other than
    /// `excluding_holder_id`.
    pub async fn is_held_by_other(
        &self,
        item_id: &ItemId,
        excluding_holder_id: &HolderId,
    ) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .store
            .get(item_id)
            .await?
            .is_some_and(|r| r.blocks(excluding_holder_id, now)))
    }

    /// Returns the live lease on the item, if any.
    pub async fn active_reservation(&self, item_id: &ItemId) -> Result<Option<Reservation>> {
        let now = self.clock.now();
        Ok(self
            .store
            .get(item_id)
            .await?
            .filter(|r| !r.is_expired(now)))
    }

    /// Deletes every lease whose expiry lies before now.
    ///
    /// Safe to run concurrently with itself and with reserve/release: the
    /// store re-checks expiry at delete time and each row is reported by
    /// exactly one sweep.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let released = self.store.delete_expired(now).await?;
        let report = SweepReport::new(released, now);

        metrics::counter!("reservation_sweeps_total").increment(1);
        metrics::counter!("reservations_swept_total").increment(report.released_count as u64);

        if report.is_empty() {
            tracing::debug!("no expired reservations");
        } else {
            tracing::info!(
                released_count = report.released_count,
                items = ?report.released_items(),
                "expired reservations reclaimed"
            );
        }
        Ok(report)
    }
}

/// Longest lease a manager will grant; longer TTLs are clamped.
pub const MAX_RESERVATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn lease_length(ttl: Duration) -> TimeDelta {
    let clamped = if ttl > MAX_RESERVATION_TTL {
        tracing::warn!(
            requested_secs = ttl.as_secs(),
            max_secs = MAX_RESERVATION_TTL.as_secs(),
            "reservation TTL too long, clamping"
        );
        MAX_RESERVATION_TTL
    } else {
        ttl
    };
    TimeDelta::from_std(clamped).unwrap_or(TimeDelta::seconds(MAX_RESERVATION_TTL.as_secs() as i64))
}
