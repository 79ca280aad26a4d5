use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{HolderId, ItemId};

use crate::{AcquireOutcome, AcquireRequest, Reservation, Result};

/// Storage boundary for leases.
///
/// Implementations keep at most one lease row per item. Every method is a
/// single atomic operation relative to other writers on the same item.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Writes a lease for `request.holder_id` unless another holder has a
    /// lease that is not expired at `request.now`.
    ///
    /// The existence check and the write happen in one conditional write;
    /// two concurrent callers for the same item can never both acquire.
    async fn acquire(&self, request: AcquireRequest) -> Result<AcquireOutcome>;

    /// Moves the expiry of the holder's live lease to `expires_at`.
    ///
    /// Returns `None` if the holder has no lease or it expired before `now`.
    async fn extend(
        &self,
        item_id: &ItemId,
        holder_id: &HolderId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Reservation>>;

    /// Deletes the holder's lease on the item, returning it if one existed.
    async fn release(&self, item_id: &ItemId, holder_id: &HolderId)
    -> Result<Option<Reservation>>;

    /// Returns the lease row for the item, expired or not.
    async fn get(&self, item_id: &ItemId) -> Result<Option<Reservation>>;

    /// Deletes every lease with `expires_at < now` and returns the deleted
    /// rows.
    ///
    /// The expiry condition is evaluated at delete time, so a lease
    /// extended concurrently survives, and concurrent sweeps never return
    /// the same row twice.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>>;
}
