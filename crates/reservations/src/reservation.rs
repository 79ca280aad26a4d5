//! Lease records and store-level outcomes.

use chrono::{DateTime, Utc};
use common::{HolderId, ItemId, ReservationId};
use serde::{Deserialize, Serialize};

/// A time-bounded claim by one holder on the last unit of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub item_id: ItemId,
    pub holder_id: HolderId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// A lease is expired once `expires_at` lies strictly in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// True if this lease is still live and belongs to someone other than
    /// `holder_id`.
    pub fn blocks(&self, holder_id: &HolderId, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && &self.holder_id != holder_id
    }
}

/// Parameters for a conditional acquire at the storage boundary.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub item_id: ItemId,
    pub holder_id: HolderId,
    /// Instant used to decide whether an existing lease has expired.
    pub now: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of a conditional acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// A new lease was written (no lease existed, or the previous one had
    /// expired).
    Acquired(Reservation),
    /// The holder already had a live lease; its expiry was moved forward.
    Refreshed(Reservation),
    /// Another holder has a live lease; nothing was written.
    HeldByOther(Reservation),
}

/// What a sweep released.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub released_count: usize,
    pub released: Vec<Reservation>,
    pub swept_at: DateTime<Utc>,
}

impl SweepReport {
    pub fn new(released: Vec<Reservation>, swept_at: DateTime<Utc>) -> Self {
        Self {
            released_count: released.len(),
            released,
            swept_at,
        }
    }

    /// IDs of the items whose leases were released.
    pub fn released_items(&self) -> Vec<ItemId> {
        self.released.iter().map(|r| r.item_id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.released.is_empty()
    }
}
