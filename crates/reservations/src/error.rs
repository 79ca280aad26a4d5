use catalog::CatalogError;
use chrono::{DateTime, Utc};
use common::ItemId;
use thiserror::Error;

/// Errors that can occur when leasing stock.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// The last unit is leased to another holder. Retryable by the user
    /// once the lease is released or expires.
    #[error("Item {item_id} is temporarily held by another cart until {held_until}")]
    Busy {
        item_id: ItemId,
        held_until: DateTime<Utc>,
    },

    /// The item does not exist in the catalog.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The item exists but is not for sale.
    #[error("Item is not active: {0}")]
    ItemInactive(ItemId),

    /// Not enough units remain to satisfy the request.
    #[error("Item {item_id} is out of stock: requested {requested}, available {available}")]
    OutOfStock {
        item_id: ItemId,
        available: u32,
        requested: u32,
    },

    /// The requested quantity is not a positive number.
    #[error("Invalid quantity {quantity} for item {item_id}")]
    InvalidQuantity { item_id: ItemId, quantity: u32 },

    /// The lease row kept changing between the conditional write and the
    /// follow-up read. Transient.
    #[error("Lease on item {0} is contended, retry later")]
    Contended(ItemId),

    /// The catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl ReservationError {
    /// True for storage failures the caller should retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReservationError::Database(_)
                | ReservationError::Contended(_)
                | ReservationError::Catalog(CatalogError::Io(_))
        )
    }
}

impl From<CatalogError> for ReservationError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ItemNotFound(id) => ReservationError::ItemNotFound(id),
            other => ReservationError::Catalog(other),
        }
    }
}

/// Result type for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;
