use common::ItemId;
use thiserror::Error;

/// Errors raised by catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No stock item with this ID exists.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// A catalog seed document could not be read.
    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog seed document could not be parsed.
    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
