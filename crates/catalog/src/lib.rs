//! Read-side boundary to the product persistence layer.
//!
//! The reservation and shipping core only reads stock items: remaining
//! quantity for lease admission, weight and dimensions for packing.
//! Products are owned elsewhere; [`InMemoryCatalog`] stands in for that
//! layer in tests and in the standalone server.

pub mod error;
pub mod item;
pub mod memory;

pub use error::{CatalogError, Result};
pub use item::StockItem;
pub use memory::InMemoryCatalog;

use async_trait::async_trait;
use common::ItemId;

/// Lookup of stock items by ID.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the item, or `None` if it is unknown.
    async fn get(&self, item_id: &ItemId) -> Result<Option<StockItem>>;

    /// Returns the items for the given IDs, preserving request order.
    ///
    /// Fails with [`CatalogError::ItemNotFound`] on the first unknown ID.
    async fn get_many(&self, item_ids: &[ItemId]) -> Result<Vec<StockItem>> {
        let mut items = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            let item = self
                .get(id)
                .await?
                .ok_or_else(|| CatalogError::ItemNotFound(id.clone()))?;
            items.push(item);
        }
        Ok(items)
    }
}
