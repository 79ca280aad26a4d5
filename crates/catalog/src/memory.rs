//! In-memory catalog.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use common::ItemId;
use tokio::sync::RwLock;

use crate::{Catalog, Result, StockItem};

/// In-memory catalog for tests and standalone deployments.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    items: Arc<RwLock<HashMap<ItemId, StockItem>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with `items`.
    pub fn with_items(items: impl IntoIterator<Item = StockItem>) -> Self {
        let map = items
            .into_iter()
            .map(|item| (item.item_id.clone(), item))
            .collect();
        Self {
            items: Arc::new(RwLock::new(map)),
        }
    }

    /// Loads a JSON array of stock items.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let items: Vec<StockItem> = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.as_ref().display(),
            items = items.len(),
            "catalog seeded"
        );
        Ok(Self::with_items(items))
    }

    /// Inserts or replaces an item.
    pub async fn upsert(&self, item: StockItem) {
        self.items.write().await.insert(item.item_id.clone(), item);
    }

    /// Sets the remaining quantity of an existing item.
    ///
    /// Returns false if the item is unknown.
    pub async fn set_quantity(&self, item_id: &ItemId, quantity: u32) -> bool {
        match self.items.write().await.get_mut(item_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Returns the number of items in the catalog.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get(&self, item_id: &ItemId) -> Result<Option<StockItem>> {
        Ok(self.items.read().await.get(item_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogError;
    use common::Dimensions;

    fn item(id: &str, quantity: u32) -> StockItem {
        StockItem::new(id, "Part", quantity, Dimensions::new(10.0, 10.0, 10.0), 1.0)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert(item("SKU-001", 3)).await;

        let found = catalog.get(&ItemId::new("SKU-001")).await.unwrap();
        assert_eq!(found.unwrap().quantity, 3);
        assert!(catalog.get(&ItemId::new("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_quantity() {
        let catalog = InMemoryCatalog::with_items([item("SKU-001", 3)]);
        assert!(catalog.set_quantity(&ItemId::new("SKU-001"), 1).await);
        assert!(!catalog.set_quantity(&ItemId::new("SKU-404"), 1).await);

        let found = catalog.get(&ItemId::new("SKU-001")).await.unwrap().unwrap();
        assert!(found.is_singleton_stock());
    }

    #[tokio::test]
    async fn test_get_many_preserves_order_and_reports_missing() {
        let catalog = InMemoryCatalog::with_items([item("A", 1), item("B", 2)]);

        let items = catalog
            .get_many(&[ItemId::new("B"), ItemId::new("A")])
            .await
            .unwrap();
        assert_eq!(items[0].item_id.as_str(), "B");
        assert_eq!(items[1].item_id.as_str(), "A");

        let err = catalog
            .get_many(&[ItemId::new("A"), ItemId::new("C")])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ItemNotFound(id) if id.as_str() == "C"));
    }
}
