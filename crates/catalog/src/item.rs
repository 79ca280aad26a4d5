use common::{Dimensions, ItemId, Money};
use serde::{Deserialize, Serialize};

/// A sellable part as seen by the reservation and shipping core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub item_id: ItemId,
    pub name: String,
    /// Units currently available for sale.
    pub quantity: u32,
    pub dimensions: Dimensions,
    pub weight_kg: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub unit_price: Money,
}

fn default_active() -> bool {
    true
}

impl StockItem {
    /// Creates an active item with a zero price.
    pub fn new(
        item_id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: u32,
        dimensions: Dimensions,
        weight_kg: f64,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            quantity,
            dimensions,
            weight_kg,
            active: true,
            unit_price: Money::zero(),
        }
    }

    pub fn with_price(mut self, unit_price: Money) -> Self {
        self.unit_price = unit_price;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// True when only the last unit is left; such items are leased to one
    /// cart at a time.
    pub fn is_singleton_stock(&self) -> bool {
        self.quantity == 1
    }
}
