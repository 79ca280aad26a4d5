//! Shipping error types.

use common::ItemId;
use thiserror::Error;

/// Errors surfaced to callers of the shipping engine.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// The cart has no lines to ship.
    #[error("Cannot quote shipping for an empty cart")]
    EmptyCart,

    /// A line carries a quantity, weight or size that cannot be packed.
    #[error("Invalid line for item {item_id}: {reason}")]
    InvalidLine { item_id: ItemId, reason: String },

    /// No carrier format can ship the cart. Blocks checkout until the cart
    /// changes.
    #[error("{}", no_carrier_message(.item_id))]
    NoCarrierAvailable { item_id: Option<ItemId> },
}

fn no_carrier_message(item_id: &Option<ItemId>) -> String {
    match item_id {
        Some(id) => format!("No carrier can ship item {id}"),
        None => "No carrier can ship this cart".to_string(),
    }
}

/// Errors loading a carrier pricing document.
///
/// These never reach quote callers: the pricing table falls back to the
/// bundled document instead.
#[derive(Debug, Error)]
pub enum PricingError {
    /// The pricing source could not be read.
    #[error("Pricing source unavailable: {0}")]
    Unavailable(String),

    /// The document is not valid JSON for the expected schema.
    #[error("Pricing document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but violates a pricing rule.
    #[error("Invalid pricing document: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for PricingError {
    fn from(err: std::io::Error) -> Self {
        PricingError::Unavailable(err.to_string())
    }
}

/// Convenience type alias for shipping results.
pub type Result<T> = std::result::Result<T, ShippingError>;
