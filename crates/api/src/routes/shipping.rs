//! Shipping quote and carrier pricing endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use catalog::{Catalog, StockItem};
use common::{ItemId, Money};
use reservations::{ReservationError, ReservationStore};
use serde::Deserialize;
use shipping::{PackingLine, PricingSnapshot, ShippingQuote};

use super::AppState;
use super::cart::parse_item_id;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct QuoteLineRequest {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub lines: Vec<QuoteLineRequest>,
    /// Order subtotal used for the free-shipping check. Computed from
    /// catalog prices when omitted.
    pub subtotal_cents: Option<i64>,
}

/// POST /shipping/quote — cheapest carrier and format for a cart.
///
/// Weights and dimensions are resolved from the catalog.
#[tracing::instrument(skip(state, req), fields(lines = req.lines.len()))]
pub async fn quote<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<ShippingQuote>, ApiError> {
    let item_ids = req
        .lines
        .iter()
        .map(|line| parse_item_id(&line.item_id))
        .collect::<Result<Vec<ItemId>, _>>()?;
    let items = state.reservations.catalog().get_many(&item_ids).await?;
    check_stock(&items, &req.lines)?;

    let lines: Vec<PackingLine> = items
        .iter()
        .zip(&req.lines)
        .map(|(item, line)| {
            PackingLine::new(
                item.item_id.clone(),
                item.weight_kg,
                item.dimensions,
                line.quantity,
            )
        })
        .collect();

    let subtotal = match req.subtotal_cents {
        Some(cents) if cents < 0 => {
            return Err(ApiError::BadRequest(
                "subtotal_cents must not be negative".to_string(),
            ));
        }
        Some(cents) => Money::from_cents(cents),
        None => items
            .iter()
            .zip(&req.lines)
            .map(|(item, line)| item.unit_price.multiply(line.quantity))
            .sum(),
    };

    let quote = state.shipping.quote(&lines, subtotal).await?;
    Ok(Json(quote))
}

/// Rejects inactive items and quantities the catalog cannot cover. The
/// engine only packs and prices, so this is the last stock check before it.
///
/// Lines naming the same item are summed before comparing with stock.
fn check_stock(items: &[StockItem], lines: &[QuoteLineRequest]) -> Result<(), ReservationError> {
    let mut requested: HashMap<&ItemId, u32> = HashMap::new();
    for (item, line) in items.iter().zip(lines) {
        if !item.active {
            return Err(ReservationError::ItemInactive(item.item_id.clone()));
        }
        let total = requested.entry(&item.item_id).or_default();
        *total = total.saturating_add(line.quantity);
        if item.quantity == 0 || item.quantity < *total {
            return Err(ReservationError::OutOfStock {
                item_id: item.item_id.clone(),
                available: item.quantity,
                requested: *total,
            });
        }
    }
    Ok(())
}

/// GET /shipping/carriers — the pricing snapshot currently in effect.
pub async fn carriers<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<PricingSnapshot> {
    let snapshot = state.pricing.snapshot().await;
    Json(PricingSnapshot::clone(&snapshot))
}

/// POST /shipping/carriers/reload — drop the cache and load pricing again.
#[tracing::instrument(skip(state))]
pub async fn reload<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<PricingSnapshot> {
    let snapshot = state.pricing.reload().await;
    Json(PricingSnapshot::clone(&snapshot))
}
