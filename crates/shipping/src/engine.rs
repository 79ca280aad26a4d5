//! Cheapest-carrier shipping quotes.

use std::sync::Arc;
use std::time::Instant;

use common::{ItemId, Money};
use serde::Serialize;

use crate::error::{Result, ShippingError};
use crate::planner::{self, PackingLine, Parcel};
use crate::pricing::{CarrierPricingTable, PricingSnapshot};

/// Most units a single quote will pack. Packing is quadratic in the unit
/// count and runs once per carrier format.
pub const MAX_UNITS_PER_QUOTE: u32 = 1_000;

/// A parcel together with its step price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedParcel {
    #[serde(flatten)]
    pub parcel: Parcel,
    pub price: Money,
}

/// The selected shipping option for a cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingQuote {
    pub carrier_id: String,
    pub carrier_name: String,
    pub format: String,
    /// Sum of parcel prices before markup.
    pub base_cost: Money,
    /// What the customer pays: base plus markup, or zero when free.
    pub final_cost: Money,
    pub markup_percent: u32,
    pub parcels: Vec<PricedParcel>,
    pub is_free_shipping: bool,
    /// Configured threshold, when free shipping is enabled.
    pub free_shipping_threshold: Option<Money>,
    /// Generation of the pricing table the quote was computed from.
    pub pricing_version: u64,
}

impl ShippingQuote {
    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }
}

/// Quotes carts against the current carrier pricing.
#[derive(Clone)]
pub struct ShippingCostEngine {
    pricing: Arc<CarrierPricingTable>,
}

impl ShippingCostEngine {
    pub fn new(pricing: Arc<CarrierPricingTable>) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &CarrierPricingTable {
        &self.pricing
    }

    /// Quotes the cheapest way to ship `lines`.
    ///
    /// Lines must already be validated for stock by the caller; only
    /// packing and cost are computed here.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len(), subtotal = %subtotal))]
    pub async fn quote(&self, lines: &[PackingLine], subtotal: Money) -> Result<ShippingQuote> {
        let started = Instant::now();
        let snapshot = self.pricing.snapshot().await;
        let result = quote_with(&snapshot, lines, subtotal);

        metrics::histogram!("shipping_quote_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(quote) => {
                metrics::counter!("shipping_quotes_total").increment(1);
                if quote.is_free_shipping {
                    metrics::counter!("shipping_free_quotes_total").increment(1);
                }
                tracing::info!(
                    carrier_id = %quote.carrier_id,
                    format = %quote.format,
                    parcels = quote.parcel_count(),
                    base_cost = %quote.base_cost,
                    final_cost = %quote.final_cost,
                    free = quote.is_free_shipping,
                    "shipping quoted"
                );
            }
            Err(e) => {
                metrics::counter!("shipping_quote_failures_total").increment(1);
                tracing::info!(error = %e, "shipping quote rejected");
            }
        }
        result
    }
}

struct Candidate<'a> {
    carrier_id: &'a str,
    carrier_name: &'a str,
    format: &'a str,
    cost: Money,
    parcels: Vec<PricedParcel>,
}

/// Prices `lines` against one pricing snapshot. Pure; no I/O.
pub fn quote_with(
    snapshot: &PricingSnapshot,
    lines: &[PackingLine],
    subtotal: Money,
) -> Result<ShippingQuote> {
    validate_lines(lines)?;

    let mut best: Option<Candidate<'_>> = None;
    // Item rejected by each infeasible candidate; `None` when the candidate
    // failed on price coverage rather than on a specific unit.
    let mut rejections: Vec<Option<ItemId>> = Vec::new();

    for carrier in snapshot.carriers() {
        for format in &carrier.formats {
            let limits = carrier.effective_limits(format);
            let plan = match planner::plan(lines, &limits) {
                Ok(plan) => plan,
                Err(infeasible) => {
                    tracing::debug!(
                        carrier_id = %carrier.carrier_id,
                        format = %format.name,
                        item_id = %infeasible.item_id,
                        reason = ?infeasible.reason,
                        "format cannot carry item"
                    );
                    rejections.push(Some(infeasible.item_id));
                    continue;
                }
            };

            let priced: Option<Vec<PricedParcel>> = plan
                .parcels
                .into_iter()
                .map(|parcel| {
                    format.price_steps.price_for(parcel.weight_kg).map(|price| PricedParcel {
                        parcel,
                        price,
                    })
                })
                .collect();
            let Some(parcels) = priced else {
                tracing::debug!(
                    carrier_id = %carrier.carrier_id,
                    format = %format.name,
                    "parcel weight beyond price table"
                );
                rejections.push(None);
                continue;
            };

            let cost: Money = parcels.iter().map(|p| p.price).sum();
            // Strictly cheaper only: on ties the earlier declaration wins.
            if best.as_ref().is_none_or(|b| cost < b.cost) {
                best = Some(Candidate {
                    carrier_id: &carrier.carrier_id,
                    carrier_name: &carrier.name,
                    format: &format.name,
                    cost,
                    parcels,
                });
            }
        }
    }

    let Some(best) = best else {
        return Err(ShippingError::NoCarrierAvailable {
            item_id: common_rejection(&rejections),
        });
    };

    let markup_percent = snapshot.markup_percent();
    let free_shipping = snapshot.free_shipping();
    let is_free_shipping = free_shipping.applies_to(subtotal);
    let final_cost = if is_free_shipping {
        Money::zero()
    } else {
        best.cost.with_markup(markup_percent)
    };

    Ok(ShippingQuote {
        carrier_id: best.carrier_id.to_string(),
        carrier_name: best.carrier_name.to_string(),
        format: best.format.to_string(),
        base_cost: best.cost,
        final_cost,
        markup_percent,
        parcels: best.parcels,
        is_free_shipping,
        free_shipping_threshold: free_shipping.enabled.then_some(free_shipping.threshold),
        pricing_version: snapshot.version,
    })
}

/// The item every candidate rejected, if they all agree on one.
fn common_rejection(rejections: &[Option<ItemId>]) -> Option<ItemId> {
    let (first, rest) = rejections.split_first()?;
    let item = first.as_ref()?;
    rest.iter()
        .all(|other| other.as_ref() == Some(item))
        .then(|| item.clone())
}

fn validate_lines(lines: &[PackingLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(ShippingError::EmptyCart);
    }
    let mut units: u32 = 0;
    for line in lines {
        units = units.saturating_add(line.quantity);
        let reason = if line.quantity == 0 {
            Some("quantity must be positive")
        } else if !line.weight_kg.is_finite() || line.weight_kg < 0.0 {
            Some("weight must be a non-negative number")
        } else if !line.dimensions.is_valid() {
            Some("dimensions must be non-negative numbers")
        } else if units > MAX_UNITS_PER_QUOTE {
            Some("cart exceeds the unit limit for a shipping quote")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ShippingError::InvalidLine {
                item_id: line.item_id.clone(),
                reason: reason.to_string(),
            });
        }
    }
    Ok(())
}
