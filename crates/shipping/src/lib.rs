//! Shipping for the parts store.
//!
//! - [`CarrierPricingTable`] caches carrier profiles with a TTL and falls
//!   back to a bundled document when the configured source fails.
//! - [`plan`] packs cart lines into parcels for one set of limits.
//! - [`ShippingCostEngine`] picks the cheapest carrier and format, then
//!   applies markup and free shipping.

pub mod engine;
pub mod error;
pub mod planner;
pub mod pricing;
pub mod profile;

pub use engine::{MAX_UNITS_PER_QUOTE, PricedParcel, ShippingCostEngine, ShippingQuote, quote_with};
pub use error::{PricingError, Result, ShippingError};
pub use planner::{
    BoundingBox, Infeasible, InfeasibleReason, PackingLine, Parcel, ParcelContent, ParcelPlan, plan,
};
pub use pricing::{
    BundledPricingSource, CarrierPricingTable, DEFAULT_PRICING_TTL, FilePricingSource,
    InMemoryPricingSource, PricingOrigin, PricingSnapshot, PricingSource, bundled_default,
};
pub use profile::{
    CarrierDocument, CarrierFormat, CarrierProfile, FreeShipping, ParcelLimits, PriceStep,
    PriceTable,
};
