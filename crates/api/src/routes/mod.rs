//! HTTP handlers and the state they share.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod reservations;
pub mod shipping;

use std::sync::Arc;

use ::reservations::{ReclaimScheduler, ReservationManager, ReservationStore};
use ::shipping::{CarrierPricingTable, ShippingCostEngine};
use catalog::InMemoryCatalog;

/// Reservation manager over the in-memory catalog.
pub type Manager<S> = ReservationManager<S, InMemoryCatalog>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ReservationStore> {
    pub reservations: Arc<Manager<S>>,
    pub scheduler: ReclaimScheduler<S, InMemoryCatalog>,
    pub pricing: Arc<CarrierPricingTable>,
    pub shipping: ShippingCostEngine,
}

impl<S: ReservationStore + 'static> AppState<S> {
    pub fn new(
        manager: Manager<S>,
        pricing: Arc<CarrierPricingTable>,
        sweep_interval: std::time::Duration,
    ) -> Self {
        let reservations = Arc::new(manager);
        Self {
            scheduler: ReclaimScheduler::new(Arc::clone(&reservations), sweep_interval),
            shipping: ShippingCostEngine::new(Arc::clone(&pricing)),
            reservations,
            pricing,
        }
    }
}
