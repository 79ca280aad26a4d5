//! HTTP API server for the parts store reservation and shipping core.
//!
//! Thin adapter over [`reservations`] and [`shipping`], with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use ::reservations::{ReservationManager, ReservationStore};
use ::shipping::{BundledPricingSource, CarrierPricingTable, FilePricingSource, PricingSource};
use axum::Router;
use axum::routing::{get, post};
use catalog::InMemoryCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ReservationStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/cart/items", post(routes::cart::add::<S>))
        .route(
            "/cart/items/{item_id}",
            axum::routing::delete(routes::cart::remove::<S>),
        )
        .route(
            "/cart/items/{item_id}/refresh",
            post(routes::cart::refresh::<S>),
        )
        .route(
            "/checkout/complete",
            post(routes::cart::complete_checkout::<S>),
        )
        .route(
            "/items/{item_id}/reservation",
            get(routes::reservations::status::<S>),
        )
        .route(
            "/reservations/sweep",
            post(routes::reservations::sweep::<S>),
        )
        .route("/shipping/quote", post(routes::shipping::quote::<S>))
        .route("/shipping/carriers", get(routes::shipping::carriers::<S>))
        .route(
            "/shipping/carriers/reload",
            post(routes::shipping::reload::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the carrier pricing table: the configured file if any, otherwise
/// the bundled document.
pub fn create_pricing_table(config: &Config) -> Arc<CarrierPricingTable> {
    let source: Arc<dyn PricingSource> = match &config.carrier_config_path {
        Some(path) => Arc::new(FilePricingSource::new(path)),
        None => Arc::new(BundledPricingSource),
    };
    Arc::new(CarrierPricingTable::new(source, config.pricing_cache_ttl))
}

/// Creates the application state over the given store and catalog.
pub fn create_state<S: ReservationStore + 'static>(
    store: S,
    catalog: InMemoryCatalog,
    config: &Config,
) -> Arc<AppState<S>> {
    let manager = ReservationManager::new(store, catalog).with_ttl(config.reservation_ttl);
    Arc::new(AppState::new(
        manager,
        create_pricing_table(config),
        config.sweep_interval,
    ))
}

/// Creates the default application state: empty catalog, bundled carrier
/// pricing, default lease and sweep timings.
pub fn create_default_state<S: ReservationStore + 'static>(store: S) -> Arc<AppState<S>> {
    create_state(store, InMemoryCatalog::new(), &Config::default())
}
