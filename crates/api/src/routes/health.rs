//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use reservations::ReservationStore;
use serde::Serialize;
use shipping::PricingOrigin;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub reservation_ttl_secs: i64,
    pub pricing_origin: PricingOrigin,
    pub pricing_version: u64,
}

/// GET /health — liveness plus the pricing table in effect.
///
/// A bundled-default origin means the carrier source is unreachable but
/// quotes are still served.
pub async fn check<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    let snapshot = state.pricing.snapshot().await;
    Json(HealthResponse {
        status: "ok",
        reservation_ttl_secs: state.reservations.ttl().num_seconds(),
        pricing_origin: snapshot.origin,
        pricing_version: snapshot.version,
    })
}
