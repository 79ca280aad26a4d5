//! Lease inspection and on-demand reclamation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use reservations::{Reservation, ReservationStore, SweepReport};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::cart::{parse_holder_id, parse_item_id};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ReservationQuery {
    pub exclude_holder: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReservationStatusResponse {
    pub held_by_other: bool,
    pub reservation: Option<Reservation>,
}

/// GET /items/{item_id}/reservation?exclude_holder= — live lease on an
/// item, and whether it blocks the given holder.
///
/// Without `exclude_holder` any live lease counts as held by another.
#[tracing::instrument(skip(state, query))]
pub async fn status<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(item_id): Path<String>,
    Query(query): Query<ReservationQuery>,
) -> Result<Json<ReservationStatusResponse>, ApiError> {
    let item_id = parse_item_id(&item_id)?;
    let reservation = state.reservations.active_reservation(&item_id).await?;

    let held_by_other = match query.exclude_holder.as_deref() {
        Some(raw) => {
            let holder_id = parse_holder_id(raw)?;
            reservation
                .as_ref()
                .is_some_and(|r| r.holder_id != holder_id)
        }
        None => reservation.is_some(),
    };

    Ok(Json(ReservationStatusResponse {
        held_by_other,
        reservation,
    }))
}

/// POST /reservations/sweep — reclaim expired leases now.
#[tracing::instrument(skip(state))]
pub async fn sweep<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SweepReport>, ApiError> {
    let report = state.scheduler.sweep_now().await?;
    Ok(Json(report))
}
