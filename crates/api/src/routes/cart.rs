//! Cart admission, release and checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{HolderId, ItemId};
use reservations::{Admission, Reservation, ReservationStore};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_id: String,
    pub holder_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct HolderQuery {
    pub holder_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub holder_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub holder_id: String,
    pub item_ids: Vec<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct AdmissionResponse {
    pub item_id: ItemId,
    pub holder_id: HolderId,
    pub quantity: u32,
    /// True when the item is on its last unit and now leased to the holder.
    pub reserved: bool,
    pub reservation: Option<Reservation>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub extended: bool,
    pub reservation: Option<Reservation>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub holder_id: HolderId,
    pub released: usize,
}

// -- Handlers --

/// POST /cart/items — admit an item into a cart, leasing it if it is the
/// last unit.
#[tracing::instrument(skip(state, req), fields(item_id = %req.item_id, holder_id = %req.holder_id))]
pub async fn add<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    let item_id = parse_item_id(&req.item_id)?;
    let holder_id = parse_holder_id(&req.holder_id)?;

    let admission = state
        .reservations
        .admit(&item_id, &holder_id, req.quantity)
        .await?;

    let reservation = match admission {
        Admission::Reserved(reservation) => Some(reservation),
        Admission::Unrestricted => None,
    };

    Ok(Json(AdmissionResponse {
        item_id,
        holder_id,
        quantity: req.quantity,
        reserved: reservation.is_some(),
        reservation,
    }))
}

/// DELETE /cart/items/{item_id}?holder_id= — drop the holder's lease.
/// Idempotent.
#[tracing::instrument(skip(state, query))]
pub async fn remove<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(item_id): Path<String>,
    Query(query): Query<HolderQuery>,
) -> Result<StatusCode, ApiError> {
    let item_id = parse_item_id(&item_id)?;
    let holder_id = parse_holder_id(&query.holder_id)?;

    state.reservations.release(&item_id, &holder_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/items/{item_id}/refresh — extend the holder's live lease
/// while the cart is re-validated.
#[tracing::instrument(skip(state, req))]
pub async fn refresh<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(item_id): Path<String>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let item_id = parse_item_id(&item_id)?;
    let holder_id = parse_holder_id(&req.holder_id)?;

    let reservation = state.reservations.extend(&item_id, &holder_id).await?;
    Ok(Json(RefreshResponse {
        extended: reservation.is_some(),
        reservation,
    }))
}

/// POST /checkout/complete — release every lease the holder had on the
/// ordered items.
#[tracing::instrument(skip(state, req), fields(holder_id = %req.holder_id))]
pub async fn complete_checkout<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let holder_id = parse_holder_id(&req.holder_id)?;
    let item_ids = req
        .item_ids
        .iter()
        .map(|id| parse_item_id(id))
        .collect::<Result<Vec<_>, _>>()?;

    let released = state.reservations.release_all(&holder_id, &item_ids).await?;
    Ok(Json(CheckoutResponse {
        holder_id,
        released,
    }))
}

pub(crate) fn parse_item_id(raw: &str) -> Result<ItemId, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("item_id is required".to_string()));
    }
    Ok(ItemId::new(trimmed))
}

pub(crate) fn parse_holder_id(raw: &str) -> Result<HolderId, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("holder_id is required".to_string()));
    }
    Ok(HolderId::new(trimmed))
}
