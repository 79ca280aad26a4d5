//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use reservations::ReservationError;
use serde_json::{Map, Value, json};
use shipping::ShippingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Reservation or admission failure.
    Reservation(ReservationError),
    /// Shipping quote failure.
    Shipping(ShippingError),
    /// Catalog lookup failure.
    Catalog(CatalogError),
}

struct ErrorBody {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Map<String, Value>,
}

impl ErrorBody {
    fn new(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            code,
            message,
            details: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::BadRequest(msg) => ErrorBody::new(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Reservation(err) => reservation_error_body(err),
            ApiError::Shipping(err) => shipping_error_body(err),
            ApiError::Catalog(err) => catalog_error_body(err),
        };

        if body.status.is_server_error() {
            tracing::error!(code = body.code, error = %body.message, "request failed");
        }

        let mut payload = json!({ "error": body.message, "code": body.code });
        if let Value::Object(fields) = &mut payload {
            fields.extend(body.details);
        }
        (body.status, axum::Json(payload)).into_response()
    }
}

fn reservation_error_body(err: ReservationError) -> ErrorBody {
    let message = err.to_string();
    match err {
        ReservationError::Busy {
            item_id,
            held_until,
        } => ErrorBody::new(StatusCode::CONFLICT, "item_temporarily_unavailable", message)
            .with("item_id", item_id.to_string())
            .with("held_until", held_until.to_rfc3339()),
        ReservationError::OutOfStock {
            item_id,
            available,
            requested,
        } => ErrorBody::new(StatusCode::CONFLICT, "out_of_stock", message)
            .with("item_id", item_id.to_string())
            .with("available", available)
            .with("requested", requested),
        ReservationError::ItemNotFound(item_id) => {
            ErrorBody::new(StatusCode::NOT_FOUND, "item_not_found", message)
                .with("item_id", item_id.to_string())
        }
        ReservationError::ItemInactive(item_id) => {
            ErrorBody::new(StatusCode::UNPROCESSABLE_ENTITY, "item_inactive", message)
                .with("item_id", item_id.to_string())
        }
        ReservationError::InvalidQuantity { item_id, .. } => {
            ErrorBody::new(StatusCode::BAD_REQUEST, "invalid_quantity", message)
                .with("item_id", item_id.to_string())
        }
        ReservationError::Catalog(err) => catalog_error_body(err),
        ReservationError::Contended(_)
        | ReservationError::Database(_)
        | ReservationError::Migration(_) => {
            ErrorBody::new(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", message)
        }
    }
}

fn shipping_error_body(err: ShippingError) -> ErrorBody {
    let message = err.to_string();
    match err {
        ShippingError::EmptyCart => ErrorBody::new(StatusCode::BAD_REQUEST, "empty_cart", message),
        ShippingError::InvalidLine { item_id, .. } => {
            ErrorBody::new(StatusCode::BAD_REQUEST, "invalid_line", message)
                .with("item_id", item_id.to_string())
        }
        ShippingError::NoCarrierAvailable { item_id } => ErrorBody::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "no_carrier_available",
            message,
        )
        .with("item_id", item_id.map(|id| id.to_string())),
    }
}

fn catalog_error_body(err: CatalogError) -> ErrorBody {
    let message = err.to_string();
    match err {
        CatalogError::ItemNotFound(item_id) => {
            ErrorBody::new(StatusCode::NOT_FOUND, "item_not_found", message)
                .with("item_id", item_id.to_string())
        }
        CatalogError::Io(_) | CatalogError::Parse(_) => {
            ErrorBody::new(StatusCode::SERVICE_UNAVAILABLE, "catalog_unavailable", message)
        }
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        ApiError::Reservation(err)
    }
}

impl From<ShippingError> for ApiError {
    fn from(err: ShippingError) -> Self {
        ApiError::Shipping(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}
