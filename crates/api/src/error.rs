//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ProductId;
use fulfillment::FulfillmentError;
use order_store::StoreError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The caller did not identify itself.
    Unauthorized(String),
    /// The caller is not allowed to perform the operation.
    Forbidden(String),
    /// Checkout or query failure.
    Fulfillment(FulfillmentError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<ProductId>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, product_id) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::Fulfillment(err) => {
                let status = fulfillment_status(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                }
                (status, err.to_string(), err.product_id())
            }
        };

        let body = ErrorBody {
            error: message,
            product_id,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_status(err: &FulfillmentError) -> StatusCode {
    match err {
        FulfillmentError::EmptyCheckout
        | FulfillmentError::InvalidQuantity { .. }
        | FulfillmentError::QuantityOverflow { .. }
        | FulfillmentError::Domain(_) => StatusCode::BAD_REQUEST,
        FulfillmentError::ProductNotFound { .. } => StatusCode::NOT_FOUND,
        FulfillmentError::InsufficientStock { .. }
        | FulfillmentError::SupplierMismatch { .. }
        | FulfillmentError::TransactionConflict { .. }
        | FulfillmentError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        FulfillmentError::CheckoutTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        FulfillmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}
