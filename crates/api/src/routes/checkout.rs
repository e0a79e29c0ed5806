//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use common::ProductId;
use domain::OrderRequestItem;
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::BuyerIdentity;
use crate::routes::orders::OrderResponse;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub orders: Vec<OrderResponse>,
}

/// POST /checkout: place one order per supplier for the caller's items.
#[tracing::instrument(skip(state, identity, payload), fields(buyer_id = %identity.buyer_id))]
pub async fn create<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: BuyerIdentity,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let items: Vec<OrderRequestItem> = req
        .items
        .iter()
        .map(|item| OrderRequestItem::new(item.product_id, item.quantity))
        .collect();

    let orders = state.checkout.checkout(identity.buyer_id, &items).await?;

    let response = CheckoutResponse {
        orders: orders.iter().map(OrderResponse::from).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}
