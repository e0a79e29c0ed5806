//! Order read endpoints for buyers and suppliers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::{BuyerId, OrderId, SupplierId};
use domain::{Order, OrderItem};
use fulfillment::{OrderLineView, OrderView};
use order_store::OrderStore;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: String,
    pub supplier_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub total: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    /// Absent when the product no longer exists in the catalog.
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: i64,
    /// Absent when price times quantity does not fit in cents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_total_cents: Option<i64>,
}

impl OrderResponse {
    fn build(order: &Order, items: Vec<OrderItemResponse>) -> Self {
        Self {
            id: order.id.to_string(),
            buyer_id: order.buyer_id.to_string(),
            supplier_id: order.supplier_id.to_string(),
            status: order.status.to_string(),
            items,
            total_cents: order.total_amount.cents(),
            total: order.total_amount.to_string(),
            created_at: order.created_at,
        }
    }
}

impl OrderItemResponse {
    fn build(item: &OrderItem, product_name: Option<String>) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            product_name,
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            line_total_cents: item.total_price().ok().map(|total| total.cents()),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| OrderItemResponse::build(item, None))
            .collect();
        Self::build(order, items)
    }
}

impl From<OrderView> for OrderResponse {
    fn from(view: OrderView) -> Self {
        let items = view
            .lines
            .into_iter()
            .map(|OrderLineView { item, product }| {
                OrderItemResponse::build(&item, product.map(|p| p.name))
            })
            .collect();
        Self::build(&view.order, items)
    }
}

// -- Handlers --

/// GET /orders/{id}: load one order with product details.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let view = state
        .queries
        .get_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(view.into()))
}

/// GET /buyers/{id}/orders: every order a buyer placed, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_buyer<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let buyer_id: BuyerId = parse_id(&id, "buyer")?;
    let views = state.queries.list_for_buyer(buyer_id).await?;
    Ok(Json(views.into_iter().map(OrderResponse::from).collect()))
}

/// GET /suppliers/{id}/orders: every order addressed to a supplier, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_supplier<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let supplier_id: SupplierId = parse_id(&id, "supplier")?;
    let views = state.queries.list_for_supplier(supplier_id).await?;
    Ok(Json(views.into_iter().map(OrderResponse::from).collect()))
}

fn parse_id<T: std::str::FromStr>(id: &str, kind: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} ID format: {e}")))
}
