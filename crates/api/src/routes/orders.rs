//! Order endpoints: checkout, queries and cancellation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::Checkout;
use store::{Datastore, OrderDetail};
use serde::Serialize;

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Identity;

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub qty: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    pub address: String,
    pub payment_method: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineResponse>,
}

impl From<&OrderDetail> for OrderResponse {
    fn from(detail: &OrderDetail) -> Self {
        Self {
            id: detail.order.id.to_string(),
            status: detail.order.status.as_str().to_string(),
            address: detail.order.address.clone(),
            payment_method: detail.order.payment_method.clone(),
            total_cents: detail.order.total.cents(),
            created_at: detail.order.created_at,
            items: detail
                .lines
                .iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    product_name: line.product_name.clone(),
                    qty: line.qty,
                    unit_price_cents: line.unit_price.cents(),
                    subtotal_cents: line.subtotal().cents(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — check out the shopper's entire cart.
#[tracing::instrument(skip(state, checkout))]
pub async fn place<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Json(checkout): Json<Checkout>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let detail = state
        .orders
        .place_order(requester.user_id, checkout)
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&detail))))
}

/// GET /orders — the shopper's own orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_mine<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.my_orders(requester.user_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id — one order; owner or staff only.
#[tracing::instrument(skip(state))]
pub async fn get<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let detail = state.orders.get_order(&requester, order_id).await?;
    Ok(Json(OrderResponse::from(&detail)))
}

/// POST /orders/:id/cancel — cancel the shopper's own pending order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let detail = state.orders.cancel_order(&requester, order_id).await?;
    Ok(Json(OrderResponse::from(&detail)))
}
