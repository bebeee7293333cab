//! Cart endpoints for the authenticated shopper.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CartItemId, ProductId};
use serde::{Deserialize, Serialize};
use store::{CartDetail, Datastore};

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Identity;

// -- Request and response types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub qty: u32,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub slug: String,
    pub qty: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    /// Current stock, so the storefront can cap the quantity picker.
    pub stock: u32,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub items: Vec<CartLineResponse>,
    pub total_cents: i64,
}

impl From<&CartDetail> for CartResponse {
    fn from(detail: &CartDetail) -> Self {
        Self {
            id: detail.cart.id.to_string(),
            items: detail
                .lines
                .iter()
                .map(|line| CartLineResponse {
                    id: line.item.id.to_string(),
                    product_id: line.item.product_id.to_string(),
                    product_name: line.product.name.clone(),
                    slug: line.product.slug.clone(),
                    qty: line.item.qty,
                    unit_price_cents: line.product.price.cents(),
                    subtotal_cents: line.subtotal().cents(),
                    stock: line.product.stock,
                })
                .collect(),
            total_cents: detail.total().cents(),
        }
    }
}

// -- Handlers --

/// GET /cart — the shopper's cart, created empty on first touch.
#[tracing::instrument(skip(state))]
pub async fn view<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
) -> Result<Json<CartResponse>, ApiError> {
    let detail = state.carts.view(requester.user_id).await?;
    Ok(Json(CartResponse::from(&detail)))
}

/// POST /cart/items — add a quantity of a product.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let product_id: ProductId = parse_id(&req.product_id, "product_id")?;
    state
        .carts
        .add_item(requester.user_id, product_id, req.qty)
        .await?;
    let detail = state.carts.view(requester.user_id).await?;
    Ok((StatusCode::CREATED, Json(CartResponse::from(&detail))))
}

/// DELETE /cart/items/:id — remove one line from the shopper's cart.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let item_id: CartItemId = parse_id(&id, "cart item id")?;
    state.carts.remove_item(requester.user_id, item_id).await?;
    let detail = state.carts.view(requester.user_id).await?;
    Ok(Json(CartResponse::from(&detail)))
}

/// DELETE /cart — empty the shopper's cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
) -> Result<StatusCode, ApiError> {
    state.carts.clear(requester.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
