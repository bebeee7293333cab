//! Staff-only back-office endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, OrderStatus, ProductId, Role, UserId};
use domain::ProductDraft;
use serde::{Deserialize, Serialize};
use store::{Datastore, ProductPatch, User};

use super::orders::OrderResponse;
use super::products::{CategoryResponse, ProductResponse};
use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::Identity;

// -- Request and response types --

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

// -- Handlers --

/// POST /admin/products — add a product to the catalog.
#[tracing::instrument(skip(state, draft))]
pub async fn create_product<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state.admin.create_product(&requester, draft).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// PATCH /admin/products/:id — partial product update.
#[tracing::instrument(skip(state, patch))]
pub async fn update_product<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product id")?;
    let product = state
        .admin
        .update_product(&requester, product_id, patch)
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// POST /admin/categories — add a category.
#[tracing::instrument(skip(state, req))]
pub async fn create_category<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.admin.create_category(&requester, &req.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            id: category.id.to_string(),
            name: category.name,
        }),
    ))
}

/// GET /admin/orders — every order in the system, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_orders<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.admin.list_orders(&requester).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// POST /admin/orders/:id/status — move an order to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn set_order_status<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let status = OrderStatus::from_name(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid status: {}", req.status)))?;
    let detail = state
        .admin
        .set_order_status(&requester, order_id, status)
        .await?;
    Ok(Json(OrderResponse::from(&detail)))
}

/// GET /admin/users — every account; super admin only.
#[tracing::instrument(skip(state))]
pub async fn list_users<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.admin.list_users(&requester).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// PUT /admin/users/:id/role — replace an account's role; super admin
/// only.
#[tracing::instrument(skip(state, req))]
pub async fn set_user_role<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id: UserId = parse_id(&id, "user id")?;
    let user = state
        .admin
        .set_user_role(&requester, user_id, req.role)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}
