//! Public catalog endpoints: listings, product detail and reviews.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use domain::CatalogFilter;
use serde::{Deserialize, Serialize};
use store::{Datastore, Product, Review};

use super::AppState;
use crate::error::ApiError;
use crate::extract::Identity;

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub price_cents: i64,
    pub stock: u32,
    pub category_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub images: Vec<String>,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            slug: p.slug.clone(),
            price_cents: p.price.cents(),
            stock: p.stock,
            category_id: p.category_id.to_string(),
            active: p.active,
            created_at: p.created_at,
            images: p.images.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct ListingResponse {
    pub items: Vec<ProductResponse>,
    pub total: u64,
    /// Set when the datastore was unreachable and the listing was
    /// served empty rather than failing the page.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: String,
    pub user_id: String,
    pub rating: u8,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for ReviewResponse {
    fn from(r: &Review) -> Self {
        Self {
            id: r.id.to_string(),
            user_id: r.user_id.to_string(),
            rating: r.rating,
            content: r.content.clone(),
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub reviews: Vec<ReviewResponse>,
}

#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub content: String,
}

// -- Handlers --

/// GET /products — list active, in-stock products.
///
/// A datastore failure degrades to an empty listing so the storefront
/// page still renders.
#[tracing::instrument(skip(state))]
pub async fn list<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<CatalogFilter>,
) -> Json<ListingResponse> {
    match state.catalog.list(&filter).await {
        Ok(page) => Json(ListingResponse {
            items: page.items.iter().map(ProductResponse::from).collect(),
            total: page.total,
            degraded: false,
        }),
        Err(err) => {
            tracing::warn!(error = %err, "catalog listing degraded to empty");
            Json(ListingResponse {
                items: Vec::new(),
                total: 0,
                degraded: true,
            })
        }
    }
}

/// GET /products/:slug — product detail with reviews.
#[tracing::instrument(skip(state))]
pub async fn detail<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetailResponse>, ApiError> {
    let (product, reviews) = state.catalog.product_detail(&slug).await?;
    Ok(Json(ProductDetailResponse {
        product: ProductResponse::from(&product),
        reviews: reviews.iter().map(ReviewResponse::from).collect(),
    }))
}

/// GET /categories — list all categories, degrading to empty on
/// datastore failure.
#[tracing::instrument(skip(state))]
pub async fn categories<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<CategoryResponse>> {
    match state.catalog.categories().await {
        Ok(categories) => Json(
            categories
                .iter()
                .map(|c| CategoryResponse {
                    id: c.id.to_string(),
                    name: c.name.clone(),
                })
                .collect(),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "category listing degraded to empty");
            Json(Vec::new())
        }
    }
}

/// POST /products/:slug/reviews — post a review as the authenticated
/// user.
#[tracing::instrument(skip(state, req))]
pub async fn post_review<S: Datastore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(slug): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<(axum::http::StatusCode, Json<ReviewResponse>), ApiError> {
    let review = state
        .catalog
        .post_review(requester.user_id, &slug, req.rating, req.content)
        .await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(ReviewResponse::from(&review)),
    ))
}
