//! HTTP API server with observability for the canteen storefront.
//!
//! Provides REST endpoints for catalog browsing, carts, checkout and
//! the staff back office, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Datastore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Datastore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Public catalog
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{slug}", get(routes::products::detail::<S>))
        .route(
            "/products/{slug}/reviews",
            post(routes::products::post_review::<S>),
        )
        .route("/categories", get(routes::products::categories::<S>))
        // Shopper cart
        .route(
            "/cart",
            get(routes::cart::view::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/items/{id}", delete(routes::cart::remove_item::<S>))
        // Orders
        .route(
            "/orders",
            post(routes::orders::place::<S>).get(routes::orders::list_mine::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        // Back office
        .route("/admin/products", post(routes::admin::create_product::<S>))
        .route(
            "/admin/products/{id}",
            patch(routes::admin::update_product::<S>),
        )
        .route(
            "/admin/categories",
            post(routes::admin::create_category::<S>),
        )
        .route("/admin/orders", get(routes::admin::list_orders::<S>))
        .route(
            "/admin/orders/{id}/status",
            post(routes::admin::set_order_status::<S>),
        )
        .route("/admin/users", get(routes::admin::list_users::<S>))
        .route(
            "/admin/users/{id}/role",
            put(routes::admin::set_user_role::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over one datastore.
pub fn create_default_state<S: Datastore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}
