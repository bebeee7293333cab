//! HTTP route handlers.

pub mod admin;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use domain::{AdminService, CartService, CatalogService, OrderService};
use store::Datastore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Datastore> {
    pub store: S,
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub admin: AdminService<S>,
}

impl<S: Datastore + Clone> AppState<S> {
    /// Builds the full service stack over one datastore.
    pub fn new(store: S) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            admin: AdminService::new(store.clone()),
            store,
        }
    }
}

/// Parses a path segment as a UUID-backed identifier.
pub(crate) fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {what}: {raw}")))
}
