//! Domain layer for the canteen storefront.
//!
//! Four services sit between the HTTP surface and the datastore:
//!
//! * [`CatalogService`] - public product browsing and reviews
//! * [`CartService`] - a shopper's cart
//! * [`OrderService`] - checkout, cancellation and order queries
//! * [`AdminService`] - staff-only catalog, order and user management
//!
//! Each service is generic over [`store::Datastore`], so the same code
//! runs against the in-memory store in tests and PostgreSQL in
//! production.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod orders;

pub use admin::{AdminService, ProductDraft};
pub use cart::CartService;
pub use catalog::{CatalogFilter, CatalogService, resolve_category, slugify};
pub use error::{DomainError, Result};
pub use orders::{Checkout, OrderService, Requester};
