//! Datastore boundary for the canteen storefront.
//!
//! The [`Datastore`] trait is the only way the rest of the workspace
//! touches persistent state. Two implementations are provided:
//! [`MemoryStore`] for tests and zero-config runs, and [`PostgresStore`]
//! backed by sqlx. Multi-row workflows (order placement, cancellation)
//! are atomic in both: a single write-lock critical section in memory, a
//! single transaction in PostgreSQL.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use records::{
    Cart, CartDetail, CartItem, CartLine, Category, CategorySelector, CheckoutLine, NewProduct,
    NewReview, NewUser, Order, OrderDetail, OrderLine, PlaceOrder, Product, ProductPage,
    ProductPatch, ProductQuery, Review, StockShortage, User,
};
pub use store::Datastore;
