//! Shared types for the canteen storefront.
//!
//! Identifier newtypes, integer-cent money, the normalized authorization
//! role, and the order status machine. Everything here is plain data with
//! no I/O so every other crate can depend on it.

mod ids;
mod money;
mod role;
mod status;

pub use ids::{CartId, CartItemId, CategoryId, OrderId, ProductId, ReviewId, UserId};
pub use money::Money;
pub use role::Role;
pub use status::OrderStatus;
