//! Error types for the domain layer.

use common::OrderStatus;
use store::{StockShortage, StoreError};
use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requester is not allowed to perform the operation.
    #[error("forbidden")]
    Forbidden,

    /// Adding to the cart would exceed the units currently in stock.
    #[error("only {available} in stock ({in_cart} already in cart, {requested} requested)")]
    OutOfStock {
        requested: u32,
        available: u32,
        in_cart: u32,
    },

    /// Checkout was attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A quantity outside the accepted range was supplied.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// A review rating outside 1 to 5 was supplied.
    #[error("invalid rating: {0}, must be between 1 and 5")]
    InvalidRating(u8),

    /// The order's current status does not permit the action.
    #[error("cannot {action} an order that is {status}")]
    InvalidTransition {
        status: OrderStatus,
        action: &'static str,
    },

    /// One or more checkout lines could not be satisfied from stock.
    #[error("insufficient stock for {} line(s)", .0.len())]
    InsufficientStock(Vec<StockShortage>),

    /// The datastore failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity } => DomainError::NotFound(entity),
            StoreError::InsufficientStock { shortages } => {
                DomainError::InsufficientStock(shortages)
            }
            StoreError::OrderNotPending { status, .. } => DomainError::InvalidTransition {
                status,
                action: "cancel",
            },
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
