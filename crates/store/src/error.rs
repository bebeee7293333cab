use common::{OrderId, OrderStatus};
use thiserror::Error;

use crate::records::StockShortage;

/// Errors that can occur when interacting with the datastore.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// One or more order lines asked for more units than are in stock.
    /// Carries a per-line report so callers can surface exactly which
    /// products fell short; nothing was written.
    #[error("insufficient stock for {} line(s)", shortages.len())]
    InsufficientStock { shortages: Vec<StockShortage> },

    /// An order could not be cancelled because it already left the
    /// pending state.
    #[error("order {order_id} is {status}, only pending orders can be cancelled")]
    OrderNotPending {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for datastore operations.
pub type Result<T> = std::result::Result<T, StoreError>;
