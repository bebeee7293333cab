//! Order placement, cancellation and queries.

use std::time::Instant;

use common::{OrderId, Role, UserId};
use serde::Deserialize;
use store::{CheckoutLine, Datastore, OrderDetail, PlaceOrder};

use crate::error::{DomainError, Result};

/// The authenticated caller of an order operation, with its role
/// already normalized.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub user_id: UserId,
    pub role: Role,
}

impl Requester {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Owners see their own orders; staff see everything.
    pub fn can_view(&self, owner: UserId) -> bool {
        self.user_id == owner || self.role.is_staff()
    }
}

/// Checkout details supplied by the shopper.
#[derive(Debug, Clone, Deserialize)]
pub struct Checkout {
    pub address: String,
    pub payment_method: String,
}

/// Service for placing and querying orders.
pub struct OrderService<S: Datastore> {
    store: S,
}

impl<S: Datastore> OrderService<S> {
    /// Creates a new order service with the given datastore.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order from the user's entire cart.
    ///
    /// Prices and stock are settled atomically in the datastore; on
    /// success the cart is emptied and stock decremented, on any
    /// shortage nothing changes.
    #[tracing::instrument(skip(self, checkout))]
    pub async fn place_order(&self, user_id: UserId, checkout: Checkout) -> Result<OrderDetail> {
        let start = Instant::now();

        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(DomainError::EmptyCart)?;
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let lines = cart
            .lines
            .iter()
            .map(|line| CheckoutLine {
                product_id: line.item.product_id,
                qty: line.item.qty,
            })
            .collect();

        let detail = self
            .store
            .place_order(PlaceOrder {
                user_id,
                cart_id: cart.cart.id,
                address: checkout.address,
                payment_method: checkout.payment_method,
                lines,
            })
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(order_id = %detail.order.id, total = %detail.order.total, "order placed");

        Ok(detail)
    }

    /// Fetches one order; the owner and staff may look, anyone else gets
    /// a 403-shaped error.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, requester: &Requester, id: OrderId) -> Result<OrderDetail> {
        let detail = self
            .store
            .get_order(id)
            .await?
            .ok_or(DomainError::NotFound("order"))?;
        if !requester.can_view(detail.order.user_id) {
            return Err(DomainError::Forbidden);
        }
        Ok(detail)
    }

    /// Lists the user's own orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn my_orders(&self, user_id: UserId) -> Result<Vec<OrderDetail>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }

    /// Cancels one of the requester's own pending orders, returning its
    /// units to stock.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, requester: &Requester, id: OrderId) -> Result<OrderDetail> {
        let detail = self
            .store
            .get_order(id)
            .await?
            .ok_or(DomainError::NotFound("order"))?;
        if detail.order.user_id != requester.user_id {
            return Err(DomainError::Forbidden);
        }

        let order = self.store.cancel_order(id).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        Ok(OrderDetail {
            order,
            lines: detail.lines,
        })
    }
}
