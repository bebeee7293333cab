//! Record types mirroring the storefront tables.

use chrono::{DateTime, Utc};
use common::{
    CartId, CartItemId, CategoryId, Money, OrderId, OrderStatus, ProductId, ReviewId, Role, UserId,
};
use serde::{Deserialize, Serialize};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A sellable catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// URL slug, unique across the catalog.
    pub slug: String,
    pub price: Money,
    /// Units remaining; never negative.
    pub stock: u32,
    pub category_id: CategoryId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Image URLs in display order.
    pub images: Vec<String>,
}

/// Payload for inserting a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub stock: u32,
    pub category_id: CategoryId,
    pub active: bool,
    pub images: Vec<String>,
}

/// Partial update of a product; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub category_id: Option<CategoryId>,
    pub active: Option<bool>,
    pub images: Option<Vec<String>>,
}

/// How to narrow a product listing by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelector {
    /// Exact category id.
    Id(CategoryId),
    /// Exact category name (after keyword mapping).
    Name(String),
}

/// Filter and pagination for product listings.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub category: Option<CategorySelector>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            page: 1,
            page_size: 12,
        }
    }
}

/// One page of products plus the total match count for pagination.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: u64,
}

/// A user account with its normalized role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Payload for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A user's cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
}

/// One (cart, product) line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub qty: u32,
}

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    /// Line total at the product's current price.
    pub fn subtotal(&self) -> Money {
        self.product.price.times(self.item.qty)
    }
}

/// A cart with all of its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartDetail {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartDetail {
    /// Quantity of one product already held in this cart.
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .filter(|line| line.item.product_id == product_id)
            .map(|line| line.item.qty)
            .sum()
    }

    /// Returns true if the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cart total at current prices.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address: String,
    pub payment_method: String,
    /// Authoritative total computed at placement time.
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// One immutable order line. `unit_price` is the price observed at
/// placement time and never re-read from the live product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub qty: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Line total as paid.
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.qty)
    }
}

/// An order with all of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// One requested line of a checkout, priced inside the placement
/// transaction.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub qty: u32,
}

/// Input to [`crate::Datastore::place_order`].
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: UserId,
    /// Cart consumed by this checkout; emptied on success.
    pub cart_id: CartId,
    pub address: String,
    pub payment_method: String,
    pub lines: Vec<CheckoutLine>,
}

/// Report for one order line that could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub product_id: ProductId,
    pub requested: u32,
    pub available: u32,
}

/// A product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// 1 to 5 stars.
    pub rating: u8,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: u8,
    pub content: String,
}
