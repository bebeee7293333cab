use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, OrderStatus, ProductId, Role, UserId};

use crate::records::{
    Cart, CartDetail, CartItem, Category, NewProduct, NewReview, NewUser, Order, OrderDetail,
    PlaceOrder, Product, ProductPage, ProductPatch, ProductQuery, Review, User,
};
use crate::Result;

/// Core trait for datastore implementations.
///
/// One method per storefront operation; every implementation must be
/// thread-safe (`Send + Sync`). Single-row methods have ordinary
/// read/write semantics. The two multi-row workflows carry stronger
/// contracts:
///
/// * [`place_order`](Datastore::place_order) is all-or-nothing: prices
///   and stock are read inside the unit, every line is checked, and the
///   order insert, line inserts, stock decrements and cart clearing
///   either all happen or none do. A shortage on any line fails the
///   whole call with [`StoreError::InsufficientStock`].
/// * [`cancel_order`](Datastore::cancel_order) transitions a pending
///   order to cancelled and restocks its lines in the same unit; a
///   non-pending order fails with [`StoreError::OrderNotPending`].
///
/// [`StoreError::InsufficientStock`]: crate::StoreError::InsufficientStock
/// [`StoreError::OrderNotPending`]: crate::StoreError::OrderNotPending
#[async_trait]
pub trait Datastore: Send + Sync {
    // -- products --

    /// Lists active, in-stock products matching the query, newest first,
    /// with the total match count.
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage>;

    /// Fetches a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Fetches a product by its URL slug.
    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;

    /// Inserts a product with its image list.
    async fn insert_product(&self, new: NewProduct) -> Result<Product>;

    /// Applies a partial update; `images: Some(_)` replaces the image
    /// list wholesale.
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product>;

    /// Lists all categories.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Inserts a category.
    async fn insert_category(&self, name: &str) -> Result<Category>;

    // -- users --

    /// Fetches a user by id, role already normalized.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Inserts a user.
    async fn insert_user(&self, new: NewUser) -> Result<User>;

    /// Lists all users.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Replaces a user's role.
    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User>;

    // -- carts --

    /// Fetches the user's cart with lines and product snapshots.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<CartDetail>>;

    /// Returns the user's cart row, creating an empty one if absent.
    /// Idempotent.
    async fn ensure_cart(&self, user_id: UserId) -> Result<Cart>;

    /// Adds quantity to a cart line, incrementing the existing
    /// (cart, product) row rather than duplicating it.
    async fn add_cart_item(&self, cart_id: CartId, product_id: ProductId, qty: u32)
        -> Result<CartItem>;

    /// Deletes a cart line by identity. Callers are responsible for
    /// ownership checks.
    async fn remove_cart_item(&self, item_id: CartItemId) -> Result<()>;

    /// Deletes every line of a cart.
    async fn clear_cart(&self, cart_id: CartId) -> Result<()>;

    // -- orders --

    /// Atomically creates an order from priced lines, decrements stock
    /// and clears the consuming cart. See the trait docs for the
    /// contract.
    async fn place_order(&self, checkout: PlaceOrder) -> Result<OrderDetail>;

    /// Fetches an order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>>;

    /// Lists a user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetail>>;

    /// Lists every order, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderDetail>>;

    /// Overwrites an order's status without transition checks; the
    /// domain layer gates staff transitions.
    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Atomically moves a pending order to cancelled and restocks its
    /// lines.
    async fn cancel_order(&self, id: OrderId) -> Result<Order>;

    // -- reviews --

    /// Inserts a review.
    async fn insert_review(&self, new: NewReview) -> Result<Review>;

    /// Lists reviews for a product, newest first.
    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<Review>>;
}
