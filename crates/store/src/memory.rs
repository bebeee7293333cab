use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartItemId, OrderId, OrderStatus, ProductId, ReviewId, Role, UserId};
use tokio::sync::RwLock;

use crate::records::{
    Cart, CartDetail, CartItem, CartLine, Category, CategorySelector, NewProduct, NewReview,
    NewUser, Order, OrderDetail, OrderLine, PlaceOrder, Product, ProductPage, ProductPatch,
    ProductQuery, Review, StockShortage, User,
};
use crate::store::Datastore;
use crate::{Result, StoreError};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    categories: Vec<Category>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    /// Kept as a Vec so cart lines stay in insertion order.
    cart_items: Vec<CartItem>,
    orders: HashMap<OrderId, Order>,
    order_lines: HashMap<OrderId, Vec<OrderLine>>,
    reviews: Vec<Review>,
}

/// In-memory datastore implementation.
///
/// Stores all rows behind a single `RwLock` and provides the same
/// interface and atomicity guarantees as the PostgreSQL implementation:
/// `place_order` and `cancel_order` run inside one write-lock critical
/// section.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of placed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

impl State {
    fn cart_detail(&self, cart: Cart) -> CartDetail {
        let lines = self
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart.id)
            .filter_map(|item| {
                self.products.get(&item.product_id).map(|product| CartLine {
                    item: item.clone(),
                    product: product.clone(),
                })
            })
            .collect();
        CartDetail { cart, lines }
    }

    fn order_detail(&self, order: &Order) -> OrderDetail {
        OrderDetail {
            order: order.clone(),
            lines: self.order_lines.get(&order.id).cloned().unwrap_or_default(),
        }
    }

    fn matches(&self, product: &Product, query: &ProductQuery) -> bool {
        if !product.active || product.stock == 0 {
            return false;
        }
        match &query.category {
            Some(CategorySelector::Id(id)) if product.category_id != *id => return false,
            Some(CategorySelector::Name(name)) => {
                let category_id = self
                    .categories
                    .iter()
                    .find(|c| c.name == *name)
                    .map(|c| c.id);
                if category_id != Some(product.category_id) {
                    return false;
                }
            }
            _ => {}
        }
        if let Some(search) = &query.search
            && !product
                .name
                .to_lowercase()
                .contains(&search.to_lowercase())
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let state = self.state.read().await;
        let mut items: Vec<Product> = state
            .products
            .values()
            .filter(|p| state.matches(p, query))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = items.len() as u64;
        let offset = query.page.saturating_sub(1) as usize * query.page_size as usize;
        let items = items
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect();

        Ok(ProductPage { items, total })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            slug: new.slug,
            price: new.price,
            stock: new.stock,
            category_id: new.category_id,
            active: new.active,
            created_at: Utc::now(),
            images: new.images,
        };
        self.state
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "product" })?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(category_id) = patch.category_id {
            product.category_id = category_id;
        }
        if let Some(active) = patch.active {
            product.active = active;
        }
        if let Some(images) = patch.images {
            product.images = images;
        }

        Ok(product.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.state.read().await.categories.clone())
    }

    async fn insert_category(&self, name: &str) -> Result<Category> {
        let category = Category {
            id: common::CategoryId::new(),
            name: name.to_string(),
        };
        self.state.write().await.categories.push(category.clone());
        Ok(category)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let user = User {
            id: UserId::new(),
            name: new.name,
            email: new.email,
            role: new.role,
        };
        self.state.write().await.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "user" })?;
        user.role = role;
        Ok(user.clone())
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<CartDetail>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .get(&user_id)
            .map(|cart| state.cart_detail(*cart)))
    }

    async fn ensure_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut state = self.state.write().await;
        Ok(*state.carts.entry(user_id).or_insert_with(|| Cart {
            id: CartId::new(),
            user_id,
        }))
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        qty: u32,
    ) -> Result<CartItem> {
        let mut state = self.state.write().await;
        if let Some(item) = state
            .cart_items
            .iter_mut()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
        {
            item.qty = item.qty.saturating_add(qty);
            return Ok(item.clone());
        }

        let item = CartItem {
            id: CartItemId::new(),
            cart_id,
            product_id,
            qty,
        };
        state.cart_items.push(item.clone());
        Ok(item)
    }

    async fn remove_cart_item(&self, item_id: CartItemId) -> Result<()> {
        self.state
            .write()
            .await
            .cart_items
            .retain(|item| item.id != item_id);
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        self.state
            .write()
            .await
            .cart_items
            .retain(|item| item.cart_id != cart_id);
        Ok(())
    }

    #[tracing::instrument(skip(self, checkout), fields(user_id = %checkout.user_id, lines = checkout.lines.len()))]
    async fn place_order(&self, checkout: PlaceOrder) -> Result<OrderDetail> {
        let mut state = self.state.write().await;

        // Check every line before touching anything.
        let mut shortages = Vec::new();
        let mut lines = Vec::with_capacity(checkout.lines.len());
        for line in &checkout.lines {
            let product = state
                .products
                .get(&line.product_id)
                .ok_or(StoreError::NotFound { entity: "product" })?;
            if product.stock < line.qty {
                shortages.push(StockShortage {
                    product_id: line.product_id,
                    requested: line.qty,
                    available: product.stock,
                });
            } else {
                lines.push(OrderLine {
                    product_id: line.product_id,
                    product_name: product.name.clone(),
                    qty: line.qty,
                    unit_price: product.price,
                });
            }
        }
        if !shortages.is_empty() {
            return Err(StoreError::InsufficientStock { shortages });
        }

        let total = lines.iter().map(OrderLine::subtotal).sum();
        let order = Order {
            id: OrderId::new(),
            user_id: checkout.user_id,
            address: checkout.address,
            payment_method: checkout.payment_method,
            total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        for line in &lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock -= line.qty;
            }
        }
        state
            .cart_items
            .retain(|item| item.cart_id != checkout.cart_id);
        state.orders.insert(order.id, order.clone());
        state.order_lines.insert(order.id, lines.clone());

        Ok(OrderDetail { order, lines })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).map(|order| state.order_detail(order)))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetail>> {
        let state = self.state.read().await;
        let mut orders: Vec<OrderDetail> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(|o| state.order_detail(o))
            .collect();
        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(orders)
    }

    async fn list_orders(&self) -> Result<Vec<OrderDetail>> {
        let state = self.state.read().await;
        let mut orders: Vec<OrderDetail> = state
            .orders
            .values()
            .map(|o| state.order_detail(o))
            .collect();
        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(orders)
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "order" })?;
        order.status = status;
        Ok(order.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get(&id)
            .ok_or(StoreError::NotFound { entity: "order" })?;
        if order.status != OrderStatus::Pending {
            return Err(StoreError::OrderNotPending {
                order_id: id,
                status: order.status,
            });
        }

        let lines = state.order_lines.get(&id).cloned().unwrap_or_default();
        for line in &lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock += line.qty;
            }
        }
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "order" })?;
        order.status = OrderStatus::Cancelled;
        Ok(order.clone())
    }

    async fn insert_review(&self, new: NewReview) -> Result<Review> {
        let review = Review {
            id: ReviewId::new(),
            user_id: new.user_id,
            product_id: new.product_id,
            rating: new.rating,
            content: new.content,
            created_at: Utc::now(),
        };
        self.state.write().await.reviews.push(review.clone());
        Ok(review)
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }
}
