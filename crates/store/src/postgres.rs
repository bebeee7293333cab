use std::collections::HashMap;

use async_trait::async_trait;
use common::{
    CartId, CartItemId, CategoryId, Money, OrderId, OrderStatus, ProductId, ReviewId, Role, UserId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::records::{
    Cart, CartDetail, CartItem, CartLine, Category, CategorySelector, NewProduct, NewReview,
    NewUser, Order, OrderDetail, OrderLine, PlaceOrder, Product, ProductPage, ProductPatch,
    ProductQuery, Review, StockShortage, User,
};
use crate::store::Datastore;
use crate::{Result, StoreError};

/// PostgreSQL-backed datastore implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL datastore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: &PgRow, images: Vec<String>) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")? as u32,
            category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
            images,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            address: row.try_get("address")?,
            payment_method: row.try_get("payment_method")?,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: parse_status(row.try_get::<String, _>("status")?)?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            qty: row.try_get::<i32, _>("qty")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_review(row: &PgRow) -> Result<Review> {
        Ok(Review {
            id: ReviewId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            rating: row.try_get::<i16, _>("rating")? as u8,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Fetches image URLs for a batch of products in one query.
    async fn images_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, url
            FROM product_images
            WHERE product_id = ANY($1)
            ORDER BY product_id, position ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            let product_id: Uuid = row.try_get("product_id")?;
            map.entry(product_id).or_default().push(row.try_get("url")?);
        }
        Ok(map)
    }

    async fn product_with_images(&self, row: Option<PgRow>) -> Result<Option<Product>> {
        let Some(row) = row else { return Ok(None) };
        let id: Uuid = row.try_get("id")?;
        let mut images = self.images_for(&[id]).await?;
        Ok(Some(Self::row_to_product(
            &row,
            images.remove(&id).unwrap_or_default(),
        )?))
    }

    async fn order_detail(&self, order: Order) -> Result<OrderDetail> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, product_name, qty, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order.id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .iter()
            .map(Self::row_to_order_line)
            .collect::<Result<Vec<_>>>()?;
        Ok(OrderDetail { order, lines })
    }

    async fn cart_row(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, user_id FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(Cart {
                id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            }),
            None => None,
        })
    }
}

fn parse_status(raw: String) -> Result<OrderStatus> {
    OrderStatus::from_name(&raw).ok_or_else(|| {
        StoreError::Database(sqlx::Error::Decode(
            format!("unknown order status {raw:?}").into(),
        ))
    })
}

async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    images: &[String],
) -> Result<()> {
    for (position, url) in images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_images (product_id, url, position) VALUES ($1, $2, $3)",
        )
        .bind(product_id.as_uuid())
        .bind(url)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Datastore for PostgresStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        // Shared filter clause for the count and the page query, so the
        // total stays correct even when the requested page is past the
        // last match.
        let mut filter = String::from(" FROM products WHERE active AND stock > 0");
        let mut param_count = 0;
        match &query.category {
            Some(CategorySelector::Id(_)) => {
                param_count += 1;
                filter.push_str(&format!(" AND category_id = ${param_count}"));
            }
            Some(CategorySelector::Name(_)) => {
                param_count += 1;
                filter.push_str(&format!(
                    " AND category_id = (SELECT id FROM categories WHERE name = ${param_count})"
                ));
            }
            None => {}
        }
        if query.search.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND name ILIKE ${param_count}"));
        }

        let count_sql = format!("SELECT count(*){filter}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        match &query.category {
            Some(CategorySelector::Id(id)) => count_query = count_query.bind(id.as_uuid()),
            Some(CategorySelector::Name(name)) => count_query = count_query.bind(name),
            None => {}
        }
        if let Some(search) = &query.search {
            count_query = count_query.bind(format!("%{search}%"));
        }
        let total = count_query.fetch_one(&self.pool).await? as u64;

        let sql = format!(
            "SELECT id, name, slug, price_cents, stock, category_id, active, created_at{filter} \
             ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        );
        let mut sqlx_query = sqlx::query(&sql);
        match &query.category {
            Some(CategorySelector::Id(id)) => sqlx_query = sqlx_query.bind(id.as_uuid()),
            Some(CategorySelector::Name(name)) => sqlx_query = sqlx_query.bind(name),
            None => {}
        }
        if let Some(search) = &query.search {
            sqlx_query = sqlx_query.bind(format!("%{search}%"));
        }
        let offset = i64::from(query.page.saturating_sub(1)) * i64::from(query.page_size);
        sqlx_query = sqlx_query.bind(i64::from(query.page_size)).bind(offset);

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut images = self.images_for(&ids).await?;

        let items = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| Self::row_to_product(row, images.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(ProductPage { items, total })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, slug, price_cents, stock, category_id, active, created_at \
             FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        self.product_with_images(row).await
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, slug, price_cents, stock, category_id, active, created_at \
             FROM products WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        self.product_with_images(row).await
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, price_cents, stock, category_id, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, slug, price_cents, stock, category_id, active, created_at
            "#,
        )
        .bind(ProductId::new().as_uuid())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(new.price.cents())
        .bind(new.stock as i32)
        .bind(new.category_id.as_uuid())
        .bind(new.active)
        .fetch_one(&mut *tx)
        .await?;

        let product_id = ProductId::from_uuid(row.try_get::<Uuid, _>("id")?);
        insert_images(&mut tx, product_id, &new.images).await?;
        tx.commit().await?;

        Self::row_to_product(&row, new.images)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                price_cents = COALESCE($3, price_cents),
                stock = COALESCE($4, stock),
                category_id = COALESCE($5, category_id),
                active = COALESCE($6, active)
            WHERE id = $1
            RETURNING id, name, slug, price_cents, stock, category_id, active, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&patch.name)
        .bind(patch.price.map(|p| p.cents()))
        .bind(patch.stock.map(|s| s as i32))
        .bind(patch.category_id.map(|c| c.as_uuid()))
        .bind(patch.active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound { entity: "product" })?;

        let images = match patch.images {
            Some(images) => {
                sqlx::query("DELETE FROM product_images WHERE product_id = $1")
                    .bind(id.as_uuid())
                    .execute(&mut *tx)
                    .await?;
                insert_images(&mut tx, id, &images).await?;
                images
            }
            None => {
                let rows = sqlx::query(
                    "SELECT url FROM product_images WHERE product_id = $1 ORDER BY position ASC",
                )
                .bind(id.as_uuid())
                .fetch_all(&mut *tx)
                .await?;
                rows.iter()
                    .map(|row| row.try_get("url"))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        tx.commit().await?;
        Self::row_to_product(&row, images)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn insert_category(&self, name: &str) -> Result<Category> {
        let row = sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name")
            .bind(CategoryId::new().as_uuid())
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(Category {
            id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, role FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(User {
                id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                role: Role::from_name(row.try_get::<String, _>("role")?.as_str()),
            }),
            None => None,
        })
    }

    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, role
            "#,
        )
        .bind(UserId::new().as_uuid())
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: Role::from_name(row.try_get::<String, _>("role")?.as_str()),
        })
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, email, role FROM users ORDER BY email ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(User {
                    id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    role: Role::from_name(row.try_get::<String, _>("role")?.as_str()),
                })
            })
            .collect()
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User> {
        let row = sqlx::query(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING id, name, email, role",
        )
        .bind(id.as_uuid())
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { entity: "user" })?;

        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: Role::from_name(row.try_get::<String, _>("role")?.as_str()),
        })
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<CartDetail>> {
        let Some(cart) = self.cart_row(user_id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.cart_id, ci.product_id, ci.qty,
                   p.id AS p_id, p.name, p.slug, p.price_cents, p.stock,
                   p.category_id, p.active, p.created_at
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at ASC
            "#,
        )
        .bind(cart.id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let product_ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("p_id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut images = self.images_for(&product_ids).await?;

        let lines = rows
            .iter()
            .zip(&product_ids)
            .map(|(row, p_id)| {
                Ok(CartLine {
                    item: CartItem {
                        id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
                        cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
                        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                        qty: row.try_get::<i32, _>("qty")? as u32,
                    },
                    product: Product {
                        id: ProductId::from_uuid(*p_id),
                        name: row.try_get("name")?,
                        slug: row.try_get("slug")?,
                        price: Money::from_cents(row.try_get("price_cents")?),
                        stock: row.try_get::<i32, _>("stock")? as u32,
                        category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
                        active: row.try_get("active")?,
                        created_at: row.try_get("created_at")?,
                        images: images.remove(p_id).unwrap_or_default(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(CartDetail { cart, lines }))
    }

    async fn ensure_cart(&self, user_id: UserId) -> Result<Cart> {
        let row = sqlx::query(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id
            "#,
        )
        .bind(CartId::new().as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(Cart {
            id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        })
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        qty: u32,
    ) -> Result<CartItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, qty)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
                DO UPDATE SET qty = LEAST(
                    cart_items.qty::bigint + EXCLUDED.qty::bigint, 2147483647
                )::int
            RETURNING id, cart_id, product_id, qty
            "#,
        )
        .bind(CartItemId::new().as_uuid())
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(qty as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(CartItem {
            id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            qty: row.try_get::<i32, _>("qty")? as u32,
        })
    }

    async fn remove_cart_item(&self, item_id: CartItemId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, checkout), fields(user_id = %checkout.user_id, lines = checkout.lines.len()))]
    async fn place_order(&self, checkout: PlaceOrder) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        // Lock the product rows so concurrent checkouts serialize per
        // product; prices and stock are read after the lock.
        let product_ids: Vec<Uuid> = checkout
            .lines
            .iter()
            .map(|line| line.product_id.as_uuid())
            .collect();
        let rows = sqlx::query(
            "SELECT id, name, price_cents, stock FROM products WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut locked: HashMap<Uuid, (String, i64, i32)> = HashMap::new();
        for row in &rows {
            locked.insert(
                row.try_get("id")?,
                (
                    row.try_get("name")?,
                    row.try_get("price_cents")?,
                    row.try_get("stock")?,
                ),
            );
        }

        let mut shortages = Vec::new();
        let mut lines = Vec::with_capacity(checkout.lines.len());
        for line in &checkout.lines {
            let (name, price_cents, stock) = locked
                .get(&line.product_id.as_uuid())
                .ok_or(StoreError::NotFound { entity: "product" })?;
            if (*stock as u32) < line.qty {
                shortages.push(StockShortage {
                    product_id: line.product_id,
                    requested: line.qty,
                    available: *stock as u32,
                });
            } else {
                lines.push(OrderLine {
                    product_id: line.product_id,
                    product_name: name.clone(),
                    qty: line.qty,
                    unit_price: Money::from_cents(*price_cents),
                });
            }
        }
        if !shortages.is_empty() {
            return Err(StoreError::InsufficientStock { shortages });
        }

        let total: Money = lines.iter().map(OrderLine::subtotal).sum();
        let order_row = sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, address, payment_method, total_cents, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING id, user_id, address, payment_method, total_cents, status, created_at
            "#,
        )
        .bind(OrderId::new().as_uuid())
        .bind(checkout.user_id.as_uuid())
        .bind(&checkout.address)
        .bind(&checkout.payment_method)
        .bind(total.cents())
        .fetch_one(&mut *tx)
        .await?;
        let order = Self::row_to_order(&order_row)?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, qty, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(line.qty as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(line.product_id.as_uuid())
                .bind(line.qty as i32)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(checkout.cart_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(OrderDetail { order, lines })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>> {
        let row = sqlx::query(
            "SELECT id, user_id, address, payment_method, total_cents, status, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let order = Self::row_to_order(&row)?;
                Ok(Some(self.order_detail(order).await?))
            }
            None => Ok(None),
        }
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetail>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, address, payment_method, total_cents, status, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(rows.len());
        for row in &rows {
            details.push(self.order_detail(Self::row_to_order(row)?).await?);
        }
        Ok(details)
    }

    async fn list_orders(&self) -> Result<Vec<OrderDetail>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, address, payment_method, total_cents, status, created_at
            FROM orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(rows.len());
        for row in &rows {
            details.push(self.order_detail(Self::row_to_order(row)?).await?);
        }
        Ok(details)
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let row = sqlx::query(
            r#"
            UPDATE orders SET status = $2 WHERE id = $1
            RETURNING id, user_id, address, payment_method, total_cents, status, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { entity: "order" })?;

        Self::row_to_order(&row)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, user_id, address, payment_method, total_cents, status, created_at \
             FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound { entity: "order" })?;
        let order = Self::row_to_order(&row)?;

        if order.status != OrderStatus::Pending {
            return Err(StoreError::OrderNotPending {
                order_id: id,
                status: order.status,
            });
        }

        sqlx::query(
            r#"
            UPDATE products p
            SET stock = p.stock + oi.qty
            FROM order_items oi
            WHERE oi.order_id = $1 AND oi.product_id = p.id
            "#,
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            r#"
            UPDATE orders SET status = 'cancelled' WHERE id = $1
            RETURNING id, user_id, address, payment_method, total_cents, status, created_at
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_order(&row)
    }

    async fn insert_review(&self, new: NewReview) -> Result<Review> {
        let row = sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, product_id, rating, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, product_id, rating, content, created_at
            "#,
        )
        .bind(ReviewId::new().as_uuid())
        .bind(new.user_id.as_uuid())
        .bind(new.product_id.as_uuid())
        .bind(new.rating as i16)
        .bind(&new.content)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_review(&row)
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, product_id, rating, content, created_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_review).collect()
    }
}
