//! Cart operations: viewing, adding, removing and clearing lines.

use common::{CartItemId, ProductId, UserId};
use store::{CartDetail, CartItem, Datastore};

use crate::error::{DomainError, Result};

/// Service for managing a user's cart.
pub struct CartService<S: Datastore> {
    store: S,
}

impl<S: Datastore> CartService<S> {
    /// Creates a new cart service with the given datastore.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one on first touch.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, user_id: UserId) -> Result<CartDetail> {
        if let Some(detail) = self.store.get_cart(user_id).await? {
            return Ok(detail);
        }
        let cart = self.store.ensure_cart(user_id).await?;
        Ok(CartDetail {
            cart,
            lines: Vec::new(),
        })
    }

    /// Adds a quantity of a product to the user's cart.
    ///
    /// The combined quantity (already in the cart plus the request) must
    /// fit within current stock; the error reports both numbers so the
    /// caller can show the shopper exactly what is left.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        qty: u32,
    ) -> Result<CartItem> {
        if qty == 0 {
            return Err(DomainError::InvalidQuantity(qty));
        }
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(DomainError::NotFound("product"))?;
        if !product.active {
            return Err(DomainError::NotFound("product"));
        }

        let cart = self.store.ensure_cart(user_id).await?;
        let in_cart = self
            .store
            .get_cart(user_id)
            .await?
            .map(|detail| detail.quantity_of(product_id))
            .unwrap_or(0);
        // A sum that overflows u32 can never fit in stock either.
        if in_cart
            .checked_add(qty)
            .is_none_or(|total| total > product.stock)
        {
            return Err(DomainError::OutOfStock {
                requested: qty,
                available: product.stock,
                in_cart,
            });
        }

        let item = self.store.add_cart_item(cart.id, product_id, qty).await?;
        metrics::counter!("cart_items_added_total").increment(u64::from(qty));
        Ok(item)
    }

    /// Removes one line from the user's cart.
    ///
    /// The line must belong to the requester's own cart; anything else
    /// reads as not found.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<()> {
        let detail = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(DomainError::NotFound("cart item"))?;
        if !detail.lines.iter().any(|line| line.item.id == item_id) {
            return Err(DomainError::NotFound("cart item"));
        }
        Ok(self.store.remove_cart_item(item_id).await?)
    }

    /// Empties the user's cart. A user without a cart is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        if let Some(detail) = self.store.get_cart(user_id).await? {
            self.store.clear_cart(detail.cart.id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::{MemoryStore, NewProduct, Product, ProductPatch};

    async fn seed_product(store: &MemoryStore, stock: u32) -> Product {
        let category = store.insert_category("Food").await.unwrap();
        store
            .insert_product(NewProduct {
                name: "Spring Rolls".to_string(),
                slug: "spring-rolls-1".to_string(),
                price: Money::from_cents(250),
                stock,
                category_id: category.id,
                active: true,
                images: vec![],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn view_creates_an_empty_cart() {
        let service = CartService::new(MemoryStore::new());
        let user_id = UserId::new();

        let detail = service.view(user_id).await.unwrap();
        assert!(detail.is_empty());
        assert_eq!(detail.cart.user_id, user_id);
    }

    #[tokio::test]
    async fn add_respects_stock_including_cart_contents() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;
        let service = CartService::new(store);
        let user_id = UserId::new();

        service.add_item(user_id, product.id, 3).await.unwrap();

        // 3 in cart + 3 requested > 5 in stock.
        let result = service.add_item(user_id, product.id, 3).await;
        match result {
            Err(DomainError::OutOfStock {
                requested,
                available,
                in_cart,
            }) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 5);
                assert_eq!(in_cart, 3);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }

        // Topping up to exactly the stock level is fine.
        let item = service.add_item(user_id, product.id, 2).await.unwrap();
        assert_eq!(item.qty, 5);
    }

    #[tokio::test]
    async fn huge_quantities_cannot_wrap_the_stock_check() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;
        let service = CartService::new(store);
        let user_id = UserId::new();

        service.add_item(user_id, product.id, 2).await.unwrap();

        let result = service.add_item(user_id, product.id, u32::MAX).await;
        match result {
            Err(DomainError::OutOfStock {
                requested,
                available,
                in_cart,
            }) => {
                assert_eq!(requested, u32::MAX);
                assert_eq!(available, 5);
                assert_eq!(in_cart, 2);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }

        // The existing line is untouched.
        let detail = service.view(user_id).await.unwrap();
        assert_eq!(detail.quantity_of(product.id), 2);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;
        let service = CartService::new(store);

        let result = service.add_item(UserId::new(), product.id, 0).await;
        assert!(matches!(result, Err(DomainError::InvalidQuantity(0))));
    }

    #[tokio::test]
    async fn inactive_products_cannot_be_added() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5).await;
        store
            .update_product(
                product.id,
                ProductPatch {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let service = CartService::new(store);

        let result = service.add_item(UserId::new(), product.id, 1).await;
        assert!(matches!(result, Err(DomainError::NotFound("product"))));
    }

    #[tokio::test]
    async fn remove_only_touches_the_callers_cart() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10).await;
        let service = CartService::new(store);
        let owner = UserId::new();
        let stranger = UserId::new();

        let item = service.add_item(owner, product.id, 2).await.unwrap();

        let result = service.remove_item(stranger, item.id).await;
        assert!(matches!(result, Err(DomainError::NotFound("cart item"))));

        service.remove_item(owner, item.id).await.unwrap();
        assert!(service.view(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_without_a_cart_is_a_no_op() {
        let service = CartService::new(MemoryStore::new());
        service.clear(UserId::new()).await.unwrap();
    }
}
