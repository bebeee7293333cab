//! End-to-end storefront flows over the in-memory datastore.

use common::{Money, OrderStatus, Role, UserId};
use domain::{
    AdminService, CartService, CatalogFilter, CatalogService, Checkout, DomainError, OrderService,
    ProductDraft, Requester,
};
use store::{Datastore, MemoryStore, Product, ProductPatch};

struct Storefront {
    store: MemoryStore,
    catalog: CatalogService<MemoryStore>,
    carts: CartService<MemoryStore>,
    orders: OrderService<MemoryStore>,
    admin: AdminService<MemoryStore>,
}

impl Storefront {
    fn new() -> Self {
        let store = MemoryStore::new();
        Self {
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            admin: AdminService::new(store.clone()),
            store,
        }
    }

    async fn stock_product(&self, name: &str, category: &str, price: i64, stock: u32) -> Product {
        let staff = Requester::new(UserId::new(), Role::AdminCanteen);
        let category = match self
            .store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == category)
        {
            Some(existing) => existing,
            None => self.admin.create_category(&staff, category).await.unwrap(),
        };
        self.admin
            .create_product(
                &staff,
                ProductDraft {
                    name: name.to_string(),
                    price: Money::from_cents(price),
                    stock,
                    category_id: category.id,
                    images: vec![],
                    active: true,
                },
            )
            .await
            .unwrap()
    }
}

fn checkout() -> Checkout {
    Checkout {
        address: "12 Canteen Way".to_string(),
        payment_method: "cash".to_string(),
    }
}

#[tokio::test]
async fn browse_fill_cart_and_check_out() {
    let shop = Storefront::new();
    let coffee = shop.stock_product("Iced Coffee", "Drink", 100, 10).await;
    let rolls = shop.stock_product("Spring Rolls", "Food", 50, 10).await;
    let shopper = UserId::new();

    // The keyword listing shows the drink but not the food.
    let page = shop
        .catalog
        .list(&CatalogFilter {
            category: Some("drink".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, coffee.id);

    shop.carts.add_item(shopper, coffee.id, 2).await.unwrap();
    shop.carts.add_item(shopper, rolls.id, 1).await.unwrap();
    let cart = shop.carts.view(shopper).await.unwrap();
    assert_eq!(cart.total().cents(), 250);

    let placed = shop.orders.place_order(shopper, checkout()).await.unwrap();
    assert_eq!(placed.order.total.cents(), 250);
    assert_eq!(placed.lines.len(), 2);
    assert!(shop.carts.view(shopper).await.unwrap().is_empty());
    assert_eq!(
        shop.store.get_product(coffee.id).await.unwrap().unwrap().stock,
        8
    );
}

#[tokio::test]
async fn order_totals_survive_later_price_changes() {
    let shop = Storefront::new();
    let coffee = shop.stock_product("Iced Coffee", "Drink", 100, 10).await;
    let shopper = UserId::new();
    let staff = Requester::new(UserId::new(), Role::AdminCanteen);

    shop.carts.add_item(shopper, coffee.id, 1).await.unwrap();
    let placed = shop.orders.place_order(shopper, checkout()).await.unwrap();

    shop.admin
        .update_product(
            &staff,
            coffee.id,
            ProductPatch {
                price: Some(Money::from_cents(999)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let requester = Requester::new(shopper, Role::User);
    let reread = shop
        .orders
        .get_order(&requester, placed.order.id)
        .await
        .unwrap();
    assert_eq!(reread.lines[0].unit_price.cents(), 100);
    assert_eq!(reread.order.total.cents(), 100);
}

#[tokio::test]
async fn a_single_shortage_fails_the_whole_checkout() {
    let shop = Storefront::new();
    let coffee = shop.stock_product("Iced Coffee", "Drink", 100, 10).await;
    let rolls = shop.stock_product("Spring Rolls", "Food", 50, 5).await;
    let shopper = UserId::new();
    let staff = Requester::new(UserId::new(), Role::AdminCanteen);

    shop.carts.add_item(shopper, coffee.id, 2).await.unwrap();
    shop.carts.add_item(shopper, rolls.id, 5).await.unwrap();

    // Stock drains between carting and checkout.
    shop.admin
        .update_product(
            &staff,
            rolls.id,
            ProductPatch {
                stock: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = shop.orders.place_order(shopper, checkout()).await;
    match result {
        Err(DomainError::InsufficientStock(shortages)) => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].product_id, rolls.id);
            assert_eq!(shortages[0].requested, 5);
            assert_eq!(shortages[0].available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // The well-stocked line was not debited and the cart is intact.
    assert_eq!(
        shop.store.get_product(coffee.id).await.unwrap().unwrap().stock,
        10
    );
    assert_eq!(shop.carts.view(shopper).await.unwrap().lines.len(), 2);
}

#[tokio::test]
async fn sold_out_products_drop_off_the_storefront() {
    let shop = Storefront::new();
    let coffee = shop.stock_product("Iced Coffee", "Drink", 100, 2).await;
    let shopper = UserId::new();

    shop.carts.add_item(shopper, coffee.id, 2).await.unwrap();
    shop.orders.place_order(shopper, checkout()).await.unwrap();

    let page = shop.catalog.list(&CatalogFilter::default()).await.unwrap();
    assert_eq!(page.total, 0);

    // Cancelling puts the stock, and the listing, back.
    let requester = Requester::new(shopper, Role::User);
    let mine = shop.orders.my_orders(shopper).await.unwrap();
    shop.orders
        .cancel_order(&requester, mine[0].order.id)
        .await
        .unwrap();
    let page = shop.catalog.list(&CatalogFilter::default()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn staff_oversee_orders_shoppers_only_their_own() {
    let shop = Storefront::new();
    let coffee = shop.stock_product("Iced Coffee", "Drink", 100, 10).await;
    let alice = UserId::new();
    let bob = UserId::new();

    for shopper in [alice, bob] {
        shop.carts.add_item(shopper, coffee.id, 1).await.unwrap();
        shop.orders.place_order(shopper, checkout()).await.unwrap();
    }

    let staff = Requester::new(UserId::new(), Role::AdminCanteen);
    let all = shop.admin.list_orders(&staff).await.unwrap();
    assert_eq!(all.len(), 2);

    let as_alice = Requester::new(alice, Role::User);
    let bobs_order = all
        .iter()
        .find(|d| d.order.user_id == bob)
        .expect("bob's order");
    let result = shop.orders.get_order(&as_alice, bobs_order.order.id).await;
    assert!(matches!(result, Err(DomainError::Forbidden)));

    let fulfilled = shop
        .admin
        .set_order_status(&staff, bobs_order.order.id, OrderStatus::Fulfilled)
        .await
        .unwrap();
    assert_eq!(fulfilled.order.status, OrderStatus::Fulfilled);
}
