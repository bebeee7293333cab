//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, Role, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Datastore, MemoryStore, NewProduct, NewUser, Product, User};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, MemoryStore) {
    let store = MemoryStore::new();
    let state = api::create_default_state(store.clone());
    let app = api::create_app(state, get_metrics_handle());
    (app, store)
}

async fn seed_user(store: &MemoryStore, role: Role) -> User {
    store
        .insert_user(NewUser {
            name: "Dana".to_string(),
            email: format!("dana-{}@example.com", UserId::new()),
            role,
        })
        .await
        .unwrap()
}

async fn seed_product(store: &MemoryStore, name: &str, price: i64, stock: u32) -> Product {
    let category = store.insert_category("Food").await.unwrap();
    store
        .insert_product(NewProduct {
            name: name.to_string(),
            slug: format!("{}-{stock}", name.to_lowercase().replace(' ', "-")),
            price: Money::from_cents(price),
            stock,
            category_id: category.id,
            active: true,
            images: vec![],
        })
        .await
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, user: &User) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user.id.to_string())
        .body(Body::empty())
        .unwrap()
}

fn post_as(uri: &str, user: &User, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", user.id.to_string())
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "canteen-storefront");
}

#[tokio::test]
async fn test_product_listing_shape() {
    let (app, store) = setup();
    seed_product(&store, "Iced Coffee", 300, 5).await;

    let response = app.oneshot(get("/products")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["name"], "Iced Coffee");
    assert_eq!(json["items"][0]["price_cents"], 300);
    // Not degraded, so the flag is omitted entirely.
    assert!(json.get("degraded").is_none());
}

#[tokio::test]
async fn test_cart_requires_identity() {
    let (app, _) = setup();

    let response = app.oneshot(get("/cart")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_is_unauthorized() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cart")
                .header("x-user-id", UserId::new().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_full_checkout_flow() {
    let (app, store) = setup();
    let shopper = seed_user(&store, Role::User).await;
    let product = seed_product(&store, "Iced Coffee", 300, 5).await;

    // Add to cart
    let response = app
        .clone()
        .oneshot(post_as(
            "/cart/items",
            &shopper,
            serde_json::json!({ "product_id": product.id.to_string(), "qty": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cart = json_body(response).await;
    assert_eq!(cart["total_cents"], 600);

    // Check out
    let response = app
        .clone()
        .oneshot(post_as(
            "/orders",
            &shopper,
            serde_json::json!({ "address": "12 Canteen Way", "payment_method": "cash" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = json_body(response).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_cents"], 600);
    let order_id = order["id"].as_str().unwrap().to_string();

    // Cart is now empty and stock went down.
    let response = app.clone().oneshot(get_as("/cart", &shopper)).await.unwrap();
    let cart = json_body(response).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 3);

    // Cancel puts the stock back.
    let response = app
        .clone()
        .oneshot(post_as(
            &format!("/orders/{order_id}/cancel"),
            &shopper,
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = json_body(response).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn test_empty_cart_checkout_is_bad_request() {
    let (app, store) = setup();
    let shopper = seed_user(&store, Role::User).await;

    let response = app
        .oneshot(post_as(
            "/orders",
            &shopper,
            serde_json::json!({ "address": "12 Canteen Way", "payment_method": "cash" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_out_of_stock_reports_the_numbers() {
    let (app, store) = setup();
    let shopper = seed_user(&store, Role::User).await;
    let product = seed_product(&store, "Iced Coffee", 300, 2).await;

    let response = app
        .oneshot(post_as(
            "/cart/items",
            &shopper,
            serde_json::json!({ "product_id": product.id.to_string(), "qty": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["requested"], 3);
    assert_eq!(json["available"], 2);
    assert_eq!(json["in_cart"], 0);
}

#[tokio::test]
async fn test_order_authorization_matrix() {
    let (app, store) = setup();
    let owner = seed_user(&store, Role::User).await;
    let stranger = seed_user(&store, Role::User).await;
    let staff = seed_user(&store, Role::AdminCanteen).await;
    let product = seed_product(&store, "Iced Coffee", 300, 5).await;

    app.clone()
        .oneshot(post_as(
            "/cart/items",
            &owner,
            serde_json::json!({ "product_id": product.id.to_string(), "qty": 1 }),
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(post_as(
            "/orders",
            &owner,
            serde_json::json!({ "address": "12 Canteen Way", "payment_method": "cash" }),
        ))
        .await
        .unwrap();
    let order = json_body(response).await;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let response = app.clone().oneshot(get_as(&uri, &owner)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get_as(&uri, &staff)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get_as(&uri, &stranger)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get_as(&format!("/orders/{}", UserId::new()), &staff))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_back_office_is_staff_only() {
    let (app, store) = setup();
    let shopper = seed_user(&store, Role::User).await;
    let staff = seed_user(&store, Role::AdminCanteen).await;
    let root = seed_user(&store, Role::SuperAdmin).await;

    let response = app
        .clone()
        .oneshot(get_as("/admin/orders", &shopper))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get_as("/admin/orders", &staff))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // User management is one level higher.
    let response = app
        .clone()
        .oneshot(get_as("/admin/users", &staff))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.oneshot(get_as("/admin/users", &root)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_creates_product_with_derived_slug() {
    let (app, store) = setup();
    let staff = seed_user(&store, Role::AdminCanteen).await;
    let category = store.insert_category("Food").await.unwrap();

    let response = app
        .clone()
        .oneshot(post_as(
            "/admin/products",
            &staff,
            serde_json::json!({
                "name": "Crispy Spring Rolls",
                "price": 250,
                "stock": 10,
                "category_id": category.id.to_string(),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = json_body(response).await;
    let slug = json["slug"].as_str().unwrap();
    assert!(slug.starts_with("crispy-spring-rolls-"));

    let response = app.oneshot(get(&format!("/products/{slug}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_review_flow() {
    let (app, store) = setup();
    let shopper = seed_user(&store, Role::User).await;
    let product = seed_product(&store, "Iced Coffee", 300, 5).await;

    let uri = format!("/products/{}/reviews", product.slug);
    let response = app
        .clone()
        .oneshot(post_as(
            &uri,
            &shopper,
            serde_json::json!({ "rating": 5, "content": "great" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Out-of-range ratings bounce.
    let response = app
        .clone()
        .oneshot(post_as(&uri, &shopper, serde_json::json!({ "rating": 6 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get(&format!("/products/{}", product.slug)))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(json["reviews"][0]["rating"], 5);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
