use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use sameh_store::api::{build_app, AppState};
use sameh_store::config::AppConfig;
use sameh_store::seed::seed_if_empty;
use sameh_store::shop::{AccentColor, Shop};
use sameh_store::store::{keys, FileStore, Storage};

fn app(seeded: bool) -> Router {
    let config = AppConfig::default();
    let mut storage = Storage::in_memory();
    if seeded { seed_if_empty(&mut storage, &config.currency).expect("seed"); }
    build_app(AppState::new(Shop::new(storage, &config)))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder.header("content-type", "application/json").body(Body::from(b.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    send(app, request).await
}

async fn call_raw(app: &Router, method: Method, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).header("content-type", "application/json").body(Body::from(body)).expect("request");
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, value)
}

fn amount(money: &Value) -> Decimal {
    money["amount"].as_str().and_then(|a| a.parse().ok()).expect("decimal amount")
}

fn rate(point: &Value) -> Decimal {
    point["rate"].as_str().and_then(|r| r.parse().ok()).expect("decimal rate")
}

fn checkout_body(session: &str, promo: Option<&str>) -> Value {
    json!({
        "sessionId": session,
        "customer": { "name": "Laila Nabil", "email": "laila@example.com" },
        "shippingAddress": { "address": "22 Corniche Rd", "city": "Alexandria", "state": "Alexandria", "postalCode": "21500" },
        "paymentMethod": "Credit Card",
        "promoCode": promo,
    })
}

#[tokio::test]
async fn health_reports_service() {
    let (status, body) = call(&app(false), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "sameh-store");
}

#[tokio::test]
async fn product_listing_filters_and_paginates() {
    let app = app(true);
    let (status, body) = call(&app, Method::GET, "/api/v1/products?category=sports&per_page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (_, body) = call(&app, Method::GET, "/api/v1/products?search=camera", None).await;
    assert_eq!(body["total"], 2);

    let (_, featured) = call(&app, Method::GET, "/api/v1/products/featured", None).await;
    assert_eq!(featured.as_array().map(Vec::len), Some(3));

    let (status, body) = call(&app, Method::GET, "/api/v1/products/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn create_product_validates_form() {
    let app = app(false);
    let bad = json!({ "name": "", "description": "x", "price": "10", "stock": 1, "category": "home" });
    let (status, body) = call(&app, Method::POST, "/api/v1/products", Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let good = json!({ "name": "Desk Lamp", "description": "Warm light", "price": "249.50", "stock": 4, "discount": 10, "category": "home" });
    let (status, body) = call(&app, Method::POST, "/api/v1/products", Some(good)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(amount(&body["price"]), Decimal::new(24950, 2));

    let (_, categories) = call(&app, Method::GET, "/api/v1/categories", None).await;
    assert_eq!(categories[0]["productCount"], 1);
}

#[tokio::test]
async fn cart_to_checkout_flow() {
    let app = app(true);
    let add = json!({ "productId": "prod-12", "quantity": 1 });
    call(&app, Method::POST, "/api/v1/cart/s-1/items", Some(add.clone())).await;
    let (status, cart) = call(&app, Method::POST, "/api/v1/cart/s-1/items", Some(add)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["totalItems"], 2);
    assert_eq!(amount(&cart["subtotal"]), Decimal::new(39998, 2));

    let (_, quote) = call(&app, Method::POST, "/api/v1/cart/s-1/quote", Some(json!({}))).await;
    assert_eq!(amount(&quote["shipping"]), Decimal::new(50, 0));
    assert_eq!(amount(&quote["total"]), Decimal::new(44998, 2));

    let (status, order) = call(&app, Method::POST, "/api/v1/checkout", Some(checkout_body("s-1", None))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "processing");
    assert_eq!(order["paymentStatus"], "paid");

    let (_, product) = call(&app, Method::GET, "/api/v1/products/prod-12", None).await;
    assert_eq!(product["stock"], 33);
    let (_, cart) = call(&app, Method::GET, "/api/v1/cart/s-1", None).await;
    assert_eq!(cart["totalItems"], 0);

    let (status, body) = call(&app, Method::POST, "/api/v1/checkout", Some(checkout_body("s-1", None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "cart is empty");
}

#[tokio::test]
async fn decrementing_last_unit_removes_line() {
    let app = app(true);
    call(&app, Method::POST, "/api/v1/cart/s-2/items", Some(json!({ "productId": "prod-7" }))).await;
    let (status, cart) = call(&app, Method::POST, "/api/v1/cart/s-2/items/prod-7/decrement", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn promo_codes_apply_at_checkout() {
    let app = app(true);
    let (status, quote) = call(&app, Method::POST, "/api/v1/promo-codes/validate", Some(json!({ "code": "summer20", "subtotal": "1200" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&quote["discount"]), Decimal::new(24000, 2));

    let (status, body) = call(&app, Method::POST, "/api/v1/promo-codes/validate", Some(json!({ "code": "SUMMER20", "subtotal": "300" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().is_some_and(|m| m.contains("minimum")));

    call(&app, Method::POST, "/api/v1/cart/s-3/items", Some(json!({ "productId": "prod-10", "quantity": 1 }))).await;
    let (status, order) = call(&app, Method::POST, "/api/v1/checkout", Some(checkout_body("s-3", Some("FIXED100")))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(amount(&order["discount"]), Decimal::new(100, 0));
    assert_eq!(order["promoCode"], "FIXED100");

    let (_, promos) = call(&app, Method::GET, "/api/v1/promo-codes?search=fixed", None).await;
    assert_eq!(promos["data"][0]["usedCount"], 16);
}

#[tokio::test]
async fn order_status_transitions_are_enforced() {
    let app = app(true);
    let (status, order) = call(&app, Method::PUT, "/api/v1/orders/ORD-1236/status", Some(json!({ "status": "shipped" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "shipped");

    let (status, body) = call(&app, Method::PUT, "/api/v1/orders/ORD-1234/status", Some(json!({ "status": "pending" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (_, list) = call(&app, Method::GET, "/api/v1/orders?status=shipped", None).await;
    assert_eq!(list["total"], 2);
}

#[tokio::test]
async fn ticket_reply_and_close() {
    let app = app(true);
    let (status, ticket) = call(&app, Method::POST, "/api/v1/tickets/ticket-1/messages", Some(json!({ "sender": "agent", "text": "Checking now" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "answered");

    call(&app, Method::POST, "/api/v1/tickets/ticket-1/close", None).await;
    let (status, _) = call(&app, Method::POST, "/api/v1/tickets/ticket-1/messages", Some(json!({ "sender": "customer", "text": "Any news?" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, Method::POST, "/api/v1/tickets/ticket-2/messages", Some(json!({ "sender": "agent", "text": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_round_trip() {
    let app = app(true);
    let form = json!({
        "fullName": "Nour Adel", "email": "nour@example.com", "mobile": "01098765432", "gender": "female",
        "country": "Egypt", "city": "Giza", "address": "8 Pyramids Rd", "postalCode": "12511", "birthDate": "1990-02-14",
        "password": "Secure#2024", "confirmPassword": "Secure#2024", "acceptTerms": true,
        "securityQuestion": "city", "securityAnswer": "Giza",
    });
    let (status, challenge) = call(&app, Method::POST, "/api/v1/register", Some(form)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let code = challenge["code"].as_str().expect("code").to_string();

    let (status, user) = call(&app, Method::POST, "/api/v1/register/verify", Some(json!({ "email": "nour@example.com", "code": code }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["isActive"], true);

    let (_, users) = call(&app, Method::GET, "/api/v1/users?search=nour", None).await;
    assert_eq!(users["total"], 1);
}

#[tokio::test]
async fn account_payment_methods_are_masked() {
    let app = app(true);
    let card = json!({ "cardNumber": "4111111111111111", "cardHolder": "John Doe", "expiryDate": "09/28", "cvv": "123" });
    let (status, user) = call(&app, Method::POST, "/api/v1/users/user-1/payment-methods", Some(card)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["paymentMethods"][0]["cardNumber"], "**** **** **** 1111");
    assert_eq!(user["paymentMethods"][0]["isDefault"], true);

    let bad = json!({ "cardNumber": "4111", "cardHolder": "John Doe", "expiryDate": "9/28", "cvv": "1" });
    let (status, _) = call(&app, Method::POST, "/api/v1/users/user-1/payment-methods", Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn dashboard_and_preferences() {
    let app = app(true);
    let (_, stats) = call(&app, Method::GET, "/api/v1/admin/stats", None).await;
    assert_eq!(stats["orderCount"], 3);
    assert_eq!(stats["openTickets"], 3);

    let (_, sales) = call(&app, Method::GET, "/api/v1/admin/sales?period=week", None).await;
    assert_eq!(sales.as_array().map(Vec::len), Some(7));

    let (_, color) = call(&app, Method::GET, "/api/v1/preferences/accent-color", None).await;
    assert_eq!(color["accentColor"], "blue");
    let (status, color) = call(&app, Method::PUT, "/api/v1/preferences/accent-color", Some(json!({ "accentColor": "green" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(color["accentColor"], "green");
}

#[tokio::test]
async fn malformed_requests_use_error_envelope() {
    let app = app(false);
    let out_of_range = json!({ "name": "Lamp", "description": "Warm light", "price": "10", "stock": 1, "discount": 300, "category": "home" });
    let (status, body) = call(&app, Method::POST, "/api/v1/products", Some(out_of_range)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(body["error"]["message"].as_str().is_some_and(|m| m.contains("discount")));

    let (status, body) = call_raw(&app, Method::POST, "/api/v1/products", "{ not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = call(&app, Method::GET, "/api/v1/products?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn cancelling_imported_order_keeps_stock() {
    let app = app(true);
    let (status, order) = call(&app, Method::PUT, "/api/v1/orders/ORD-1236/status", Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["paymentStatus"], "refunded");
    let (_, product) = call(&app, Method::GET, "/api/v1/products/prod-3", None).await;
    assert_eq!(product["stock"], 25);

    call(&app, Method::POST, "/api/v1/cart/s-4/items", Some(json!({ "productId": "prod-3", "quantity": 2 }))).await;
    let (_, placed) = call(&app, Method::POST, "/api/v1/checkout", Some(checkout_body("s-4", None))).await;
    let uri = format!("/api/v1/orders/{}/status", placed["id"].as_str().expect("order id"));
    call(&app, Method::PUT, &uri, Some(json!({ "status": "cancelled" }))).await;
    let (_, product) = call(&app, Method::GET, "/api/v1/products/prod-3", None).await;
    assert_eq!(product["stock"], 25);
}

#[tokio::test]
async fn customer_behavior_tracks_abandonment_and_returning_buyers() {
    let app = app(true);
    call(&app, Method::POST, "/api/v1/cart/left/items", Some(json!({ "productId": "prod-7" }))).await;
    let (status, series) = call(&app, Method::GET, "/api/v1/admin/dashboard/customer-behavior?type=cart", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(series.as_array().map(Vec::len), Some(7));
    assert_eq!(rate(&series[6]), Decimal::ONE_HUNDRED);

    for session in ["b-1", "b-2"] {
        call(&app, Method::POST, &format!("/api/v1/cart/{session}/items"), Some(json!({ "productId": "prod-12" }))).await;
        let (status, _) = call(&app, Method::POST, "/api/v1/checkout", Some(checkout_body(session, None))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, series) = call(&app, Method::GET, "/api/v1/admin/dashboard/customer-behavior", None).await;
    assert_eq!(rate(&series[6]).round_dp(2), Decimal::new(3333, 2));
    let (_, series) = call(&app, Method::GET, "/api/v1/admin/dashboard/customer-behavior?type=retention", None).await;
    assert_eq!(rate(&series[6]), Decimal::new(50, 0));

    let (status, body) = call(&app, Method::GET, "/api/v1/admin/dashboard/customer-behavior?type=weekly", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn removing_default_payment_method_promotes_next() {
    let app = app(true);
    let card = |number: &str| json!({ "cardNumber": number, "cardHolder": "John Doe", "expiryDate": "09/28", "cvv": "123" });
    call(&app, Method::POST, "/api/v1/users/user-1/payment-methods", Some(card("4111111111111111"))).await;
    let (_, user) = call(&app, Method::POST, "/api/v1/users/user-1/payment-methods", Some(card("5555555555554444"))).await;
    assert_eq!(user["paymentMethods"][1]["isDefault"], false);

    let first = user["paymentMethods"][0]["id"].as_str().expect("method id").to_string();
    let (status, user) = call(&app, Method::DELETE, &format!("/api/v1/users/user-1/payment-methods/{first}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["paymentMethods"].as_array().map(Vec::len), Some(1));
    assert_eq!(user["paymentMethods"][0]["cardNumber"], "**** **** **** 4444");
    assert_eq!(user["paymentMethods"][0]["isDefault"], true);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/users/user-1/payment-methods/{first}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_quantity_updates_respect_stock() {
    let app = app(true);
    call(&app, Method::POST, "/api/v1/cart/s-5/items", Some(json!({ "productId": "prod-13" }))).await;
    let (status, body) = call(&app, Method::PUT, "/api/v1/cart/s-5/items/prod-13", Some(json!({ "quantity": 6 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    let (status, cart) = call(&app, Method::PUT, "/api/v1/cart/s-5/items/prod-13", Some(json!({ "quantity": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["totalItems"], 5);

    let (status, body) = call(&app, Method::PUT, "/api/v1/cart/s-5/items/prod-7", Some(json!({ "quantity": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn recommendations_skip_the_viewed_product() {
    let app = app(true);
    let (_, recommended) = call(&app, Method::GET, "/api/v1/products/prod-1/recommended", None).await;
    let ids: Vec<&str> = recommended.as_array().expect("list").iter().filter_map(|p| p["id"].as_str()).collect();
    assert_eq!(ids, vec!["prod-2", "prod-3", "prod-5", "prod-6"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn writes_reach_the_file_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    let config = AppConfig::default();
    let app = build_app(AppState::new(Shop::new(Storage::new(FileStore::open(&path).expect("open")), &config)));
    let (status, _) = call(&app, Method::PUT, "/api/v1/preferences/accent-color", Some(json!({ "accentColor": "orange" }))).await;
    assert_eq!(status, StatusCode::OK);

    let reopened = Storage::new(FileStore::open(&path).expect("reopen"));
    assert_eq!(reopened.load_value::<AccentColor>(keys::ACCENT_COLOR), Some(AccentColor::Orange));
}
