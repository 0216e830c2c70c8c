//! Order placement from the bound cart, listing and status changes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use fruit_store_integration_tests::{TestApp, quantities};
use serde_json::{Value, json};

fn checkout() -> Value {
    json!({
        "name": "Alice Rao",
        "contact": "9876543210",
        "address": "12 Orchard Lane, Baner",
        "city": "Pune",
        "pincode": "411045",
        "paymentMethod": "cod",
    })
}

/// A logged-in customer with one mango and two kiwis in the cart.
async fn shopper() -> (TestApp, i64, i64, i64) {
    let mut app = TestApp::new().await;
    let mango = app.seed_product("Mango", 50).await;
    let kiwi = app.seed_product("Kiwi", 40).await;
    let alice = app.signup("alice", "secret1").await;
    app.login("alice", "secret1").await;
    app.add_to_cart(mango, 1).await;
    app.add_to_cart(kiwi, 2).await;
    (app, alice, mango, kiwi)
}

#[tokio::test]
async fn test_place_order_from_cart() {
    let (mut app, alice, mango, kiwi) = shopper().await;
    app.put("/checkout/draft", json!({ "name": "Alice" })).await;

    let mut body = checkout();
    body["itemAddresses"] = json!([{
        "productId": kiwi,
        "address": "Flat 4, Riverside Towers",
        "city": "Mumbai",
        "pincode": "400001",
    }]);
    // Client totals are ignored.
    body["total"] = json!(1);

    let placed = app.post("/orders", body).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    let order = placed.body;
    assert_eq!(order["total"], "130");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["step"], 0);
    assert_eq!(order["userId"], alice);
    assert_eq!(order["userName"], "alice");

    let items = order["items"].as_array().unwrap();
    let address_of = |id: i64| {
        items
            .iter()
            .find(|item| item["productId"] == id)
            .map(|item| item["deliveryAddress"]["city"].clone())
            .unwrap()
    };
    assert_eq!(address_of(mango), "Pune");
    assert_eq!(address_of(kiwi), "Mumbai");

    // Cart and draft are cleared.
    assert!(quantities(&app.get("/cart").await.body).is_empty());
    assert_eq!(app.get("/checkout/draft").await.body["name"], "");

    let mine = app.get(&format!("/orders/user/{alice}")).await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_rejections() {
    let mut app = TestApp::new().await;
    let mango = app.seed_product("Mango", 50).await;

    // Guests cannot order.
    app.add_to_cart(mango, 1).await;
    assert_eq!(app.post("/orders", checkout()).await.status, StatusCode::UNAUTHORIZED);

    app.signup("bob", "secret2").await;
    app.login("bob", "secret2").await;
    app.delete("/cart").await;
    let empty = app.post("/orders", checkout()).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["message"], "Cart is empty");

    app.add_to_cart(mango, 1).await;
    let mut bad = checkout();
    bad["contact"] = json!("12345");
    bad["pincode"] = json!("4110");
    bad["paymentMethod"] = json!("cheque");
    let invalid = app.post("/orders", bad).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    for field in ["contact", "pincode", "paymentMethod"] {
        assert!(invalid.body["errors"].get(field).is_some(), "{field}");
    }

    // Nothing was placed and the cart survives.
    assert_eq!(quantities(&app.get("/cart").await.body), vec![(mango, 1)]);
}

#[tokio::test]
async fn test_status_changes() {
    let (mut app, alice, _, _) = shopper().await;
    let id = app.post("/orders", checkout()).await.body["id"].as_i64().unwrap();
    let uri = format!("/orders/{id}");

    // Customers may only cancel a pending order of their own.
    let confirm = app.put(&uri, json!({ "status": "confirmed" })).await;
    assert_eq!(confirm.status, StatusCode::FORBIDDEN);

    let invalid = app.put(&uri, json!({ "status": "lost" })).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    for status in [json!(3), Value::Null, json!(["cancelled"])] {
        let typed = app.put(&uri, json!({ "status": status.clone() })).await;
        assert_eq!(typed.status, StatusCode::BAD_REQUEST, "{status}");
        assert!(typed.body["message"].is_string(), "{status}");
    }

    let missing = app.put("/orders/9999", json!({ "status": "cancelled" })).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let mut stranger = app.other_visitor();
    stranger.signup("carol", "secret3").await;
    stranger.login("carol", "secret3").await;
    let foreign = stranger.put(&uri, json!({ "status": "cancelled" })).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    let foreign_list = stranger.get(&format!("/orders/user/{alice}")).await;
    assert_eq!(foreign_list.status, StatusCode::FORBIDDEN);

    let cancelled = app.put(&uri, json!({ "status": "cancelled" })).await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["status"], "cancelled");
    assert_eq!(cancelled.body["step"], 4);

    // Admins may move an order anywhere.
    let mut admin = app.other_visitor();
    admin.login_admin().await;
    let shipped = admin.put(&uri, json!({ "status": "shipped" })).await;
    assert_eq!(shipped.status, StatusCode::OK);
    assert_eq!(shipped.body["step"], 2);

    let again = app.put(&uri, json!({ "status": "cancelled" })).await;
    assert_eq!(again.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_order_listing() {
    let (mut app, alice, _, _) = shopper().await;
    app.post("/orders", checkout()).await;

    assert_eq!(app.get("/orders").await.status, StatusCode::FORBIDDEN);

    let mut admin = app.other_visitor();
    admin.login_admin().await;
    let all = admin.get("/orders").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 1);

    let by_city = admin.get("/orders?q=pune").await;
    assert_eq!(by_city.body.as_array().unwrap().len(), 1);
    let none = admin.get("/orders?q=chennai").await;
    assert!(none.body.as_array().unwrap().is_empty());

    let for_alice = admin.get(&format!("/orders/user/{alice}")).await;
    assert_eq!(for_alice.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_keeps_prices_after_catalog_edit() {
    let (mut app, alice, mango, kiwi) = shopper().await;
    let order = app.post("/orders", checkout()).await.body;
    assert_eq!(order["total"], "130");

    let mut admin = app.other_visitor();
    admin.login_admin().await;
    for (id, title, price) in [(mango, "Mango", 75), (kiwi, "Kiwi", 10)] {
        let edited = admin
            .put(
                &format!("/products/{id}"),
                json!({
                    "title": title,
                    "owner": "Orchard Co-op",
                    "brand": "Orchard Fresh",
                    "price": price,
                    "images": ["fruit.jpg"],
                    "description": "Repriced for the new season",
                    "category": "fruit",
                    "rating": 4,
                    "stock": 25,
                    "warranty": "none",
                }),
            )
            .await;
        assert_eq!(edited.status, StatusCode::OK, "{:?}", edited.body);
        assert_eq!(edited.body["price"], price.to_string());
    }

    let stored = app.get(&format!("/orders/user/{alice}")).await.body;
    let stored = &stored[0];
    assert_eq!(stored["total"], "130");
    let price_of = |id: i64| {
        stored["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|item| item["productId"] == id)
            .map(|item| item["price"].clone())
            .unwrap()
    };
    assert_eq!(price_of(mango), "50");
    assert_eq!(price_of(kiwi), "40");
}
