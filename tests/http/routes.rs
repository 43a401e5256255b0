use reqwest::Method;
use serde_json::{json, Value};

use crate::support::start;

#[tokio::test]
async fn health_needs_no_credentials() {
    let server = start().await;
    let resp = server.call(Method::GET, "/health", None, None).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let server = start().await;
    let resp = server.call(Method::GET, "/cart", None, None).await;
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().is_some());

    let resp = server.call(Method::GET, "/cart", Some("garbage"), None).await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let server = start().await;
    let customer = server.signup("cora", "Customer").await;
    let resp = server.call(Method::GET, "/admin/orders", Some(&customer), None).await;
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn duplicate_signup_is_400() {
    let server = start().await;
    server.signup("dup", "Customer").await;
    let resp = server
        .call(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({
                "username": "dup2",
                "email": "dup@example.com",
                "password": "password123",
                "role": "Customer",
            })),
        )
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let server = start().await;
    let resp = server
        .client
        .post(format!("{}/auth/login", server.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn cart_to_order_lifecycle() {
    let server = start().await;
    let admin = server.signup("root", "Admin").await;
    let customer = server.signup("cora", "Customer").await;
    let product = server.product(&admin, "Beam", 4200, 5).await;

    let resp = server
        .call(
            Method::PUT,
            "/cart",
            Some(&customer),
            Some(json!({ "items": [{ "product_id": product, "quantity": 2 }] })),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = server.call(Method::GET, "/cart", Some(&customer), None).await;
    let cart: Value = resp.json().await.unwrap();
    assert_eq!(cart["items"][0]["quantity"], 2);
    assert_eq!(cart["total"], 8400);

    let resp = server
        .call(
            Method::POST,
            "/customer/orders",
            Some(&customer),
            Some(json!({ "totalAmount": 1 })),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["total_amount"], 8400);
    assert_eq!(order["status"], "Pending");
    let order_id = order["id"].as_str().unwrap().to_string();

    let resp = server.call(Method::GET, "/cart", Some(&customer), None).await;
    let cart: Value = resp.json().await.unwrap();
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);

    let resp = server
        .call(
            Method::PUT,
            &format!("/admin/orders/{order_id}"),
            Some(&admin),
            Some(json!({ "status": "Processing" })),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = server
        .call(
            Method::PUT,
            &format!("/admin/orders/{order_id}"),
            Some(&admin),
            Some(json!({ "status": "Pending" })),
        )
        .await;
    assert_eq!(resp.status(), 400);

    let resp = server
        .call(Method::GET, &format!("/customer/orders/{order_id}"), Some(&customer), None)
        .await;
    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["status"], "Processing");
}

#[tokio::test]
async fn insufficient_stock_is_409() {
    let server = start().await;
    let admin = server.signup("root", "Admin").await;
    let customer = server.signup("cora", "Customer").await;
    let product = server.product(&admin, "Beam", 100, 1).await;

    let resp = server
        .call(
            Method::POST,
            "/customer/orders",
            Some(&customer),
            Some(json!({ "items": [{ "product_id": product, "quantity": 2 }] })),
        )
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("insufficient stock"));
}

#[tokio::test]
async fn admin_search_and_listing() {
    let server = start().await;
    let admin = server.signup("root", "Admin").await;
    server.product(&admin, "Copper Wire", 300, 9).await;
    server.product(&admin, "Steel Wool", 150, 9).await;

    let resp = server
        .call(Method::GET, "/admin/products/search?query=copper", Some(&admin), None)
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 1);

    let resp = server
        .call(Method::GET, "/admin/products/search?query=", Some(&admin), None)
        .await;
    assert_eq!(resp.status(), 400);

    let resp = server.call(Method::GET, "/products", None, None).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn deleted_user_token_is_rejected() {
    let server = start().await;
    let admin = server.signup("root", "Admin").await;
    let customer = server.signup("cora", "Customer").await;

    let resp = server.call(Method::GET, "/auth/me", Some(&customer), None).await;
    let me: Value = resp.json().await.unwrap();
    let id = me["id"].as_str().unwrap().to_string();

    let resp = server
        .call(Method::DELETE, &format!("/admin/users/{id}"), Some(&admin), None)
        .await;
    assert_eq!(resp.status(), 200);

    let resp = server.call(Method::GET, "/cart", Some(&customer), None).await;
    assert_eq!(resp.status(), 401);

    let resp = server.call(Method::GET, "/admin/users", Some(&admin), None).await;
    let users: Value = resp.json().await.unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
}
