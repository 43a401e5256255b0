//! Session-scoped client against a live server.

use chrono::Duration;
use metal_factory::client::{ApiClient, ClientError};
use metal_factory::{
    http, CartItem, InMemoryModelStore, NewProduct, OrderStatus, PasswordHasher, Role, Shop,
    TokenSigner,
};

async fn start() -> String {
    let signer = TokenSigner::new("client-secret", Duration::hours(1)).unwrap();
    let shop = Shop::new(InMemoryModelStore::new(), signer).with_hasher(PasswordHasher::with_cost(8, 1).unwrap());
    let app = http::router(shop);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn two_sessions_side_by_side() {
    let base = start().await;
    let anon = ApiClient::new(&base);
    assert!(anon.token().is_none());

    let (admin, _) = anon
        .signup("root", "root@example.com", "password123", Role::Admin)
        .await
        .unwrap();
    let (customer, profile) = anon
        .signup("cora", "cora@example.com", "password123", Role::Customer)
        .await
        .unwrap();
    assert_eq!(profile.user.role, Role::Customer);
    assert_ne!(admin.token(), customer.token());

    let product = admin
        .create_product(&NewProduct {
            name: "Rivet".into(),
            price: 25,
            stock: 100,
            category: "Fasteners".into(),
            ..NewProduct::default()
        })
        .await
        .unwrap();

    customer
        .replace_cart(&[CartItem::new(product.id.clone(), 4)])
        .await
        .unwrap();
    assert_eq!(customer.cart().await.unwrap().total, 100);

    let order = customer.checkout().await.unwrap();
    assert_eq!(customer.orders().await.unwrap().len(), 1);

    let shipped = admin
        .update_order_status(&order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Processing);
    assert_eq!(customer.order(&order.id).await.unwrap().status, OrderStatus::Processing);
    assert_eq!(anon.products().await.unwrap().products[0].stock, 96);
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let base = start().await;
    let anon = ApiClient::new(&base);

    let err = anon.cart().await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status.as_u16(), 401);
            assert!(!message.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }

    anon.signup("cora", "cora@example.com", "password123", Role::Customer)
        .await
        .unwrap();
    let err = anon
        .login("cora@example.com", "password123", Role::Seller)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status, .. } if status.as_u16() == 401));
}
