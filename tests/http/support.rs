use chrono::Duration;
use metal_factory::{http, InMemoryModelStore, PasswordHasher, Shop, TokenSigner};
use reqwest::{Client, Method, Response};
use serde_json::{json, Value};

pub struct Server {
    pub base: String,
    pub client: Client,
}

/// Bind to port 0 and serve the full app (CORS and tracing layers included).
pub async fn start() -> Server {
    let signer = TokenSigner::new("http-secret", Duration::hours(1)).unwrap();
    let shop = Shop::new(InMemoryModelStore::new(), signer).with_hasher(PasswordHasher::with_cost(8, 1).unwrap());
    let app = http::app(shop, "http://localhost:5173").unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Server {
        base: format!("http://{addr}"),
        client: Client::new(),
    }
}

impl Server {
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut req = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        req.send().await.unwrap()
    }

    /// Sign up `name@example.com` and return its token.
    pub async fn signup(&self, name: &str, role: &str) -> String {
        let resp = self
            .call(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({
                    "username": name,
                    "email": format!("{name}@example.com"),
                    "password": "password123",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn product(&self, admin: &str, name: &str, price: u64, stock: u32) -> String {
        let resp = self
            .call(
                Method::POST,
                "/admin/products",
                Some(admin),
                Some(json!({ "name": name, "price": price, "stock": stock, "category": "Steel" })),
            )
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}
