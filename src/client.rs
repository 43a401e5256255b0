//! Session-scoped HTTP client.
//!
//! An `ApiClient` owns its credential. Logging in returns a new client
//! carrying the token instead of mutating shared state, so two sessions can
//! coexist in one process.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::cart::{CartItem, CartView};
use crate::catalog::{Product, ProductList};
use crate::identity::Role;
use crate::ids::OrderId;
use crate::order::{OrderStatus, OrderView};
use crate::shop::{AuthResponse, LoginRequest, SignupRequest};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("api error {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    /// Same server and connection pool, different credential.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            base_url: self.base_url.clone(),
            token: Some(token.into()),
            http: self.http.clone(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<(ApiClient, AuthResponse), ClientError> {
        let req = SignupRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: role.to_string(),
        };
        let auth: AuthResponse = self.send(Method::POST, "/auth/signup", Some(&req)).await?;
        Ok((self.with_token(auth.token.clone()), auth))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<(ApiClient, AuthResponse), ClientError> {
        let req = LoginRequest {
            email: email.into(),
            password: password.into(),
            role: role.to_string(),
        };
        let auth: AuthResponse = self.send(Method::POST, "/auth/login", Some(&req)).await?;
        Ok((self.with_token(auth.token.clone()), auth))
    }

    pub async fn products(&self) -> Result<ProductList, ClientError> {
        self.send(Method::GET, "/products", None::<&()>).await
    }

    pub async fn create_product(&self, product: &crate::catalog::NewProduct) -> Result<Product, ClientError> {
        self.send(Method::POST, "/admin/products", Some(product)).await
    }

    pub async fn cart(&self) -> Result<CartView, ClientError> {
        self.send(Method::GET, "/cart", None::<&()>).await
    }

    pub async fn replace_cart(&self, items: &[CartItem]) -> Result<CartView, ClientError> {
        self.send(Method::PUT, "/cart", Some(&json!({ "items": items })))
            .await
    }

    /// Check out the stored cart.
    pub async fn checkout(&self) -> Result<OrderView, ClientError> {
        self.send(Method::POST, "/customer/orders", None::<&()>).await
    }

    pub async fn orders(&self) -> Result<Vec<OrderView>, ClientError> {
        self.send(Method::GET, "/customer/orders", None::<&()>).await
    }

    pub async fn order(&self, id: &OrderId) -> Result<OrderView, ClientError> {
        self.send(Method::GET, &format!("/customer/orders/{}", id), None::<&()>)
            .await
    }

    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderView, ClientError> {
        self.send(
            Method::PUT,
            &format!("/admin/orders/{}", id),
            Some(&json!({ "status": status })),
        )
        .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Api { status, message });
        }
        Ok(resp.json().await?)
    }
}
