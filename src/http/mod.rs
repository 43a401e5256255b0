//! HTTP transport.
//!
//! Every route authenticates through [`Auth`] where required, then runs the
//! matching [`Shop`] operation on the blocking pool (store and lock access
//! are synchronous). Errors render as `{"error": "<message>"}` with the
//! status from [`ShopError::status_code`].

mod error;
mod extract;
mod handlers;

use std::future::Future;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ShopError;
use crate::model::ModelStore;
use crate::shop::Shop;

pub use extract::{Auth, Body, Params};

/// Routes only, without CORS or tracing layers.
pub fn router<S: ModelStore>(shop: Shop<S>) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(signup::<S>))
        .route("/auth/login", post(login::<S>))
        .route("/auth/change-password", post(change_password::<S>))
        .route("/auth/me", get(me::<S>))
        .route("/auth/profile", put(update_profile::<S>))
        .route("/products", get(public_products::<S>))
        .route("/products/:id", get(public_product::<S>))
        .route("/cart", get(get_cart::<S>).put(replace_cart::<S>).delete(clear_cart::<S>))
        .route("/cart/items", post(add_cart_item::<S>))
        .route(
            "/cart/items/:product_id",
            put(update_cart_item::<S>).delete(remove_cart_item::<S>),
        )
        .route(
            "/customer/orders",
            get(customer_orders::<S>).post(checkout::<S>),
        )
        .route("/customer/orders/:id", get(customer_order::<S>))
        .route("/admin/orders", get(all_orders::<S>))
        .route(
            "/admin/orders/:id",
            get(admin_order::<S>).put(update_order_status::<S>),
        )
        .route(
            "/admin/products",
            get(admin_products::<S>).post(create_product::<S>),
        )
        .route("/admin/products/search", get(search_products::<S>))
        .route(
            "/admin/products/:id",
            get(admin_product::<S>)
                .put(update_product::<S>)
                .delete(delete_product::<S>),
        )
        .route("/admin/users", get(list_users::<S>))
        .route("/admin/users/:id", axum::routing::delete(delete_user::<S>))
        .route("/admin/users/:id/role", put(set_user_role::<S>))
        .route("/admin/users/:id/reset-password", put(reset_password::<S>))
        .route(
            "/seller/products",
            get(seller_products::<S>).post(create_product::<S>),
        )
        .route(
            "/seller/products/:id",
            put(update_product::<S>).delete(delete_product::<S>),
        )
        .with_state(shop)
}

/// Router with request tracing and CORS for `origin`.
pub fn app<S: ModelStore>(shop: Shop<S>, origin: &str) -> Result<Router, ShopError> {
    Ok(router(shop)
        .layer(cors_layer(origin)?)
        .layer(TraceLayer::new_for_http()))
}

pub fn cors_layer(origin: &str) -> Result<CorsLayer, ShopError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|_| ShopError::validation(format!("invalid CORS origin: {}", origin)))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60)))
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
