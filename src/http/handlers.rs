use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{Auth, Body, Params};
use crate::cart::CartItem;
use crate::catalog::{NewProduct, ProductFilter, ProductPatch};
use crate::error::ShopError;
use crate::identity::Role;
use crate::ids::{OrderId, ProductId, UserId};
use crate::model::ModelStore;
use crate::shop::{ChangePasswordRequest, LoginRequest, Shop, SignupRequest};

type Reply = Result<Json<Value>, ShopError>;

/// Run a shop operation on the blocking pool and render its result as JSON.
async fn run<S, T, F>(shop: Shop<S>, op: F) -> Reply
where
    S: ModelStore,
    T: serde::Serialize + Send + 'static,
    F: FnOnce(&Shop<S>) -> Result<T, ShopError> + Send + 'static,
{
    let value = tokio::task::spawn_blocking(move || op(&shop))
        .await
        .map_err(|e| ShopError::Internal(format!("worker task failed: {}", e)))??;
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ShopError::Internal(format!("response encoding failed: {}", e)))
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

// Identity

pub async fn signup<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Body(req): Body<SignupRequest>,
) -> Result<impl IntoResponse, ShopError> {
    let created = run(shop, move |shop| shop.signup(req)).await?;
    Ok((StatusCode::CREATED, created))
}

pub async fn login<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Body(req): Body<LoginRequest>,
) -> Reply {
    run(shop, move |shop| shop.login(req)).await
}

pub async fn change_password<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Body(req): Body<ChangePasswordRequest>,
) -> Reply {
    run(shop, move |shop| shop.change_password(&actor, req)).await
}

pub async fn me<S: ModelStore>(State(shop): State<Shop<S>>, Auth(actor): Auth) -> Reply {
    run(shop, move |shop| shop.profile(&actor)).await
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    username: String,
}

pub async fn update_profile<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Body(update): Body<ProfileUpdate>,
) -> Reply {
    run(shop, move |shop| shop.update_username(&actor, &update.username)).await
}

// Catalog

pub async fn public_products<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Params(filter): Params<ProductFilter>,
) -> Reply {
    run(shop, move |shop| shop.products(&filter)).await
}

pub async fn public_product<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Path(id): Path<String>,
) -> Reply {
    run(shop, move |shop| shop.product(&ProductId::from(id))).await
}

pub async fn admin_products<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Params(filter): Params<ProductFilter>,
) -> Reply {
    run(shop, move |shop| shop.admin_products(&actor, &filter)).await
}

pub async fn admin_product<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
) -> Reply {
    run(shop, move |shop| {
        actor.require(crate::access::roles::CATALOG_VIEWERS)?;
        shop.product(&ProductId::from(id))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    query: String,
}

pub async fn search_products<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Params(params): Params<SearchParams>,
) -> Reply {
    run(shop, move |shop| shop.search_products(&actor, &params.query)).await
}

pub async fn seller_products<S: ModelStore>(State(shop): State<Shop<S>>, Auth(actor): Auth) -> Reply {
    run(shop, move |shop| shop.seller_products(&actor)).await
}

pub async fn create_product<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Body(new): Body<NewProduct>,
) -> Result<impl IntoResponse, ShopError> {
    let created = run(shop, move |shop| shop.create_product(&actor, new)).await?;
    Ok((StatusCode::CREATED, created))
}

pub async fn update_product<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
    Body(patch): Body<ProductPatch>,
) -> Reply {
    run(shop, move |shop| shop.update_product(&actor, &ProductId::from(id), &patch)).await
}

pub async fn delete_product<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
) -> Reply {
    run(shop, move |shop| shop.delete_product(&actor, &ProductId::from(id))).await?;
    Ok(message("product deleted"))
}

// Cart

#[derive(Debug, Deserialize)]
pub struct CartBody {
    items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    product_id: ProductId,
    #[serde(default = "one")]
    quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    quantity: u32,
}

pub async fn get_cart<S: ModelStore>(State(shop): State<Shop<S>>, Auth(actor): Auth) -> Reply {
    run(shop, move |shop| shop.cart(&actor)).await
}

pub async fn replace_cart<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Body(body): Body<CartBody>,
) -> Reply {
    run(shop, move |shop| shop.replace_cart(&actor, body.items)).await
}

pub async fn clear_cart<S: ModelStore>(State(shop): State<Shop<S>>, Auth(actor): Auth) -> Reply {
    run(shop, move |shop| shop.clear_cart(&actor)).await?;
    Ok(message("cart cleared"))
}

pub async fn add_cart_item<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Body(body): Body<AddItem>,
) -> Reply {
    run(shop, move |shop| shop.add_to_cart(&actor, body.product_id, body.quantity)).await
}

pub async fn update_cart_item<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(product_id): Path<String>,
    Body(body): Body<QuantityBody>,
) -> Reply {
    run(shop, move |shop| {
        shop.update_cart_item(&actor, &ProductId::from(product_id), body.quantity)
    })
    .await
}

pub async fn remove_cart_item<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(product_id): Path<String>,
) -> Reply {
    run(shop, move |shop| shop.remove_cart_item(&actor, &ProductId::from(product_id))).await
}

// Orders

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    #[serde(default)]
    items: Option<Vec<CartItem>>,
}

/// An empty body checks out the stored cart. Any client-sent total is ignored.
pub async fn checkout<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    body: Bytes,
) -> Result<impl IntoResponse, ShopError> {
    let items = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<CheckoutBody>(&body)
            .map_err(|e| ShopError::validation(format!("invalid checkout body: {}", e)))?
            .items
    };
    let order = run(shop, move |shop| shop.checkout(&actor, items)).await?;
    Ok((StatusCode::CREATED, order))
}

pub async fn customer_orders<S: ModelStore>(State(shop): State<Shop<S>>, Auth(actor): Auth) -> Reply {
    run(shop, move |shop| shop.customer_orders(&actor)).await
}

pub async fn customer_order<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
) -> Reply {
    run(shop, move |shop| shop.customer_order(&actor, &OrderId::from(id))).await
}

pub async fn all_orders<S: ModelStore>(State(shop): State<Shop<S>>, Auth(actor): Auth) -> Reply {
    run(shop, move |shop| shop.all_orders(&actor)).await
}

pub async fn admin_order<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
) -> Reply {
    run(shop, move |shop| shop.order(&actor, &OrderId::from(id))).await
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    status: String,
}

pub async fn update_order_status<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
    Body(body): Body<StatusBody>,
) -> Reply {
    run(shop, move |shop| {
        let next = body.status.parse()?;
        shop.update_order_status(&actor, &OrderId::from(id), next)
    })
    .await
}

// Admin: users

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    role: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetBody {
    #[serde(alias = "newPassword")]
    new_password: String,
}

pub async fn list_users<S: ModelStore>(State(shop): State<Shop<S>>, Auth(actor): Auth) -> Reply {
    run(shop, move |shop| shop.list_users(&actor)).await
}

pub async fn set_user_role<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
    Body(body): Body<RoleBody>,
) -> Reply {
    run(shop, move |shop| {
        let role: Role = body.role.parse()?;
        shop.set_user_role(&actor, &UserId::from(id), role)
    })
    .await
}

pub async fn delete_user<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
) -> Reply {
    run(shop, move |shop| shop.delete_user(&actor, &UserId::from(id))).await?;
    Ok(message("user deleted"))
}

pub async fn reset_password<S: ModelStore>(
    State(shop): State<Shop<S>>,
    Auth(actor): Auth,
    Path(id): Path<String>,
    Body(body): Body<ResetBody>,
) -> Reply {
    run(shop, move |shop| shop.reset_password(&actor, &UserId::from(id), &body.new_password)).await?;
    Ok(message("password reset"))
}
