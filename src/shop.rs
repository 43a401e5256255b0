//! `Shop` wires the stores, the gate and the checkout engine together and
//! exposes every role-scoped operation as a method taking a [`Principal`].
//!
//! Transports (the axum router, tests) authenticate first with
//! [`Shop::authenticate`] and then call the operation; each operation checks
//! its own allowed-role set.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::access::{roles, Gate, Principal};
use crate::cart::{Cart, CartItem, CartLine, CartView};
use crate::catalog::{Catalog, NewProduct, Product, ProductFilter, ProductList, ProductPatch};
use crate::checkout::Checkout;
use crate::error::ShopError;
use crate::identity::{PasswordHasher, Role, TokenSigner, User, UserProfile, MIN_PASSWORD_LEN};
use crate::ids::{OrderId, ProductId, UserId};
use crate::lock::{InMemoryLockManager, LockManager};
use crate::model::{ModelError, ModelStore, ModelsExt};
use crate::order::{Order, OrderLineView, OrderStatus, OrderView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

pub struct Shop<S, L = InMemoryLockManager> {
    store: S,
    catalog: Catalog<S>,
    gate: Gate<S>,
    hasher: PasswordHasher,
    locks: Arc<L>,
}

impl<S: Clone, L> Clone for Shop<S, L> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            catalog: self.catalog.clone(),
            gate: self.gate.clone(),
            hasher: self.hasher.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: ModelStore> Shop<S, InMemoryLockManager> {
    pub fn new(store: S, signer: TokenSigner) -> Self {
        Self::with_locks(store, signer, InMemoryLockManager::new())
    }
}

impl<S: ModelStore, L: LockManager> Shop<S, L> {
    pub fn with_locks(store: S, signer: TokenSigner, locks: L) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            gate: Gate::new(store.clone(), signer),
            store,
            hasher: PasswordHasher::default(),
            locks: Arc::new(locks),
        }
    }

    /// Replace the password hasher (tests use a cheap cost).
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn gate(&self) -> &Gate<S> {
        &self.gate
    }

    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, ShopError> {
        self.gate.authenticate(authorization)
    }

    pub fn signup(&self, req: SignupRequest) -> Result<AuthResponse, ShopError> {
        let username = req.username.trim();
        if username.is_empty() {
            return Err(ShopError::validation("username is required"));
        }
        let email = User::normalize_email(&req.email);
        if email.is_empty() || !email.contains('@') {
            return Err(ShopError::validation("a valid email is required"));
        }
        check_password(&req.password)?;
        let role: Role = req.role.parse()?;

        let _guard = self.locks.acquire(&format!("user-email:{}", email))?;
        if self.user_by_email(&email)?.is_some() {
            return Err(ShopError::Conflict("email already exists".into()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            username: username.to_string(),
            email,
            password_hash: self.hash_password(&req.password)?,
            role,
            credential_epoch: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.models::<User>().insert(&user)?;
        info!(user = %user.id, role = %user.role, "user signed up");

        self.auth_response(&user)
    }

    /// Every failure is the same `Unauthenticated` error, including a
    /// correct password presented under the wrong role.
    pub fn login(&self, req: LoginRequest) -> Result<AuthResponse, ShopError> {
        let role: Role = req.role.parse()?;
        let email = User::normalize_email(&req.email);
        let invalid = || ShopError::unauthenticated("invalid credentials");

        let Some(user) = self.user_by_email(&email)? else {
            warn!("login failed: unknown email");
            return Err(invalid());
        };
        if !self.hasher.verify(&req.password, &user.password_hash) {
            warn!(user = %user.id, "login failed: wrong password");
            return Err(invalid());
        }
        if user.role != role {
            warn!(user = %user.id, selected = %role, "login failed: role mismatch");
            return Err(invalid());
        }

        info!(user = %user.id, role = %user.role, "user logged in");
        self.auth_response(&user)
    }

    pub fn profile(&self, actor: &Principal) -> Result<UserProfile, ShopError> {
        Ok(self.user(&actor.user_id)?.profile())
    }

    pub fn update_username(&self, actor: &Principal, username: &str) -> Result<UserProfile, ShopError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ShopError::validation("username is required"));
        }
        let user = self.modify_user(&actor.user_id, |user| {
            user.username = username.to_string();
            Ok(())
        })?;
        Ok(user.profile())
    }

    /// Bumps the credential epoch, so tokens issued before the change stop working.
    pub fn change_password(
        &self,
        actor: &Principal,
        req: ChangePasswordRequest,
    ) -> Result<AuthResponse, ShopError> {
        if req.current_password.is_empty() || req.new_password.is_empty() {
            return Err(ShopError::validation("current and new passwords are required"));
        }
        check_password(&req.new_password)?;
        let user = self.modify_user(&actor.user_id, |user| {
            if !self.hasher.verify(&req.current_password, &user.password_hash) {
                return Err(ShopError::validation("current password is incorrect"));
            }
            self.set_password(user, &req.new_password)
        })?;
        info!(user = %user.id, "password changed");
        self.auth_response(&user)
    }

    pub fn list_users(&self, actor: &Principal) -> Result<Vec<UserProfile>, ShopError> {
        actor.require(roles::ADMIN)?;
        let mut users = self.store.models::<User>().all()?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users.iter().map(User::profile).collect())
    }

    pub fn set_user_role(
        &self,
        actor: &Principal,
        id: &UserId,
        role: Role,
    ) -> Result<UserProfile, ShopError> {
        actor.require(roles::ADMIN)?;
        let mut previous = role;
        let user = self.modify_user(id, |user| {
            previous = user.role;
            user.role = role;
            Ok(())
        })?;
        info!(user = %id, from = %previous, to = %role, actor = %actor.user_id, "user role changed");
        Ok(user.profile())
    }

    pub fn delete_user(&self, actor: &Principal, id: &UserId) -> Result<(), ShopError> {
        actor.require(roles::ADMIN)?;
        let _guard = self.locks.acquire(&user_lock_key(id))?;
        if !self.store.models::<User>().delete(id.as_str())? {
            return Err(ShopError::not_found("user", id));
        }
        self.store.models::<Cart>().delete(id.as_str())?;
        info!(user = %id, actor = %actor.user_id, "user deleted");
        Ok(())
    }

    pub fn reset_password(
        &self,
        actor: &Principal,
        id: &UserId,
        new_password: &str,
    ) -> Result<(), ShopError> {
        actor.require(roles::ADMIN)?;
        check_password(new_password)?;
        self.modify_user(id, |user| self.set_password(user, new_password))?;
        info!(user = %id, actor = %actor.user_id, "password reset");
        Ok(())
    }

    /// Create an admin account unless one with this email already exists.
    pub fn seed_admin(&self, email: &str, password: &str) -> Result<Option<UserProfile>, ShopError> {
        let email = User::normalize_email(email);
        if self.user_by_email(&email)?.is_some() {
            return Ok(None);
        }
        let username = email.split('@').next().unwrap_or("admin").to_string();
        let response = self.signup(SignupRequest {
            username,
            email,
            password: password.to_string(),
            role: Role::Admin.to_string(),
        })?;
        info!(user = %response.user.id, "seed admin created");
        Ok(Some(response.user))
    }

    /// Public listing; no role required.
    pub fn products(&self, filter: &ProductFilter) -> Result<ProductList, ShopError> {
        Ok(self.catalog.list(filter)?.into())
    }

    pub fn product(&self, id: &ProductId) -> Result<Product, ShopError> {
        self.catalog.get(id)
    }

    pub fn admin_products(&self, actor: &Principal, filter: &ProductFilter) -> Result<ProductList, ShopError> {
        actor.require(roles::CATALOG_VIEWERS)?;
        self.products(filter)
    }

    pub fn search_products(&self, actor: &Principal, query: &str) -> Result<ProductList, ShopError> {
        actor.require(roles::CATALOG_VIEWERS)?;
        Ok(self.catalog.search(query)?.into())
    }

    pub fn create_product(&self, actor: &Principal, new: NewProduct) -> Result<Product, ShopError> {
        actor.require(roles::CATALOG_EDITORS)?;
        self.catalog.create(actor, new)
    }

    pub fn update_product(
        &self,
        actor: &Principal,
        id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ShopError> {
        actor.require(roles::CATALOG_EDITORS)?;
        self.catalog.update(actor, id, patch)
    }

    pub fn delete_product(&self, actor: &Principal, id: &ProductId) -> Result<(), ShopError> {
        actor.require(roles::CATALOG_EDITORS)?;
        self.catalog.delete(actor, id)
    }

    pub fn seller_products(&self, actor: &Principal) -> Result<ProductList, ShopError> {
        actor.require(roles::SELLER)?;
        self.products(&ProductFilter::by_seller(actor.user_id.clone()))
    }

    /// The caller's cart; an empty one if nothing has been saved yet.
    pub fn cart(&self, actor: &Principal) -> Result<CartView, ShopError> {
        actor.require(roles::CUSTOMER)?;
        let cart = self.load_cart(&actor.user_id)?;
        self.cart_view(cart)
    }

    pub fn replace_cart(&self, actor: &Principal, items: Vec<CartItem>) -> Result<CartView, ShopError> {
        actor.require(roles::CUSTOMER)?;
        for item in &items {
            if self.catalog.find(&item.product_id)?.is_none() {
                return Err(ShopError::validation(format!("unknown product: {}", item.product_id)));
            }
        }
        self.edit_cart(actor, |cart, now| cart.replace(items, now))
    }

    pub fn add_to_cart(
        &self,
        actor: &Principal,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, ShopError> {
        actor.require(roles::CUSTOMER)?;
        self.catalog.get(&product_id)?;
        self.edit_cart(actor, |cart, now| cart.add(product_id, quantity, now))
    }

    pub fn update_cart_item(
        &self,
        actor: &Principal,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartView, ShopError> {
        actor.require(roles::CUSTOMER)?;
        self.edit_cart(actor, |cart, now| cart.set_quantity(product_id, quantity, now))
    }

    pub fn remove_cart_item(&self, actor: &Principal, product_id: &ProductId) -> Result<CartView, ShopError> {
        actor.require(roles::CUSTOMER)?;
        self.edit_cart(actor, |cart, now| {
            cart.remove(product_id, now);
            Ok(())
        })
    }

    pub fn clear_cart(&self, actor: &Principal) -> Result<(), ShopError> {
        actor.require(roles::CUSTOMER)?;
        let _guard = self.locks.acquire(&cart_lock_key(&actor.user_id))?;
        self.store.models::<Cart>().delete(actor.user_id.as_str())?;
        Ok(())
    }

    /// Check out `items`, or the stored cart when `items` is `None`. The
    /// stored cart is emptied once the order is committed.
    pub fn checkout(&self, actor: &Principal, items: Option<Vec<CartItem>>) -> Result<OrderView, ShopError> {
        actor.require(roles::CUSTOMER)?;
        let _guard = self.locks.acquire(&cart_lock_key(&actor.user_id))?;

        let items = match items {
            Some(items) => items,
            None => self.load_cart(&actor.user_id)?.items,
        };
        let order = Checkout::new(&self.store, &self.catalog).run(&actor.user_id, &items)?;

        // The order is committed at this point; a failed clear must not turn
        // it into a reported failure.
        if let Err(e) = self.store.models::<Cart>().delete(actor.user_id.as_str()) {
            error!(customer = %actor.user_id, order = %order.id, error = %e, "failed to clear cart after checkout");
        }
        self.order_view(order)
    }

    /// The caller's orders, newest first.
    pub fn customer_orders(&self, actor: &Principal) -> Result<Vec<OrderView>, ShopError> {
        actor.require(roles::CUSTOMER)?;
        let customer = actor.user_id.clone();
        let orders = self.store.models::<Order>().find(&|o| o.customer == customer)?;
        self.order_views(orders)
    }

    pub fn customer_order(&self, actor: &Principal, id: &OrderId) -> Result<OrderView, ShopError> {
        actor.require(roles::CUSTOMER)?;
        let order = self.load_order(id)?;
        if !order.is_owned_by(&actor.user_id) {
            warn!(order = %id, customer = %actor.user_id, "customer requested another customer's order");
            return Err(ShopError::forbidden("not authorized to view this order"));
        }
        self.order_view(order)
    }

    /// Every order, newest first.
    pub fn all_orders(&self, actor: &Principal) -> Result<Vec<OrderView>, ShopError> {
        actor.require(roles::ORDER_MANAGERS)?;
        let orders = self.store.models::<Order>().all()?;
        self.order_views(orders)
    }

    pub fn order(&self, actor: &Principal, id: &OrderId) -> Result<OrderView, ShopError> {
        actor.require(roles::ORDER_MANAGERS)?;
        let order = self.load_order(id)?;
        self.order_view(order)
    }

    pub fn update_order_status(
        &self,
        actor: &Principal,
        id: &OrderId,
        next: OrderStatus,
    ) -> Result<OrderView, ShopError> {
        actor.require(roles::ORDER_MANAGERS)?;
        let _guard = self.locks.acquire(&format!("order:{}", id))?;

        let mut order = self.load_order(id)?;
        let from = order.status;
        order.transition(next, Utc::now())?;
        self.store.models::<Order>().save(&order)?;

        info!(order = %id, from = %from, to = %next, actor = %actor.user_id, "order status changed");
        self.order_view(order)
    }

    fn user(&self, id: &UserId) -> Result<User, ShopError> {
        self.store
            .models::<User>()
            .get(id.as_str())?
            .map(|v| v.data)
            .ok_or_else(|| ShopError::not_found("user", id))
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, ShopError> {
        Ok(self.store.models::<User>().find_one(&|u| u.email == email)?)
    }

    /// Read-modify-write of one user under its lock. The write is a
    /// compare-and-set against the version read, so a user deleted in the
    /// meantime is never written back.
    fn modify_user<F>(&self, id: &UserId, change: F) -> Result<User, ShopError>
    where
        F: FnOnce(&mut User) -> Result<(), ShopError>,
    {
        let _guard = self.locks.acquire(&user_lock_key(id))?;
        let users = self.store.models::<User>();
        let current = users
            .get(id.as_str())?
            .ok_or_else(|| ShopError::not_found("user", id))?;
        let mut user = current.data;
        change(&mut user)?;
        user.updated_at = Utc::now();

        match users.update(&user, current.version) {
            Ok(written) => Ok(written.data),
            Err(ModelError::NotFound { .. }) => Err(ShopError::not_found("user", id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Also bumps the credential epoch; the caller writes the user.
    fn set_password(&self, user: &mut User, password: &str) -> Result<(), ShopError> {
        user.password_hash = self.hash_password(password)?;
        user.credential_epoch = user.credential_epoch.wrapping_add(1);
        Ok(())
    }

    fn hash_password(&self, password: &str) -> Result<String, ShopError> {
        self.hasher
            .hash(password)
            .map_err(|e| ShopError::Internal(format!("password hashing failed: {}", e)))
    }

    fn auth_response(&self, user: &User) -> Result<AuthResponse, ShopError> {
        let token = self
            .gate
            .signer()
            .issue(user, Utc::now())
            .map_err(|e| ShopError::Internal(format!("token issue failed: {}", e)))?;
        Ok(AuthResponse {
            token,
            user: user.profile(),
        })
    }

    fn load_cart(&self, customer: &UserId) -> Result<Cart, ShopError> {
        Ok(self
            .store
            .models::<Cart>()
            .get(customer.as_str())?
            .map(|v| v.data)
            .unwrap_or_else(|| Cart::empty(customer.clone(), Utc::now())))
    }

    /// Read-modify-write of the caller's cart under its lock.
    fn edit_cart<F>(&self, actor: &Principal, edit: F) -> Result<CartView, ShopError>
    where
        F: FnOnce(&mut Cart, chrono::DateTime<Utc>) -> Result<(), ShopError>,
    {
        let _guard = self.locks.acquire(&cart_lock_key(&actor.user_id))?;
        let mut cart = self.load_cart(&actor.user_id)?;
        edit(&mut cart, Utc::now())?;
        self.store.models::<Cart>().save(&cart)?;
        self.cart_view(cart)
    }

    fn cart_view(&self, cart: Cart) -> Result<CartView, ShopError> {
        let items = cart
            .items
            .into_iter()
            .map(|item| {
                let product = self.catalog.find(&item.product_id)?;
                Ok(CartLine {
                    available: product.is_some(),
                    name: product.as_ref().map(|p| p.name.clone()),
                    price: product.as_ref().map(|p| p.price),
                    image_url: product.as_ref().and_then(|p| p.image_url.clone()),
                    stock: product.as_ref().map(|p| p.stock),
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>, ShopError>>()?;
        let total = items
            .iter()
            .fold(0u64, |acc, line| acc.saturating_add(line.subtotal()));
        Ok(CartView {
            customer: cart.customer,
            items,
            total,
            updated_at: cart.updated_at,
        })
    }

    fn load_order(&self, id: &OrderId) -> Result<Order, ShopError> {
        self.store
            .models::<Order>()
            .get(id.as_str())?
            .map(|v| v.data)
            .ok_or_else(|| ShopError::not_found("order", id))
    }

    fn order_views(&self, mut orders: Vec<Order>) -> Result<Vec<OrderView>, ShopError> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        orders.into_iter().map(|o| self.order_view(o)).collect()
    }

    fn order_view(&self, order: Order) -> Result<OrderView, ShopError> {
        let customer = self
            .store
            .models::<User>()
            .get(order.customer.as_str())?
            .map(|v| v.data.profile());
        let items = order
            .items
            .into_iter()
            .map(|line| {
                let product = self.catalog.find(&line.product_id)?;
                Ok(OrderLineView {
                    subtotal: line.subtotal(),
                    available: product.is_some(),
                    image_url: product.and_then(|p| p.image_url),
                    product_id: line.product_id,
                    name: line.name,
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                })
            })
            .collect::<Result<Vec<_>, ShopError>>()?;
        Ok(OrderView {
            id: order.id,
            customer,
            customer_id: order.customer,
            items,
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

fn user_lock_key(id: &UserId) -> String {
    format!("user:{}", id)
}

fn cart_lock_key(customer: &UserId) -> String {
    format!("cart:{}", customer)
}

fn check_password(password: &str) -> Result<(), ShopError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ShopError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
