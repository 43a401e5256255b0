//! Metal Factory: a multi-role storefront backend.
//!
//! Customers fill carts and check out, sellers and admins curate the
//! catalog, and admins and supervisors move orders through their lifecycle.
//! Everything runs against a versioned document store ([`model`]); stock is
//! only ever changed by compare-and-set, and checkout rolls back every
//! reservation it took when any line fails.
//!
//! ```ignore
//! use metal_factory::{InMemoryModelStore, Shop, TokenSigner};
//!
//! let signer = TokenSigner::new("secret", chrono::Duration::hours(1))?;
//! let shop = Shop::new(InMemoryModelStore::new(), signer);
//! let auth = shop.signup(request)?;
//! let principal = shop.authenticate(Some(&format!("Bearer {}", auth.token)))?;
//! let order = shop.checkout(&principal, None)?;
//! ```

pub mod access;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod identity;
pub mod ids;
pub mod lock;
pub mod model;
pub mod order;
pub mod shop;
pub mod snapshot;
pub mod telemetry;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "http")]
pub mod http;

pub use access::{Gate, Principal};
pub use cart::{Cart, CartItem, CartView};
pub use catalog::{Catalog, NewProduct, Product, ProductFilter, ProductPatch};
pub use error::ShopError;
pub use identity::{PasswordHasher, Role, TokenSigner, User, UserProfile};
pub use ids::{OrderId, ProductId, UserId};
pub use model::{InMemoryModelStore, Model, ModelStore, ModelsExt};
pub use order::{Order, OrderLineItem, OrderStatus, OrderView};
pub use shop::Shop;
