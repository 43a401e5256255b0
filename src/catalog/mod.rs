//! Product catalog.
//!
//! Stock only moves through [`Catalog::decrement_stock`] and
//! [`Catalog::restock`]. Both are compare-and-set loops on the product's
//! stored version, so two writers can never both act on the same stock
//! reading.

mod product;

use chrono::Utc;
use tracing::{debug, info};

use crate::access::Principal;
use crate::error::ShopError;
use crate::identity::Role;
use crate::ids::ProductId;
use crate::model::{ModelError, ModelStore, ModelsExt};

pub use product::{NewProduct, Product, ProductFilter, ProductList, ProductPatch};

/// Attempts before a contended CAS gives up.
pub const MAX_CAS_ATTEMPTS: usize = 64;

#[derive(Debug, Clone)]
pub struct Catalog<S> {
    store: S,
}

impl<S: ModelStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &ProductId) -> Result<Product, ShopError> {
        self.find(id)?
            .ok_or_else(|| ShopError::not_found("product", id))
    }

    pub fn find(&self, id: &ProductId) -> Result<Option<Product>, ShopError> {
        Ok(self
            .store
            .models::<Product>()
            .get(id.as_str())?
            .map(|v| v.data))
    }

    /// Matching products, newest first.
    pub fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ShopError> {
        let mut products = self.store.models::<Product>().find(&|p| filter.matches(p))?;
        sort_newest_first(&mut products);
        Ok(products)
    }

    pub fn search(&self, query: &str) -> Result<Vec<Product>, ShopError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ShopError::validation("search query is required"));
        }
        let mut products = self
            .store
            .models::<Product>()
            .find(&|p| p.matches_query(&needle))?;
        sort_newest_first(&mut products);
        Ok(products)
    }

    /// Sellers become the owner of what they create; admins create unowned products.
    pub fn create(&self, actor: &Principal, new: NewProduct) -> Result<Product, ShopError> {
        let owner = match actor.role {
            Role::Admin => None,
            Role::Seller => Some(actor.user_id.clone()),
            _ => return Err(ShopError::forbidden("only admins and sellers may create products")),
        };
        let product = new.into_product(owner, Utc::now())?;
        self.store.models::<Product>().insert(&product)?;
        info!(product = %product.id, actor = %actor.user_id, "product created");
        Ok(product)
    }

    pub fn update(
        &self,
        actor: &Principal,
        id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ShopError> {
        let product = self.modify(id, |product| {
            ensure_can_edit(actor, product)?;
            patch.apply(product)
        })?;
        info!(product = %id, actor = %actor.user_id, "product updated");
        Ok(product)
    }

    pub fn delete(&self, actor: &Principal, id: &ProductId) -> Result<(), ShopError> {
        let product = self.get(id)?;
        ensure_can_edit(actor, &product)?;
        if !self.store.models::<Product>().delete(id.as_str())? {
            return Err(ShopError::not_found("product", id));
        }
        info!(product = %id, actor = %actor.user_id, "product deleted");
        Ok(())
    }

    /// Take `amount` units out of stock, failing without change if fewer remain.
    pub fn decrement_stock(&self, id: &ProductId, amount: u32) -> Result<Product, ShopError> {
        self.modify(id, |product| match product.stock.checked_sub(amount) {
            Some(left) => {
                product.stock = left;
                Ok(())
            }
            None => Err(ShopError::InsufficientStock {
                product: id.to_string(),
                requested: amount,
                available: product.stock,
            }),
        })
    }

    /// Put `amount` units back. Compensates a prior `decrement_stock`.
    pub fn restock(&self, id: &ProductId, amount: u32) -> Result<Product, ShopError> {
        self.modify(id, |product| {
            product.stock = product.stock.saturating_add(amount);
            Ok(())
        })
    }

    /// Read-modify-write of one product, retried while other writers win the race.
    fn modify<F>(&self, id: &ProductId, mut change: F) -> Result<Product, ShopError>
    where
        F: FnMut(&mut Product) -> Result<(), ShopError>,
    {
        let products = self.store.models::<Product>();
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = products
                .get(id.as_str())?
                .ok_or_else(|| ShopError::not_found("product", id))?;
            let mut next = current.data;
            change(&mut next)?;
            next.updated_at = Utc::now();

            match products.update(&next, current.version) {
                Ok(written) => return Ok(written.data),
                Err(ModelError::ConcurrencyConflict { .. }) => {
                    debug!(product = %id, attempt, "product write lost race, retrying");
                }
                Err(ModelError::NotFound { .. }) => {
                    return Err(ShopError::not_found("product", id));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ShopError::Internal(format!(
            "product {} still contended after {} attempts",
            id, MAX_CAS_ATTEMPTS
        )))
    }
}

fn ensure_can_edit(actor: &Principal, product: &Product) -> Result<(), ShopError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Seller if product.is_owned_by(&actor.user_id) => Ok(()),
        Role::Seller => Err(ShopError::forbidden("sellers may only modify their own products")),
        _ => Err(ShopError::forbidden("only admins and sellers may modify products")),
    }
}

fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
