//! Checkout: turn a list of cart lines into a committed order.
//!
//! Runs in two phases. Phase 1 reserves every line through
//! [`Catalog::decrement_stock`]; phase 2 writes the order. A
//! [`ReservationSet`] holds what phase 1 took and puts it back on any
//! failure, so a failed checkout leaves every product's stock as it found it.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::cart::{validate_lines, CartItem};
use crate::catalog::{Catalog, Product};
use crate::error::ShopError;
use crate::ids::{ProductId, UserId};
use crate::model::{ModelStore, ModelsExt};
use crate::order::{Order, OrderLineItem};

pub struct Checkout<'a, S> {
    store: &'a S,
    catalog: &'a Catalog<S>,
}

impl<'a, S: ModelStore> Checkout<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog<S>) -> Self {
        Self { store, catalog }
    }

    pub fn run(&self, customer: &UserId, items: &[CartItem]) -> Result<Order, ShopError> {
        info!(customer = %customer, lines = items.len(), "checkout started");

        let products = self.validate(items)?;
        precheck(items, &products)?;

        let mut reservations = ReservationSet::new(self.catalog);
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let reserved = self
                .catalog
                .decrement_stock(&item.product_id, item.quantity)
                .inspect_err(|e| {
                    if let ShopError::InsufficientStock {
                        product,
                        requested,
                        available,
                    } = e
                    {
                        warn!(customer = %customer, product = %product, requested, available, "reservation failed");
                    }
                })?;
            reservations.record(item.product_id.clone(), item.quantity);
            lines.push(OrderLineItem {
                product_id: reserved.id,
                name: reserved.name,
                unit_price: reserved.price,
                quantity: item.quantity,
            });
        }

        let order = Order::place(customer.clone(), lines, Utc::now());
        self.store.models::<Order>().insert(&order)?;
        reservations.commit();

        info!(customer = %customer, order = %order.id, total = order.total_amount, "checkout committed");
        Ok(order)
    }

    /// Non-empty, well-formed, and every product exists.
    fn validate(&self, items: &[CartItem]) -> Result<Vec<Product>, ShopError> {
        if items.is_empty() {
            return Err(ShopError::validation("cart is empty"));
        }
        validate_lines(items)?;
        items
            .iter()
            .map(|item| {
                self.catalog.find(&item.product_id)?.ok_or_else(|| {
                    ShopError::validation(format!("unknown product: {}", item.product_id))
                })
            })
            .collect()
    }
}

/// Reads only. Catches the common shortage before any stock is touched;
/// the reservation phase still re-checks atomically.
fn precheck(items: &[CartItem], products: &[Product]) -> Result<(), ShopError> {
    for (item, product) in items.iter().zip(products) {
        if product.stock < item.quantity {
            warn!(product = %product.id, requested = item.quantity, available = product.stock, "insufficient stock");
            return Err(ShopError::InsufficientStock {
                product: product.id.to_string(),
                requested: item.quantity,
                available: product.stock,
            });
        }
    }
    Ok(())
}

/// Stock taken by an in-flight checkout. Restocked in reverse order on drop
/// unless committed.
pub struct ReservationSet<'a, S: ModelStore> {
    catalog: &'a Catalog<S>,
    taken: Vec<(ProductId, u32)>,
    committed: bool,
}

impl<'a, S: ModelStore> ReservationSet<'a, S> {
    pub fn new(catalog: &'a Catalog<S>) -> Self {
        Self {
            catalog,
            taken: Vec::new(),
            committed: false,
        }
    }

    pub fn record(&mut self, product: ProductId, quantity: u32) {
        self.taken.push((product, quantity));
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<S: ModelStore> Drop for ReservationSet<'_, S> {
    fn drop(&mut self) {
        if self.committed || self.is_empty() {
            return;
        }
        warn!(reservations = self.taken.len(), "rolling back stock reservations");
        while let Some((product, quantity)) = self.taken.pop() {
            if let Err(e) = self.catalog.restock(&product, quantity) {
                error!(product = %product, quantity, error = %e, "failed to restock reservation");
            }
        }
    }
}
