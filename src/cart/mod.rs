//! Cart aggregate.
//!
//! A cart stores product references and quantities only, one line per
//! product. Names, prices and images are joined from the catalog when the
//! cart is read ([`CartView`]), so a cart never shows a stale snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ShopError;
use crate::ids::{ProductId, UserId};
use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// One customer's cart. Its document id is the customer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub customer: UserId,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Cart {
    const COLLECTION: &'static str = "carts";

    fn id(&self) -> &str {
        self.customer.as_str()
    }
}

impl Cart {
    pub fn empty(customer: UserId, now: DateTime<Utc>) -> Self {
        Self {
            customer,
            items: Vec::new(),
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Add to an existing line or append a new one.
    pub fn add(&mut self, product_id: ProductId, quantity: u32, now: DateTime<Utc>) -> Result<(), ShopError> {
        ensure_positive(quantity)?;
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    ShopError::validation("quantity is too large")
                })?;
            }
            None => self.items.push(CartItem {
                product_id,
                quantity,
            }),
        }
        self.updated_at = now;
        Ok(())
    }

    /// Quantity must stay at least 1; use [`Cart::remove`] to drop a line.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), ShopError> {
        ensure_positive(quantity)?;
        let line = self
            .items
            .iter_mut()
            .find(|i| &i.product_id == product_id)
            .ok_or_else(|| ShopError::not_found("cart item", product_id))?;
        line.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    /// No-op when the product is not in the cart.
    pub fn remove(&mut self, product_id: &ProductId, now: DateTime<Utc>) {
        self.items.retain(|i| &i.product_id != product_id);
        self.updated_at = now;
    }

    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.updated_at = now;
    }

    /// Overwrite every line. Rejects duplicate products and zero quantities.
    pub fn replace(&mut self, items: Vec<CartItem>, now: DateTime<Utc>) -> Result<(), ShopError> {
        validate_lines(&items)?;
        self.items = items;
        self.updated_at = now;
        Ok(())
    }
}

/// Checks a submitted item list: positive quantities, one line per product.
pub fn validate_lines(items: &[CartItem]) -> Result<(), ShopError> {
    for (n, item) in items.iter().enumerate() {
        ensure_positive(item.quantity)?;
        if item.product_id.as_str().trim().is_empty() {
            return Err(ShopError::validation("product_id is required"));
        }
        if items[..n].iter().any(|prev| prev.product_id == item.product_id) {
            return Err(ShopError::validation(format!(
                "product {} appears more than once",
                item.product_id
            )));
        }
    }
    Ok(())
}

fn ensure_positive(quantity: u32) -> Result<(), ShopError> {
    if quantity == 0 {
        return Err(ShopError::validation("quantity must be a positive integer"));
    }
    Ok(())
}

/// Cart as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub customer: UserId,
    pub items: Vec<CartLine>,
    /// Sum of line subtotals at current prices, in cents. Lines whose product
    /// is gone count as zero.
    pub total: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub name: Option<String>,
    pub price: Option<u64>,
    pub image_url: Option<String>,
    pub stock: Option<u32>,
    /// False when the product no longer exists in the catalog.
    pub available: bool,
}

impl CartLine {
    pub fn subtotal(&self) -> u64 {
        self.price
            .unwrap_or(0)
            .saturating_mul(u64::from(self.quantity))
    }
}
