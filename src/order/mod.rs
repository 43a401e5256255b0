//! Order aggregate.
//!
//! An order is created once by checkout and afterwards only its status
//! changes. Line items carry the unit price captured at checkout, so the
//! stored total never depends on later catalog edits.

mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ShopError;
use crate::identity::UserProfile;
use crate::ids::{OrderId, ProductId, UserId};
use crate::model::Model;

pub use status::OrderStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    /// Product name at checkout.
    pub name: String,
    /// Price in cents at checkout.
    pub unit_price: u64,
    pub quantity: u32,
}

impl OrderLineItem {
    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: UserId,
    pub items: Vec<OrderLineItem>,
    /// Sum of line subtotals, in cents.
    pub total_amount: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Order {
    /// New `Pending` order; the total is computed from the line items.
    pub fn place(customer: UserId, items: Vec<OrderLineItem>, now: DateTime<Utc>) -> Self {
        let total_amount = total_of(&items);
        Self {
            id: OrderId::generate(),
            customer,
            items,
            total_amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), ShopError> {
        if !self.status.can_transition_to(next) {
            return Err(ShopError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_owned_by(&self, customer: &UserId) -> bool {
        &self.customer == customer
    }
}

pub fn total_of(items: &[OrderLineItem]) -> u64 {
    items
        .iter()
        .fold(0u64, |acc, item| acc.saturating_add(item.subtotal()))
}

/// Order returned to clients, with the customer and current product
/// details joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub customer: Option<UserProfile>,
    pub customer_id: UserId,
    pub items: Vec<OrderLineView>,
    pub total_amount: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub subtotal: u64,
    /// Current image of the product, if it still exists.
    pub image_url: Option<String>,
    /// False once the product has been deleted from the catalog.
    pub available: bool,
}
