use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ShopError;
use crate::ids::{ProductId, UserId};
use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in cents.
    pub price: u64,
    pub stock: u32,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Owning seller; `None` for products created by an admin.
    #[serde(default)]
    pub seller: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Product {
    pub fn is_owned_by(&self, seller: &UserId) -> bool {
        self.seller.as_ref() == Some(seller)
    }

    /// Case-insensitive substring match over name and category.
    pub fn matches_query(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
            || self.category.to_lowercase().contains(needle_lower)
    }
}

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default)]
    pub stock: u32,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

impl NewProduct {
    pub fn into_product(self, seller: Option<UserId>, now: DateTime<Utc>) -> Result<Product, ShopError> {
        let name = required("name", &self.name)?;
        let category = required("category", &self.category)?;
        Ok(Product {
            id: ProductId::generate(),
            name,
            description: self.description.trim().to_string(),
            price: self.price,
            stock: self.stock,
            category,
            image_url: non_blank(self.image_url),
            manufacturer: non_blank(self.manufacturer),
            seller,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

impl ProductPatch {
    pub fn apply(&self, product: &mut Product) -> Result<(), ShopError> {
        if let Some(name) = &self.name {
            product.name = required("name", name)?;
        }
        if let Some(category) = &self.category {
            product.category = required("category", category)?;
        }
        if let Some(description) = &self.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if self.image_url.is_some() {
            product.image_url = non_blank(self.image_url.clone());
        }
        if self.manufacturer.is_some() {
            product.manufacturer = non_blank(self.manufacturer.clone());
        }
        Ok(())
    }
}

/// Listing filter. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub seller: Option<UserId>,
    #[serde(default)]
    pub in_stock: bool,
}

impl ProductFilter {
    pub fn by_seller(seller: UserId) -> Self {
        Self {
            seller: Some(seller),
            ..Self::default()
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if !product.category.eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }
        if let Some(seller) = &self.seller {
            if !product.is_owned_by(seller) {
                return false;
            }
        }
        !self.in_stock || product.stock > 0
    }
}

/// Listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
    pub count: usize,
    pub products: Vec<Product>,
}

impl From<Vec<Product>> for ProductList {
    fn from(products: Vec<Product>) -> Self {
        Self {
            count: products.len(),
            products,
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, ShopError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ShopError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
