//! Models - typed documents in a versioned key-document store.
//!
//! Users, products, carts and orders are all stored as models. Every stored
//! document carries a version that increments on each write, so
//! `update_model(doc, expected_version)` acts as a compare-and-set.
//!
//! ## Example
//!
//! ```ignore
//! use metal_factory::model::{InMemoryModelStore, Model, ModelsExt};
//!
//! let store = InMemoryModelStore::new();
//! store.models::<Product>().insert(&product)?;
//! let loaded = store.models::<Product>().get("p-1")?;
//! ```

mod in_memory;
mod model_repository;
mod store;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Trait for types that can be stored as models.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name (a table in SQL, a collection in MongoDB, a key prefix in a KV store).
    const COLLECTION: &'static str;

    /// Unique identifier of this document within its collection.
    fn id(&self) -> &str;
}

/// A document together with the version it was read or written at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

/// Error type for model store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The stored version differs from the one the caller read.
    #[error("concurrency conflict on {collection}:{id} (expected version {expected}, actual {actual})")]
    ConcurrencyConflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },
    #[error("model serialization error: {0}")]
    Serde(String),
    #[error("model storage error: {0}")]
    Storage(String),
    #[error("model not found: {collection}:{id}")]
    NotFound { collection: String, id: String },
}

pub use in_memory::{ImageEntry, InMemoryModelStore, StoreImage};
pub use model_repository::{ModelRepository, ModelsExt};
pub use store::ModelStore;
