//! ModelStore - the document store contract the shop is written against.

use super::{Model, ModelError, Versioned};

/// Abstract document storage keyed by `(collection, id)`.
pub trait ModelStore: Clone + Send + Sync + 'static {
    /// Get a document by ID. Returns None if not found.
    fn get_model<M: Model>(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError>;

    /// Upsert a document (insert or overwrite, no version check).
    fn save_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError>;

    /// Insert a new document. Fails with `ConcurrencyConflict` if the ID is taken.
    fn insert_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError>;

    /// Overwrite an existing document only if it is still at `expected_version`.
    fn update_model<M: Model>(
        &self,
        model: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, ModelError>;

    /// Delete a document by ID. Returns true if it existed.
    fn delete_model<M: Model>(&self, id: &str) -> Result<bool, ModelError>;

    /// All documents of a collection matching a predicate.
    fn find_models<M: Model>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Vec<Versioned<M>>, ModelError>;
}
