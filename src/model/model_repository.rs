//! ModelRepository - typed accessor for one collection.

use std::marker::PhantomData;

use super::{Model, ModelError, ModelStore, Versioned};

/// Typed repository over the documents of a single model type.
pub struct ModelRepository<'a, S, M> {
    store: &'a S,
    _marker: PhantomData<M>,
}

impl<'a, S: ModelStore, M: Model> ModelRepository<'a, S, M> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError> {
        self.store.get_model(id)
    }

    pub fn save(&self, model: &M) -> Result<Versioned<M>, ModelError> {
        self.store.save_model(model)
    }

    pub fn insert(&self, model: &M) -> Result<Versioned<M>, ModelError> {
        self.store.insert_model(model)
    }

    pub fn update(&self, model: &M, expected_version: u64) -> Result<Versioned<M>, ModelError> {
        self.store.update_model(model, expected_version)
    }

    pub fn delete(&self, id: &str) -> Result<bool, ModelError> {
        self.store.delete_model::<M>(id)
    }

    pub fn find(&self, predicate: &dyn Fn(&M) -> bool) -> Result<Vec<M>, ModelError> {
        Ok(self
            .store
            .find_models(predicate)?
            .into_iter()
            .map(|v| v.data)
            .collect())
    }

    /// First document matching the predicate, if any.
    pub fn find_one(&self, predicate: &dyn Fn(&M) -> bool) -> Result<Option<M>, ModelError> {
        Ok(self.find(predicate)?.into_iter().next())
    }

    pub fn all(&self) -> Result<Vec<M>, ModelError> {
        self.find(&|_| true)
    }
}

/// Extension trait for typed model access on any ModelStore.
pub trait ModelsExt: ModelStore + Sized {
    fn models<M: Model>(&self) -> ModelRepository<'_, Self, M> {
        ModelRepository::new(self)
    }
}

impl<S: ModelStore> ModelsExt for S {}
