//! Error taxonomy shared by every shop operation.
//!
//! Lower layers keep their own error types (`ModelError`, `LockError`,
//! `TokenError`) and convert into `ShopError` at the operation boundary.

use thiserror::Error;

use crate::lock::LockError;
use crate::model::ModelError;
use crate::order::OrderStatus;

/// Error returned by catalog, cart, checkout, order and identity operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    /// Malformed or missing required input.
    #[error("{0}")]
    Validation(String),
    /// Missing, invalid, expired or revoked credential.
    #[error("{0}")]
    Unauthenticated(String),
    /// Authenticated, but the role or ownership does not permit the operation.
    #[error("{0}")]
    Forbidden(String),
    /// Referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// Checkout asked for more units than the product has in stock.
    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },
    /// Order status change outside the allowed graph.
    #[error("invalid order status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    /// Duplicate unique field (e.g. email already registered).
    #[error("{0}")]
    Conflict(String),
    /// Unexpected store or infrastructure failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ShopError::Validation(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        ShopError::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ShopError::Forbidden(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        ShopError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Map this error to an HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Validation(_) => 400,
            ShopError::Unauthenticated(_) => 401,
            ShopError::Forbidden(_) => 403,
            ShopError::NotFound { .. } => 404,
            ShopError::InsufficientStock { .. } => 409,
            ShopError::InvalidTransition { .. } => 400,
            ShopError::Conflict(_) => 400,
            ShopError::Internal(_) => 500,
        }
    }

    /// Message safe to hand to a client. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ShopError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ModelError> for ShopError {
    fn from(err: ModelError) -> Self {
        ShopError::Internal(err.to_string())
    }
}

impl From<LockError> for ShopError {
    fn from(err: LockError) -> Self {
        ShopError::Internal(err.to_string())
    }
}
