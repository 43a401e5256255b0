use thiserror::Error;

/// Error type for lock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// A thread panicked while holding the underlying primitive.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    /// `unlock` was called on a lock that was not held.
    #[error("lock not held")]
    NotHeld,
}
