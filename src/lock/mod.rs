//! Keyed mutual exclusion.
//!
//! The shop serializes read-modify-write sequences that span several store
//! calls (a customer's cart edits and checkout, user record updates, signup's
//! email uniqueness check) by holding a lock on a string key such as
//! `cart:<customer>`. Locks are released when the returned [`LockGuard`] is
//! dropped, and idle keys are evicted at that point.

mod error;
mod in_memory;
mod lock_manager;

pub use error::LockError;
pub use in_memory::{InMemoryLock, InMemoryLockManager};
pub use lock_manager::{Lock, LockGuard, LockManager};
