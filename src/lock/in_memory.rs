use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use super::{Lock, LockError, LockManager};

/// One keyed critical section, such as a customer's cart or an email being
/// claimed at signup. Waiters park on the condvar until the holder releases.
pub struct InMemoryLock {
    held: Mutex<bool>,
    wake: Condvar,
}

impl InMemoryLock {
    pub fn new() -> Self {
        InMemoryLock {
            held: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    fn is_free(&self) -> bool {
        self.held.lock().map(|held| !*held).unwrap_or(false)
    }
}

impl Default for InMemoryLock {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> LockError {
    LockError::Poisoned(e.to_string())
}

impl Lock for InMemoryLock {
    fn lock(&self) -> Result<(), LockError> {
        let mut held = self.held.lock().map_err(poisoned)?;
        while *held {
            held = self.wake.wait(held).map_err(poisoned)?;
        }
        *held = true;
        Ok(())
    }

    fn try_lock(&self) -> Result<bool, LockError> {
        let mut held = self.held.lock().map_err(poisoned)?;
        if *held {
            return Ok(false);
        }
        *held = true;
        Ok(true)
    }

    fn unlock(&self) -> Result<(), LockError> {
        let mut held = self.held.lock().map_err(poisoned)?;
        if !*held {
            return Err(LockError::NotHeld);
        }
        *held = false;
        self.wake.notify_one();
        Ok(())
    }
}

/// Process-local locks keyed by strings like `cart:<customer>`,
/// `user:<id>` or `user-email:<email>`.
///
/// Entries are created on first use and evicted when the last guard for the
/// key drops with no other thread waiting, so the map only holds keys that
/// are currently contended.
#[derive(Default)]
pub struct InMemoryLockManager {
    locks: Mutex<HashMap<String, Arc<InMemoryLock>>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LockManager for InMemoryLockManager {
    type Lock = InMemoryLock;

    fn get_lock(&self, key: &str) -> Result<Arc<InMemoryLock>, LockError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LockError::Poisoned("lock manager map poisoned".into()))?;
        Ok(locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(InMemoryLock::new()))
            .clone())
    }

    fn evict_idle(&self, key: &str) {
        // Handles are only cloned under the map mutex, so a count of one here
        // means no thread holds or is about to wait on this lock.
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        let idle = locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1 && lock.is_free());
        if idle {
            locks.remove(key);
        }
    }
}
