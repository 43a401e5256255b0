use std::sync::Arc;

use tracing::warn;

use super::LockError;

/// A single lock instance.
///
/// In-memory locks use `Mutex` + `Condvar`; a deployment backed by a shared
/// database would hand out advisory locks behind the same trait.
pub trait Lock: Send + Sync {
    /// Acquire the lock, blocking until it becomes available.
    fn lock(&self) -> Result<(), LockError>;

    /// Try to acquire the lock without blocking.
    /// Returns `Ok(true)` if acquired, `Ok(false)` if already held.
    fn try_lock(&self) -> Result<bool, LockError>;

    /// Release the lock. Releasing a lock nobody holds is an error.
    fn unlock(&self) -> Result<(), LockError>;
}

/// Hands out one lock per key.
pub trait LockManager: Send + Sync {
    type Lock: Lock;

    /// Get (or create) the lock for `key`.
    ///
    /// Repeated calls with the same key must return the same logical lock
    /// for as long as anyone holds or waits on it.
    fn get_lock(&self, key: &str) -> Result<Arc<Self::Lock>, LockError>;

    /// Called by a guard after it released `key`. Managers that create locks
    /// on demand drop the entry here once nobody else references it.
    fn evict_idle(&self, _key: &str) {}

    /// Block until the lock for `key` is held; it is released when the guard drops.
    fn acquire(&self, key: &str) -> Result<LockGuard<'_, Self>, LockError> {
        let lock = self.get_lock(key)?;
        lock.lock()?;
        Ok(LockGuard {
            key: key.to_string(),
            lock: Some(lock),
            manager: self,
        })
    }
}

/// Holds a keyed lock until dropped, then lets the manager evict the key.
pub struct LockGuard<'a, M: LockManager + ?Sized> {
    key: String,
    lock: Option<Arc<M::Lock>>,
    manager: &'a M,
}

impl<M: LockManager + ?Sized> LockGuard<'_, M> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<M: LockManager + ?Sized> Drop for LockGuard<'_, M> {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        if let Err(e) = lock.unlock() {
            warn!(key = %self.key, error = %e, "failed to release lock");
        }
        drop(lock);
        self.manager.evict_idle(&self.key);
    }
}
