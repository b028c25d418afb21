use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// A registry of per-key async locks.
///
/// A lock exists only while somebody holds it or waits for it; the entry is dropped together with
/// the last guard, so the registry does not grow with the number of distinct keys ever used.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Holds the lock for one key until dropped.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `key`, then holds it.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mutex = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone();
        // Created before waiting so that a caller giving up on the wait still evicts the entry.
        let mut held = KeyGuard {
            owner: self,
            key: key.to_string(),
            guard: None,
        };
        held.guard = Some(mutex.lock_owned().await);
        held
    }

    /// The number of keys currently held or waited for.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .owner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Release while the registry is locked, so nobody can pick up the entry in between.
        drop(self.guard.take());
        let unused = locks
            .get(&self.key)
            .map(|m| Arc::strong_count(m) == 1)
            .unwrap_or(false);
        if unused {
            locks.remove(&self.key);
        }
    }
}
