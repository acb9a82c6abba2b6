//! Registered store keys.

use std::{
    collections::BTreeSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use eyre::{Result, bail};

/// Store keys of every resource a runtime has defined.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    keys: Mutex<BTreeSet<String>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys_mut(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `store_key`. Fails if it is already registered.
    pub fn register(&self, store_key: &str) -> Result<()> {
        if !self.keys_mut().insert(store_key.to_string()) {
            bail!("store key `{store_key}` is already registered");
        }
        tracing::debug!(store_key, "registered store key");
        Ok(())
    }

    /// Returns whether the key was registered.
    pub fn unregister(&self, store_key: &str) -> bool {
        let removed = self.keys_mut().remove(store_key);
        if removed {
            tracing::debug!(store_key, "unregistered store key");
        }
        removed
    }

    pub fn contains(&self, store_key: &str) -> bool {
        self.keys_mut().contains(store_key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.keys_mut().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys_mut().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys_mut().is_empty()
    }
}
