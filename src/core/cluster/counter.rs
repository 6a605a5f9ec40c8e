use super::store::{CounterStore, StoreError};
use std::fmt;
use std::sync::Arc;

/// Handle to one remotely stored atomic counter. Creating a handle performs
/// no I/O; the remote entry comes to life on the first write and reads as
/// zero until then.
#[derive(Clone)]
pub struct RemoteCounter {
    store: Arc<dyn CounterStore>,
    key: String,
}

impl fmt::Debug for RemoteCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCounter").field("key", &self.key).finish()
    }
}

impl RemoteCounter {
    pub(crate) fn new(store: Arc<dyn CounterStore>, key: String) -> Self {
        RemoteCounter { store, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Result<i64, StoreError> {
        Ok(self.store.get(&self.key)?.unwrap_or(0))
    }

    pub fn set(&self, value: i64) -> Result<(), StoreError> {
        self.store.set(&self.key, value)
    }

    pub fn incr(&self) -> Result<i64, StoreError> {
        self.store.incr(&self.key)
    }

    pub fn decr(&self) -> Result<i64, StoreError> {
        self.store.decr(&self.key)
    }

    pub fn compare_and_set(&self, expect: i64, new: i64) -> Result<bool, StoreError> {
        self.store.compare_and_set(&self.key, expect, new)
    }

    pub fn exists(&self) -> Result<bool, StoreError> {
        self.store.exists(&self.key)
    }

    pub fn delete(&self) -> Result<(), StoreError> {
        self.store.del(&self.key)
    }
}
