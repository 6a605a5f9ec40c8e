use super::store::{CounterStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local [`CounterStore`] used when cluster mode is disabled.
/// Admission decisions then only see this gateway instance's own traffic.
/// It is also the fake store of choice in tests.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, i64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Default::default()
    }
}

fn matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

impl CounterStore for MemoryCounterStore {
    fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let value = entries.entry(key.into()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    fn decr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let value = entries.entry(key.into()).or_insert(0);
        *value -= 1;
        Ok(*value)
    }

    fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).copied())
    }

    fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(key.into(), value);
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: i64) -> Result<Option<i64>, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(prior) => Ok(Some(*prior)),
            None => {
                entries.insert(key.into(), value);
                Ok(None)
            }
        }
    }

    fn compare_and_set(&self, key: &str, expect: i64, new: i64) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(current) if *current == expect => {
                entries.insert(key.into(), new);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().unwrap().contains_key(key))
    }

    fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|key| matches(pattern, key))
            .cloned()
            .collect())
    }
}
