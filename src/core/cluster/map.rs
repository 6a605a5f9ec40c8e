use super::counter::RemoteCounter;
use super::store::{CounterStore, StoreError};
use std::fmt;
use std::sync::Arc;

/// One logical table of remote counters, `key -> counter`, shared by every
/// process observing the same namespace. Consistency comes from the remote
/// store; there is no in-process lock to take.
pub trait CounterMap: Send + Sync + fmt::Debug {
    fn contains_key(&self, key: &str) -> Result<bool, StoreError>;

    /// Returns the counter handle for `key`, or `None` when no remote entry
    /// exists yet.
    fn get(&self, key: &str) -> Result<Option<RemoteCounter>, StoreError>;

    /// Returns a handle for `key` without touching the store; the remote
    /// entry is created at zero by the first write through the handle.
    fn counter(&self, key: &str) -> RemoteCounter;

    /// Unconditional write; returns the written value.
    fn put(&self, key: &str, value: i64) -> Result<i64, StoreError>;

    /// Single-round-trip atomic insert: returns the existing value without
    /// overwriting it, or writes `value` and returns `None`.
    fn put_if_absent(&self, key: &str, value: i64) -> Result<Option<i64>, StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Deletes every key under this table's namespace.
    fn clear(&self) -> Result<(), StoreError>;

    /// Point-in-time snapshot of the keys under this table's namespace.
    fn key_set(&self) -> Result<Vec<String>, StoreError>;

    /// Counts the keys under this table's namespace (same snapshot caveat
    /// as [`key_set`](CounterMap::key_set)).
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// The single [`CounterMap`] backend: namespaces entries of one logical
/// table under `<path><encoded-key>` on a shared [`CounterStore`].
pub struct RemoteCounterMap {
    store: Arc<dyn CounterStore>,
    // table namespace, ends with the key separator
    path: String,
}

impl fmt::Debug for RemoteCounterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCounterMap").field("path", &self.path).finish()
    }
}

impl RemoteCounterMap {
    pub fn new(store: Arc<dyn CounterStore>, path: String) -> Self {
        RemoteCounterMap { store, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}{}", self.path, key)
    }

    fn pattern(&self) -> String {
        format!("{}*", self.path)
    }
}

impl CounterMap for RemoteCounterMap {
    fn contains_key(&self, key: &str) -> Result<bool, StoreError> {
        self.store.exists(&self.entry_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<RemoteCounter>, StoreError> {
        if self.contains_key(key)? {
            Ok(Some(self.counter(key)))
        } else {
            Ok(None)
        }
    }

    fn counter(&self, key: &str) -> RemoteCounter {
        RemoteCounter::new(Arc::clone(&self.store), self.entry_key(key))
    }

    fn put(&self, key: &str, value: i64) -> Result<i64, StoreError> {
        self.store.set(&self.entry_key(key), value)?;
        Ok(value)
    }

    fn put_if_absent(&self, key: &str, value: i64) -> Result<Option<i64>, StoreError> {
        self.store.put_if_absent(&self.entry_key(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store.del(&self.entry_key(key))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.store.del_matching(&self.pattern())
    }

    fn key_set(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .keys(&self.pattern())?
            .into_iter()
            .filter_map(|key| {
                key.strip_prefix(self.path.as_str())
                    .map(|stripped| stripped.to_owned())
            })
            .collect())
    }

    fn len(&self) -> Result<usize, StoreError> {
        self.store.count(&self.pattern())
    }
}

#[cfg(test)]
mod test {
    use super::super::memory::MemoryCounterStore;
    use super::*;

    fn new_map(path: &str) -> RemoteCounterMap {
        RemoteCounterMap::new(Arc::new(MemoryCounterStore::new()), path.into())
    }

    #[test]
    fn put_get_remove() {
        let map = new_map("tokens:res#0:");
        assert!(!map.contains_key("user-42").unwrap());
        assert!(map.get("user-42").unwrap().is_none());
        assert_eq!(5, map.put("user-42", 5).unwrap());
        let counter = map.get("user-42").unwrap().unwrap();
        assert_eq!(5, counter.get().unwrap());
        map.remove("user-42").unwrap();
        assert!(map.get("user-42").unwrap().is_none());
    }

    #[test]
    fn put_if_absent_is_first_writer_wins() {
        let map = new_map("tokens:res#0:");
        assert_eq!(None, map.put_if_absent("v", 3).unwrap());
        assert_eq!(Some(3), map.put_if_absent("v", 9).unwrap());
        assert_eq!(3, map.counter("v").get().unwrap());
    }

    #[test]
    fn namespaced_key_set() {
        let tokens = new_map("tokens:res#0:");
        tokens.put("a", 1).unwrap();
        tokens.put("b", 2).unwrap();
        let mut keys = tokens.key_set().unwrap();
        keys.sort();
        assert_eq!(vec!["a", "b"], keys);
        assert_eq!(2, tokens.len().unwrap());
        assert!(!tokens.is_empty().unwrap());
        tokens.clear().unwrap();
        assert!(tokens.is_empty().unwrap());
    }

    #[test]
    fn tables_do_not_leak_into_each_other() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
        let left = RemoteCounterMap::new(Arc::clone(&store), "threads:res#0:".into());
        let right = RemoteCounterMap::new(Arc::clone(&store), "threads:res#1:".into());
        left.put("v", 1).unwrap();
        assert!(right.is_empty().unwrap());
        right.put("v", 2).unwrap();
        left.clear().unwrap();
        assert_eq!(2, right.counter("v").get().unwrap());
    }
}
