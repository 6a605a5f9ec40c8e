use super::store::{CounterStore, StoreError};
use crate::config::ClusterConfig;
use crate::utils;
use redis::{Commands, Connection, Script};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

// Keeps and returns the current value when the key is taken,
// writes ARGV[1] and returns nil otherwise.
const PUT_IF_ABSENT: &str = "if (redis.call('SETNX',KEYS[1],ARGV[1]) == 1) then
return nil
end
return redis.call('GET',KEYS[1])";

// The store has no native CAS on values, emulate it server-side:
// read, compare and conditionally write in one scripted op.
const COMPARE_AND_SET: &str = "if (redis.call('GET',KEYS[1]) == ARGV[1]) then
redis.call('SET',KEYS[1],ARGV[2])
return 1
end
return 0";

/// Redis-backed [`CounterStore`]. Owns one connection shared by all callers
/// in the process; it is lazily established once by [`connect`] and never
/// torn down on the hot path.
///
/// [`connect`]: RedisCounterStore::connect
pub struct RedisCounterStore {
    conn: Mutex<Connection>,
    prefix: String,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl RedisCounterStore {
    /// Connects to the configured server. Fails fast with
    /// [`StoreError::Config`] when the address is blank or malformed; a
    /// missing address is a deployment mistake, not a retryable fault.
    pub fn connect(config: &ClusterConfig) -> Result<Self, StoreError> {
        if utils::is_blank(&config.server) || !config.server.contains(':') {
            return Err(StoreError::Config(
                "remote counter store server not set. Format - <host>:<port>".into(),
            ));
        }
        let url = match &config.auth {
            Some(password) => format!("redis://:{}@{}/", password, config.server),
            None => format!("redis://{}/", config.server),
        };
        let client = redis::Client::open(url.as_str())?;
        let timeout = Duration::from_millis(config.timeout_ms);
        let conn = client.get_connection_with_timeout(timeout)?;
        conn.set_read_timeout(Some(timeout))?;
        conn.set_write_timeout(Some(timeout))?;
        Ok(RedisCounterStore {
            conn: Mutex::new(conn),
            prefix: config.key_prefix.clone(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl CounterStore for RedisCounterStore {
    fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        Ok(conn.incr(self.namespaced(key), 1i64)?)
    }

    fn decr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        Ok(conn.decr(self.namespaced(key), 1i64)?)
    }

    fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        Ok(conn.get(self.namespaced(key))?)
    }

    fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let _: () = conn.set(self.namespaced(key), value)?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: i64) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let prior: Option<i64> = Script::new(PUT_IF_ABSENT)
            .key(self.namespaced(key))
            .arg(value)
            .invoke(&mut *conn)?;
        Ok(prior)
    }

    fn compare_and_set(&self, key: &str, expect: i64, new: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let swapped: i64 = Script::new(COMPARE_AND_SET)
            .key(self.namespaced(key))
            .arg(expect)
            .arg(new)
            .invoke(&mut *conn)?;
        Ok(swapped == 1)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        Ok(conn.exists(self.namespaced(key))?)
    }

    fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let _: () = conn.del(self.namespaced(key))?;
        Ok(())
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let raw: Vec<String> = conn.keys(self.namespaced(pattern))?;
        Ok(raw
            .into_iter()
            .filter_map(|key| {
                key.strip_prefix(self.prefix.as_str())
                    .map(|stripped| stripped.to_owned())
            })
            .collect())
    }
}
