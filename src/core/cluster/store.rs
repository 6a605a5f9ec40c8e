use std::fmt;
use thiserror::Error;

/// Failure taxonomy of the remote counter store.
///
/// `Config` is fatal and raised at construction time; `Command` wraps the
/// infrastructure faults of a live connection (network error, timeout,
/// malformed reply). Counter bookkeeping callers recover from `Command`
/// locally, they never let it abort a request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote counter store is misconfigured: {0}")]
    Config(String),
    #[error("remote counter store command failed: {0}")]
    Command(#[from] redis::RedisError),
}

impl StoreError {
    /// Deadline expiry is surfaced distinctly from other command faults.
    pub fn is_timeout(&self) -> bool {
        match self {
            StoreError::Command(err) => err.is_timeout(),
            StoreError::Config(_) => false,
        }
    }
}

/// One shared, network-accessible store of named integer counters.
///
/// Keys handed to this trait are logical (`<path>:<encoded-key>`); the
/// backend prepends its global namespace prefix before touching the wire,
/// and strips it again when enumerating. Every call is a blocking round
/// trip. Per-key operations are atomic on the server; there are no
/// cross-key transactions.
pub trait CounterStore: Send + Sync + fmt::Debug {
    /// Atomically adds one to the counter at `key`, creating it at zero
    /// if absent. Returns the new value.
    fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomically subtracts one from the counter at `key`, creating it at
    /// zero if absent. Returns the new value.
    fn decr(&self, key: &str) -> Result<i64, StoreError>;

    fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    fn set(&self, key: &str, value: i64) -> Result<(), StoreError>;

    /// Atomic in a single server round trip: keeps and returns the existing
    /// value if present, writes `value` and returns `None` otherwise.
    fn put_if_absent(&self, key: &str, value: i64) -> Result<Option<i64>, StoreError>;

    /// Atomic in a single server round trip: writes `new` and returns true
    /// only if the stored value equals `expect`.
    fn compare_and_set(&self, key: &str, expect: i64, new: i64) -> Result<bool, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Point-in-time key enumeration; not transactionally consistent with
    /// concurrent writers. `pattern` supports a trailing `*` wildcard.
    fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    fn count(&self, pattern: &str) -> Result<usize, StoreError> {
        Ok(self.keys(pattern)?.len())
    }

    fn del_matching(&self, pattern: &str) -> Result<(), StoreError> {
        for key in self.keys(pattern)? {
            self.del(&key)?;
        }
        Ok(())
    }
}
