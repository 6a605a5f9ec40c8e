use super::Rule;
use crate::{
    base::{ParamKey, ParamsList},
    cluster::{CounterMap, CounterStore, RemoteCounterMap, StoreError},
    logging,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub(crate) const PATH_RULE_TIME_COUNTERS: &str = "ruleTimeCounters";
pub(crate) const PATH_RULE_TOKEN_COUNTER: &str = "ruleTokenCounter";
pub(crate) const PATH_THREAD_COUNT_MAP: &str = "threadCountMap";

fn table_path(kind: &str, fragment: &str) -> String {
    format!("{}:{}:", kind, fragment)
}

/// Metrics for the frequent ("hot spot") parameters of one resource.
///
/// The instance is a process-local index of which remote counter tables
/// exist; the counter values themselves live in the shared store. Each
/// logical table sits behind its own lock, and tables are only ever added,
/// never swapped, so lookups after initialization race freely.
///
/// Format of the tables: `(rule, (value, timeRecorder))`,
/// `(rule, (value, tokenCounter))` and `(paramIndex, (value, threadCount))`.
#[derive(Debug)]
pub struct ParamMetric {
    resource: String,
    store: Arc<dyn CounterStore>,
    rule_time_counters: RwLock<HashMap<Arc<Rule>, Arc<RemoteCounterMap>>>,
    rule_token_counters: RwLock<HashMap<Arc<Rule>, Arc<RemoteCounterMap>>>,
    thread_counts: RwLock<HashMap<usize, Arc<RemoteCounterMap>>>,
}

impl ParamMetric {
    pub fn new(resource: String, store: Arc<dyn CounterStore>) -> Self {
        ParamMetric {
            resource,
            store,
            rule_time_counters: RwLock::new(HashMap::new()),
            rule_token_counters: RwLock::new(HashMap::new()),
            thread_counts: RwLock::new(HashMap::new()),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Creates the token-counter, time-recorder and thread-count tables for
    /// `rule` if absent. Idempotent, and concurrent calls for different
    /// rules only contend on the table they touch.
    pub fn initialize(&self, rule: &Arc<Rule>) {
        if !self
            .rule_time_counters
            .read()
            .unwrap()
            .contains_key(rule.as_ref())
        {
            let mut table = self.rule_time_counters.write().unwrap();
            let store = &self.store;
            table.entry(Arc::clone(rule)).or_insert_with(|| {
                Arc::new(RemoteCounterMap::new(
                    Arc::clone(store),
                    table_path(PATH_RULE_TIME_COUNTERS, &rule.counter_key_path()),
                ))
            });
        }

        if !self
            .rule_token_counters
            .read()
            .unwrap()
            .contains_key(rule.as_ref())
        {
            let mut table = self.rule_token_counters.write().unwrap();
            let store = &self.store;
            table.entry(Arc::clone(rule)).or_insert_with(|| {
                Arc::new(RemoteCounterMap::new(
                    Arc::clone(store),
                    table_path(PATH_RULE_TOKEN_COUNTER, &rule.counter_key_path()),
                ))
            });
        }

        if !self
            .thread_counts
            .read()
            .unwrap()
            .contains_key(&rule.param_index)
        {
            let mut table = self.thread_counts.write().unwrap();
            let store = &self.store;
            let resource = &self.resource;
            table.entry(rule.param_index).or_insert_with(|| {
                Arc::new(RemoteCounterMap::new(
                    Arc::clone(store),
                    table_path(
                        PATH_THREAD_COUNT_MAP,
                        &format!("{}#{}", resource, rule.param_index),
                    ),
                ))
            });
        }
    }

    /// Get the token counter table for the given parameter rule.
    pub fn rule_token_counter(&self, rule: &Arc<Rule>) -> Option<Arc<RemoteCounterMap>> {
        self.rule_token_counters
            .read()
            .unwrap()
            .get(rule.as_ref())
            .cloned()
    }

    /// Get the time recorder table for the given parameter rule.
    pub fn rule_time_counter(&self, rule: &Arc<Rule>) -> Option<Arc<RemoteCounterMap>> {
        self.rule_time_counters
            .read()
            .unwrap()
            .get(rule.as_ref())
            .cloned()
    }

    /// Increments the in-flight count of every scalar value found at each
    /// tracked argument position, fanning out over collection-valued
    /// arguments. Store faults are logged and swallowed; counter
    /// bookkeeping must never abort request processing.
    pub fn add_thread_count(&self, args: &ParamsList) {
        if let Err(err) = self.bump_thread_counts(args, true) {
            logging::warn!(
                "[ParamMetric] thread count increment failed, resource: {}, reason: {}",
                self.resource,
                err
            );
        }
    }

    /// Decrement counterpart of [`add_thread_count`](Self::add_thread_count).
    /// A value whose count falls to zero (or below, under concurrent
    /// decrements) is no longer tracked and its remote entry is removed.
    pub fn decrease_thread_count(&self, args: &ParamsList) {
        if let Err(err) = self.bump_thread_counts(args, false) {
            logging::warn!(
                "[ParamMetric] thread count decrement failed, resource: {}, reason: {}",
                self.resource,
                err
            );
        }
    }

    fn bump_thread_counts(&self, args: &ParamsList, increment: bool) -> Result<(), StoreError> {
        let tables = self.thread_counts.read().unwrap();
        for (index, arg) in args.iter().enumerate() {
            let table = match tables.get(&index) {
                Some(table) => table,
                None => continue,
            };
            for value in arg.values() {
                if increment {
                    table.counter(value).incr()?;
                } else {
                    decrement_and_prune(table, value)?;
                }
            }
        }
        Ok(())
    }

    /// Returns the number of in-flight requests carrying `value` at argument
    /// position `index`; 0 when nothing is tracked there.
    pub fn thread_count(&self, index: usize, value: &str) -> i64 {
        let table = match self.thread_counts.read().unwrap().get(&index) {
            Some(table) => Arc::clone(table),
            None => return 0,
        };
        match table.get(value) {
            Ok(Some(counter)) => counter.get().unwrap_or_else(|err| {
                logging::warn!(
                    "[ParamMetric] thread count read failed, resource: {}, reason: {}",
                    self.resource,
                    err
                );
                0
            }),
            Ok(None) => 0,
            Err(err) => {
                logging::warn!(
                    "[ParamMetric] thread count read failed, resource: {}, reason: {}",
                    self.resource,
                    err
                );
                0
            }
        }
    }

    /// Drops the process-local view of every table. Remote entries are left
    /// to their owners.
    pub fn clear(&self) {
        self.thread_counts.write().unwrap().clear();
        self.rule_time_counters.write().unwrap().clear();
        self.rule_token_counters.write().unwrap().clear();
    }
}

fn decrement_and_prune(table: &RemoteCounterMap, value: &ParamKey) -> Result<(), StoreError> {
    let counter = table.counter(value);
    if counter.get()? != 0 {
        // tolerate under-shoot from concurrent decrements
        if counter.decr()? <= 0 {
            table.remove(value)?;
        }
    }
    Ok(())
}
