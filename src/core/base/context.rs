//! Context
//!
use super::{EntryWeakPtr, ResourceWrapper, TokenResult};
use crate::utils::time::curr_time_millis;
use crate::Error;
use std::fmt;
use std::sync::{Arc, RwLock};

pub type ContextPtr = Arc<RwLock<EntryContext>>;

pub type ParamKey = String;

/// A single request argument. Gateway handlers may carry collection-valued
/// arguments (e.g. repeated query parameters); every element of a `List`
/// is tracked as its own hot parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Scalar(ParamKey),
    List(Vec<ParamKey>),
}

impl ParamValue {
    /// Iterates over every scalar value carried at this position.
    pub fn values(&self) -> impl Iterator<Item = &ParamKey> {
        match self {
            ParamValue::Scalar(value) => std::slice::from_ref(value).iter(),
            ParamValue::List(values) => values.iter(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Scalar(value) => write!(f, "{}", value),
            ParamValue::List(values) => write!(f, "{:?}", values),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.into())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::List(values.into_iter().map(|v| v.into()).collect())
    }
}

pub type ParamsList = Vec<ParamValue>;

#[derive(Default)]
pub struct EntryContext {
    /// entry<->context, cycled reference, so need Weak,
    /// context should not change entry, so here we do not use RwLock
    entry: Option<EntryWeakPtr>,
    start_time: u64,
    resource: ResourceWrapper,
    input: EntryInput,
    /// the result of rule slots check
    rule_check_result: TokenResult,
    err: Option<Error>,
}

impl EntryContext {
    pub fn new() -> Self {
        EntryContext {
            start_time: curr_time_millis(),
            ..Default::default()
        }
    }

    pub fn set_entry(&mut self, entry: EntryWeakPtr) {
        self.entry = Some(entry);
    }

    pub fn entry(&self) -> Option<&EntryWeakPtr> {
        self.entry.as_ref()
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn is_blocked(&self) -> bool {
        self.rule_check_result.is_blocked()
    }

    pub fn set_resource(&mut self, resource: ResourceWrapper) {
        self.resource = resource;
    }

    pub fn resource(&self) -> &ResourceWrapper {
        &self.resource
    }

    pub fn set_input(&mut self, input: EntryInput) {
        self.input = input;
    }

    pub fn input(&self) -> &EntryInput {
        &self.input
    }

    pub fn set_result(&mut self, result: TokenResult) {
        self.rule_check_result = result;
    }

    pub fn reset_result_to_pass(&mut self) {
        self.rule_check_result.reset_to_pass();
    }

    pub fn result(&self) -> &TokenResult {
        &self.rule_check_result
    }

    pub fn set_err(&mut self, err: Error) {
        self.err = Some(err);
    }

    pub fn get_err(&self) -> &Option<Error> {
        &self.err
    }

    pub fn take_err(&mut self) -> Option<Error> {
        self.err.take()
    }
}

/// Input of the admission checks
#[derive(Debug)]
pub struct EntryInput {
    batch_count: u32,
    /// positional request arguments inspected by parameter rules
    args: Option<ParamsList>,
}

impl Default for EntryInput {
    fn default() -> Self {
        EntryInput {
            batch_count: 1,
            args: None,
        }
    }
}

impl EntryInput {
    pub fn new(batch_count: u32) -> Self {
        EntryInput {
            batch_count,
            ..Default::default()
        }
    }

    pub fn set_batch_count(&mut self, batch_count: u32) {
        self.batch_count = batch_count;
    }

    pub fn batch_count(&self) -> u32 {
        self.batch_count
    }

    pub fn set_args(&mut self, args: ParamsList) {
        self.args = Some(args);
    }

    pub fn args(&self) -> Option<&ParamsList> {
        self.args.as_ref()
    }
}
