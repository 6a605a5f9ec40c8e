use crate::{
    base::{FlowRule, ParamKey},
    Error,
};
use serde::{Deserialize, Serialize};
use serde_json;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};

/// Rule represents one hot-parameter flow control rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// `id` is the unique id
    pub id: String,
    /// `resource` is the resource name
    pub resource: String,
    /// `param_index` is the zero-based index in the request argument slice.
    /// The argument value found there is the hot parameter this rule counts.
    pub param_index: usize,
    /// `threshold` is the per-value threshold handed to the rule evaluator
    pub threshold: u64,
    /// `burst_count` is the silent count tolerated on top of `threshold`
    pub burst_count: u64,
    /// `duration_in_sec` is the time interval of the statistic window
    pub duration_in_sec: u64,
    /// `specific_items` indicates the special threshold for specific values
    pub specific_items: HashMap<ParamKey, u64>,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            id: uuid::Uuid::new_v4().to_string(),
            resource: String::default(),
            param_index: 0,
            threshold: 0,
            burst_count: 0,
            duration_in_sec: 1,
            specific_items: HashMap::default(),
        }
    }
}

impl Rule {
    /// Deterministic namespace fragment for this rule's counter tables.
    /// Derived from configured content, never from the generated id, so every
    /// process loading the same rule converges on the same remote keys.
    pub fn counter_key_path(&self) -> String {
        format!(
            "{}#{}#{}#{}#{}",
            self.resource, self.param_index, self.threshold, self.burst_count, self.duration_in_sec
        )
    }
}

// Rules are value objects: identity follows configured content, so they are
// usable as counter-table keys. The generated `id` stays out of both.
impl Eq for Rule {}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
            && self.param_index == other.param_index
            && self.threshold == other.threshold
            && self.burst_count == other.burst_count
            && self.duration_in_sec == other.duration_in_sec
            && self.specific_items == other.specific_items
    }
}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.param_index.hash(state);
        self.threshold.hash(state);
        self.burst_count.hash(state);
        self.duration_in_sec.hash(state);
    }
}

impl FlowRule for Rule {
    fn resource_name(&self) -> String {
        self.resource.clone()
    }

    fn is_valid(&self) -> crate::Result<()> {
        if self.resource.is_empty() {
            return Err(Error::msg("empty resource name"));
        }
        if self.duration_in_sec == 0 {
            return Err(Error::msg("invalid duration"));
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).unwrap();
        write!(f, "{}", fmtted)
    }
}
