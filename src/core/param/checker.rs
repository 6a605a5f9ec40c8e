use super::{ParamMetric, Rule};
use crate::{
    base::{ParamsList, ResourceWrapper},
    cluster::{CounterMap, RemoteCounterMap, StoreError},
    logging, utils,
};
use std::fmt;
use std::sync::Arc;
use std::thread;

/// The per-value statistical pass/fail predicate consulted for every rule.
/// Implementations read and update the counter tables exposed by
/// [`ParamMetric`]; the admission slot guarantees the tables are initialized
/// before the first check.
pub trait RuleChecker: Send + Sync + fmt::Debug {
    fn pass_check(
        &self,
        resource: &ResourceWrapper,
        rule: &Arc<Rule>,
        batch_count: u32,
        args: &ParamsList,
        metric: &Arc<ParamMetric>,
    ) -> bool;
}

/// Token-bucket checker over the distributed counter tables.
///
/// Each parameter value owns a token counter and a time recorder in the
/// shared store. Tokens refill when the statistic window has passed and are
/// consumed per request batch; both transitions go through the store's
/// compare-and-set so concurrent gateway processes agree on every token.
#[derive(Debug, Default)]
pub struct RejectTokenChecker {}

impl RejectTokenChecker {
    pub fn new() -> Self {
        Default::default()
    }

    fn check_value(
        &self,
        rule: &Rule,
        batch_count: u32,
        value: &str,
        token_counter: &RemoteCounterMap,
        time_counter: &RemoteCounterMap,
    ) -> Result<bool, StoreError> {
        let mut token_count = rule.threshold;
        // settings stored in the `specific_items` take priority over the rule threshold
        if let Some(specific) = rule.specific_items.get(value) {
            token_count = *specific;
        }
        if token_count == 0 {
            return Ok(false);
        }

        let max_count = token_count + rule.burst_count;
        if u64::from(batch_count) > max_count {
            return Ok(false);
        }
        let left_count = (max_count - u64::from(batch_count)) as i64;
        let window_ms = (rule.duration_in_sec * 1000) as i64;

        loop {
            let current_time = utils::curr_time_millis() as i64;
            let last_add_token_time = match time_counter.put_if_absent(value, current_time)? {
                None => {
                    // First fill, consume the batch immediately
                    token_counter.put_if_absent(value, left_count)?;
                    return Ok(true);
                }
                Some(last) => last,
            };

            let pass_time = current_time - last_add_token_time;
            if pass_time > window_ms {
                // Refill the tokens because the statistic window has passed.
                match token_counter.put_if_absent(value, left_count)? {
                    None => {
                        // Might not be accurate here.
                        time_counter.put(value, current_time)?;
                        return Ok(true);
                    }
                    Some(rest_qps) => {
                        let to_add = (pass_time as u64) * token_count / (rule.duration_in_sec * 1000);
                        let new_qps = if to_add as i64 + rest_qps > max_count as i64 {
                            max_count as i64 - i64::from(batch_count)
                        } else {
                            to_add as i64 + rest_qps - i64::from(batch_count)
                        };
                        if new_qps < 0 {
                            return Ok(false);
                        }
                        if token_counter
                            .counter(value)
                            .compare_and_set(rest_qps, new_qps)?
                        {
                            time_counter.put(value, current_time)?;
                            return Ok(true);
                        }
                        thread::yield_now();
                    }
                }
            } else {
                // check whether the rest of tokens covers the batch
                match token_counter.get(value)? {
                    Some(counter) => {
                        let old_rest_token = counter.get()?;
                        if old_rest_token < i64::from(batch_count) {
                            return Ok(false);
                        }
                        if counter
                            .compare_and_set(old_rest_token, old_rest_token - i64::from(batch_count))?
                        {
                            return Ok(true);
                        }
                        thread::yield_now();
                    }
                    None => {
                        // entry pruned concurrently, start over with a fresh bucket
                        if token_counter.put_if_absent(value, left_count)?.is_none() {
                            return Ok(true);
                        }
                        thread::yield_now();
                    }
                }
            }
        }
    }
}

impl RuleChecker for RejectTokenChecker {
    fn pass_check(
        &self,
        resource: &ResourceWrapper,
        rule: &Arc<Rule>,
        batch_count: u32,
        args: &ParamsList,
        metric: &Arc<ParamMetric>,
    ) -> bool {
        let arg = match args.get(rule.param_index) {
            Some(arg) => arg,
            // nothing to inspect at the rule's position
            None => return true,
        };
        let (token_counter, time_counter) = match (
            metric.rule_token_counter(rule),
            metric.rule_time_counter(rule),
        ) {
            (Some(token), Some(time)) => (token, time),
            _ => return true,
        };
        for value in arg.values() {
            match self.check_value(rule, batch_count, value, &token_counter, &time_counter) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(err) => {
                    // degrade to no protection instead of amplifying a store outage
                    logging::warn!(
                        "[RejectTokenChecker] store fault during check, resource: {}, reason: {}",
                        resource.name(),
                        err
                    );
                    return true;
                }
            }
        }
        true
    }
}

#[cfg(test)]
pub(crate) use test::MockRuleChecker;
