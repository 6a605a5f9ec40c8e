use super::Rule;
use crate::{base::FlowRule, logging, Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

pub type RuleMap = HashMap<String, Vec<Arc<Rule>>>;

/// RuleCatalog resolves a resource name to its configured parameter rules,
/// in evaluation order. An empty result means "no constraints".
pub trait RuleCatalog: Send + Sync + fmt::Debug {
    fn rules_for(&self, resource: &str) -> Vec<Arc<Rule>>;
}

/// In-memory rule catalog fed by the control plane.
#[derive(Debug, Default)]
pub struct InMemoryRuleCatalog {
    rules: RwLock<RuleMap>,
}

impl InMemoryRuleCatalog {
    pub fn new() -> Self {
        Default::default()
    }

    /// `load_rules` loads the given parameter flow rules, replacing all
    /// previous rules. The returned `bool` indicates whether a real load
    /// happened; loading the same rules again is a no-op.
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        let mut rule_map: RuleMap = HashMap::new();
        for rule in rules {
            match rule.is_valid() {
                Ok(_) => {
                    let entry = rule_map.entry(rule.resource.clone()).or_default();
                    if !entry.contains(&rule) {
                        entry.push(rule);
                    }
                }
                Err(err) => logging::warn!(
                    "[RuleCatalog load_rules] Ignoring invalid parameter flow rule {:?}, reason: {:?}",
                    rule,
                    err
                ),
            }
        }

        let mut global_rule_map = self.rules.write().unwrap();
        if *global_rule_map == rule_map {
            logging::info!(
                "[RuleCatalog] Load rules is the same with current rules, so ignore load operation."
            );
            return false;
        }
        *global_rule_map = rule_map;
        drop(global_rule_map);
        self.log_rule_update();
        true
    }

    /// `load_rules_of_resource` replaces the given resource's rules only.
    /// An empty rule list clears the resource.
    pub fn load_rules_of_resource(&self, res: &str, rules: Vec<Arc<Rule>>) -> Result<bool> {
        if res.is_empty() {
            return Err(Error::msg("empty resource"));
        }
        let mut valid_rules = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.resource != res {
                logging::warn!(
                    "[RuleCatalog load_rules_of_resource] Ignoring rule of unmatched resource, expect: {}, actual: {}",
                    res,
                    rule.resource
                );
                continue;
            }
            match rule.is_valid() {
                Ok(_) => {
                    if !valid_rules.contains(&rule) {
                        valid_rules.push(rule);
                    }
                }
                Err(err) => logging::warn!(
                    "[RuleCatalog load_rules_of_resource] Ignoring invalid parameter flow rule {:?}, reason: {:?}",
                    rule,
                    err
                ),
            }
        }

        let mut global_rule_map = self.rules.write().unwrap();
        if valid_rules.is_empty() {
            global_rule_map.remove(res);
            logging::info!("[RuleCatalog] clear resource level rules, resource {}", res);
            return Ok(true);
        }
        if global_rule_map.get(res) == Some(&valid_rules) {
            logging::info!("[RuleCatalog] Load resource level rules is the same with current resource level rules, so ignore load operation.");
            return Ok(false);
        }
        global_rule_map.insert(res.into(), valid_rules);
        Ok(true)
    }

    /// `rules` returns all currently loaded rules.
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        let rule_map = self.rules.read().unwrap();
        let mut rules = Vec::new();
        for res_rules in rule_map.values() {
            rules.extend(res_rules.iter().cloned());
        }
        rules
    }

    pub fn clear_rules(&self) {
        self.rules.write().unwrap().clear();
    }

    pub fn clear_rules_of_resource(&self, res: &str) {
        self.rules.write().unwrap().remove(res);
    }

    fn log_rule_update(&self) {
        let rule_map = self.rules.read().unwrap();
        if rule_map.is_empty() {
            logging::info!("[RuleCatalog] Parameter flow rules were cleared")
        } else {
            logging::info!(
                "[RuleCatalog] Parameter flow rules were loaded: {:?}",
                rule_map.values()
            )
        }
    }
}

impl RuleCatalog for InMemoryRuleCatalog {
    fn rules_for(&self, resource: &str) -> Vec<Arc<Rule>> {
        self.rules
            .read()
            .unwrap()
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rule_of(res: &str, threshold: u64) -> Arc<Rule> {
        Arc::new(Rule {
            resource: res.into(),
            threshold,
            duration_in_sec: 1,
            ..Default::default()
        })
    }

    #[test]
    fn load_rules() {
        let catalog = InMemoryRuleCatalog::new();
        let rule = rule_of("abc", 100);

        assert!(catalog.load_rules(vec![Arc::clone(&rule)]));
        // reloading identical rules is a no-op
        assert!(!catalog.load_rules(vec![Arc::clone(&rule)]));

        assert_eq!(1, catalog.rules_for("abc").len());
        assert!(catalog.rules_for("missing").is_empty());
    }

    #[test]
    fn invalid_rules_are_filtered() {
        let catalog = InMemoryRuleCatalog::new();
        let invalid = Arc::new(Rule {
            resource: "".into(),
            ..Default::default()
        });
        assert!(catalog.load_rules(vec![invalid, rule_of("abc", 1)]));
        assert_eq!(1, catalog.rules().len());
    }

    #[test]
    fn load_rules_of_resource() {
        let catalog = InMemoryRuleCatalog::new();
        catalog.load_rules(vec![rule_of("abc1", 100), rule_of("abc2", 100)]);

        assert!(catalog.load_rules_of_resource("", vec![]).is_err());
        assert!(!catalog
            .load_rules_of_resource("abc1", vec![rule_of("abc1", 100)])
            .unwrap());
        assert!(catalog
            .load_rules_of_resource("abc1", vec![rule_of("abc1", 200)])
            .unwrap());
        assert_eq!(200, catalog.rules_for("abc1")[0].threshold);

        // clearing one resource leaves the others alone
        assert!(catalog.load_rules_of_resource("abc1", vec![]).unwrap());
        assert!(catalog.rules_for("abc1").is_empty());
        assert_eq!(1, catalog.rules_for("abc2").len());
    }

    #[test]
    fn evaluation_order_is_load_order() {
        let catalog = InMemoryRuleCatalog::new();
        let first = rule_of("abc", 1);
        let second = rule_of("abc", 2);
        catalog.load_rules(vec![Arc::clone(&first), Arc::clone(&second)]);
        let rules = catalog.rules_for("abc");
        assert_eq!(1, rules[0].threshold);
        assert_eq!(2, rules[1].threshold);
    }

    #[test]
    fn clear_rules() {
        let catalog = InMemoryRuleCatalog::new();
        catalog.load_rules(vec![rule_of("abc1", 100), rule_of("abc2", 100)]);
        catalog.clear_rules_of_resource("abc1");
        assert!(catalog.rules_for("abc1").is_empty());
        assert_eq!(1, catalog.rules().len());
        catalog.clear_rules();
        assert!(catalog.rules().is_empty());
    }
}
