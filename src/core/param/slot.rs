use super::Rule;
use crate::{
    base::{
        BaseSlot, BlockType, EntryContext, FlowRule, ParamsList, ResourceWrapper, RuleCheckSlot,
        TokenResult,
    },
    config::TriggerStrategy,
    logging,
    runtime::GatewayRuntime,
    Error, Result,
};
use std::sync::Arc;

const RULE_CHECK_SLOT_ORDER: u32 = 4000;

/// The admission decision point, invoked on every request entry.
///
/// Evaluates the resource's parameter rules in catalog order. When a rule
/// fails and the request is fallback-eligible, the backup resource's rule
/// set is consulted before rejecting; a fully passing backup admits the
/// request outright.
pub struct GatewayFlowSlot {
    runtime: Arc<GatewayRuntime>,
}

impl GatewayFlowSlot {
    pub fn new(runtime: Arc<GatewayRuntime>) -> Self {
        GatewayFlowSlot { runtime }
    }

    /// Runs the parameter checks. `Ok(Blocked)` is an ordinary rejection;
    /// `Err` is a fatal configuration fault (a triggered fallback with no
    /// backup rules) and must abort the request path distinctly.
    pub fn check_param_flow(
        &self,
        resource: &ResourceWrapper,
        batch_count: u32,
        args: Option<&ParamsList>,
    ) -> Result<TokenResult> {
        let args = match args {
            Some(args) => args,
            // no arguments, no parameter checks apply
            None => return Ok(TokenResult::new_pass()),
        };

        let rules = self.runtime.catalog().rules_for(resource.name());
        for rule in &rules {
            let metric = self.runtime.registry().init_metrics_for(resource, rule);
            if self
                .runtime
                .checker()
                .pass_check(resource, rule, batch_count, args, &metric)
            {
                continue;
            }

            let priority = &self.runtime.config().priority;
            if priority.enabled && self.fallback_eligible(args, &rules) {
                return self.check_backup_rules(resource, rule, batch_count, args);
            }
            return Ok(blocked(resource, rule, args));
        }
        Ok(TokenResult::new_pass())
    }

    /// Re-runs the checks against the backup resource's own rule set. All
    /// backup rules passing admits the request immediately, short-circuiting
    /// the remaining primary rules; any failure surfaces the primary
    /// rejection.
    fn check_backup_rules(
        &self,
        resource: &ResourceWrapper,
        failed_rule: &Arc<Rule>,
        batch_count: u32,
        args: &ParamsList,
    ) -> Result<TokenResult> {
        let priority = &self.runtime.config().priority;
        let backup = resource.with_name_suffix(&priority.resource_suffix);
        let backup_rules = self.runtime.catalog().rules_for(backup.name());
        if backup_rules.is_empty() {
            return Err(Error::msg(format!(
                "backup rules can not be empty, resource: {}",
                backup.name()
            )));
        }
        for backup_rule in &backup_rules {
            let metric = self.runtime.registry().init_metrics_for(&backup, backup_rule);
            if !self
                .runtime
                .checker()
                .pass_check(&backup, backup_rule, batch_count, args, &metric)
            {
                return Ok(blocked(resource, failed_rule, args));
            }
        }
        Ok(TokenResult::new_pass())
    }

    /// A request is fallback-eligible when the configured trigger signal is
    /// present: the trailing-argument marker, the legacy argument-count
    /// heuristic, or either of them.
    fn fallback_eligible(&self, args: &ParamsList, rules: &[Arc<Rule>]) -> bool {
        let priority = &self.runtime.config().priority;
        match priority.trigger_strategy {
            TriggerStrategy::Marker => self.has_trigger_marker(args),
            TriggerStrategy::ArgCount => args.len() > rules.len(),
            TriggerStrategy::Any => {
                self.has_trigger_marker(args) || args.len() > rules.len()
            }
        }
    }

    fn has_trigger_marker(&self, args: &ParamsList) -> bool {
        let marker = &self.runtime.config().priority.trigger_marker;
        match args.last() {
            Some(last) => last.values().any(|value| value == marker),
            None => false,
        }
    }
}

fn blocked(resource: &ResourceWrapper, rule: &Arc<Rule>, args: &ParamsList) -> TokenResult {
    let triggered_value = args
        .get(rule.param_index)
        .map(|value| value.to_string())
        .unwrap_or_default();
    let msg = format!(
        "hot parameter check blocked, resource: {}, triggered value: {:?}",
        resource.name(),
        triggered_value
    );
    TokenResult::new_blocked_with_cause(
        BlockType::HotParamFlow,
        msg,
        resource.name().clone(),
        Arc::clone(rule) as Arc<dyn FlowRule>,
        triggered_value,
    )
}

impl BaseSlot for GatewayFlowSlot {
    fn order(&self) -> u32 {
        RULE_CHECK_SLOT_ORDER
    }
}

impl RuleCheckSlot for GatewayFlowSlot {
    fn check(&self, ctx: &mut EntryContext) -> TokenResult {
        let resource = ctx.resource().clone();
        let batch_count = ctx.input().batch_count();
        let args = ctx.input().args().cloned();
        match self.check_param_flow(&resource, batch_count, args.as_ref()) {
            Ok(result) => {
                if result.is_blocked() {
                    ctx.set_result(result.clone());
                }
                result
            }
            Err(err) => {
                // configuration fault: abort the request, keep the cause in
                // the context so callers can tell it apart from a rejection
                logging::error!(
                    "[GatewayFlowSlot] fatal configuration error, resource: {}, reason: {}",
                    resource.name(),
                    err
                );
                let result =
                    TokenResult::new_blocked_with_msg(BlockType::Unknown, err.to_string());
                ctx.set_err(err);
                ctx.set_result(result.clone());
                result
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::checker::MockRuleChecker;
    use super::super::{InMemoryRuleCatalog, RejectTokenChecker};
    use super::*;
    use crate::base::{ParamValue, ResourceType, TrafficType};
    use crate::config::ConfigEntity;
    use crate::runtime::GatewayRuntime;

    fn resource(name: &str) -> ResourceWrapper {
        ResourceWrapper::new(name.into(), ResourceType::APIGateway, TrafficType::Inbound)
    }

    fn rule_of(res: &str, threshold: u64) -> Arc<Rule> {
        Arc::new(Rule {
            resource: res.into(),
            threshold,
            duration_in_sec: 1,
            ..Default::default()
        })
    }

    fn priority_entity() -> ConfigEntity {
        let mut entity = ConfigEntity::new();
        entity.config.priority.enabled = true;
        entity
    }

    fn runtime_with_checker(
        entity: ConfigEntity,
        catalog: Arc<InMemoryRuleCatalog>,
        checker: Arc<dyn crate::param::RuleChecker>,
    ) -> Arc<GatewayRuntime> {
        Arc::new(GatewayRuntime::new(entity, catalog, checker).unwrap())
    }

    #[test]
    fn no_rules_always_admits() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        let mut checker = MockRuleChecker::new();
        checker.expect_pass_check().never();
        let runtime = runtime_with_checker(ConfigEntity::new(), catalog, Arc::new(checker));
        let slot = GatewayFlowSlot::new(runtime);
        let args = vec![ParamValue::from("anything")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&args))
            .unwrap();
        assert!(result.is_pass());
    }

    #[test]
    fn absent_args_always_admit() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![rule_of("abc", 0)]);
        let mut checker = MockRuleChecker::new();
        checker.expect_pass_check().never();
        let runtime = runtime_with_checker(ConfigEntity::new(), catalog, Arc::new(checker));
        let slot = GatewayFlowSlot::new(runtime);
        let result = slot.check_param_flow(&resource("abc"), 1, None).unwrap();
        assert!(result.is_pass());
    }

    #[test]
    fn rejection_carries_rule_and_value() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![rule_of("abc", 5)]);
        let mut checker = MockRuleChecker::new();
        checker.expect_pass_check().return_const(false);
        let runtime = runtime_with_checker(ConfigEntity::new(), catalog, Arc::new(checker));
        let slot = GatewayFlowSlot::new(runtime);

        let args = vec![ParamValue::from("user-42")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&args))
            .unwrap();
        let block_err = result.block_err().unwrap();
        assert_eq!(BlockType::HotParamFlow, block_err.block_type());
        assert_eq!("abc", block_err.resource_name());
        assert_eq!("user-42", block_err.triggered_value().unwrap());
        assert_eq!("abc", block_err.triggered_rule().unwrap().resource_name());
    }

    #[test]
    fn triggered_value_empty_when_args_too_short() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![Arc::new(Rule {
            resource: "abc".into(),
            param_index: 3,
            threshold: 5,
            duration_in_sec: 1,
            ..Default::default()
        })]);
        let mut checker = MockRuleChecker::new();
        checker.expect_pass_check().return_const(false);
        let runtime = runtime_with_checker(ConfigEntity::new(), catalog, Arc::new(checker));
        let slot = GatewayFlowSlot::new(runtime);

        let args = vec![ParamValue::from("user-42")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&args))
            .unwrap();
        let block_err = result.block_err().unwrap();
        assert_eq!("", block_err.triggered_value().unwrap());
    }

    #[test]
    fn marker_triggers_backup_rules() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![rule_of("abc", 0), rule_of("abc$", 100)]);
        let runtime = runtime_with_checker(
            priority_entity(),
            catalog,
            Arc::new(RejectTokenChecker::new()),
        );
        let slot = GatewayFlowSlot::new(runtime);

        // threshold 0 rejects everything on the primary resource
        let args = vec![ParamValue::from("user-42")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&args))
            .unwrap();
        assert!(result.is_blocked());

        // the same request with the trailing marker reroutes to "abc$"
        let marked = vec![ParamValue::from("user-42"), ParamValue::from("RAP")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&marked))
            .unwrap();
        assert!(result.is_pass());
    }

    #[test]
    fn failing_backup_keeps_primary_rejection() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![rule_of("abc", 0), rule_of("abc$", 0)]);
        let runtime = runtime_with_checker(
            priority_entity(),
            catalog,
            Arc::new(RejectTokenChecker::new()),
        );
        let slot = GatewayFlowSlot::new(runtime);

        let marked = vec![ParamValue::from("user-42"), ParamValue::from("RAP")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&marked))
            .unwrap();
        let block_err = result.block_err().unwrap();
        // the rejection names the primary resource, not the backup
        assert_eq!("abc", block_err.resource_name());
    }

    #[test]
    fn missing_backup_rules_is_fatal() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![rule_of("abc", 0)]);
        let runtime = runtime_with_checker(
            priority_entity(),
            catalog,
            Arc::new(RejectTokenChecker::new()),
        );
        let slot = GatewayFlowSlot::new(runtime);

        let marked = vec![ParamValue::from("user-42"), ParamValue::from("RAP")];
        let err = slot
            .check_param_flow(&resource("abc"), 1, Some(&marked))
            .unwrap_err();
        assert!(err.to_string().contains("backup rules can not be empty"));
    }

    #[test]
    fn arg_count_heuristic_strategy() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![rule_of("abc", 0), rule_of("abc$", 100)]);
        let mut entity = priority_entity();
        entity.config.priority.trigger_strategy = TriggerStrategy::ArgCount;
        let runtime =
            runtime_with_checker(entity, catalog, Arc::new(RejectTokenChecker::new()));
        let slot = GatewayFlowSlot::new(runtime);

        // one rule, two args: the legacy heuristic marks the request eligible
        let args = vec![ParamValue::from("user-42"), ParamValue::from("extra")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&args))
            .unwrap();
        assert!(result.is_pass());

        // a single argument stays ineligible and is rejected outright
        let args = vec![ParamValue::from("user-42")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&args))
            .unwrap();
        assert!(result.is_blocked());
    }

    #[test]
    fn fallback_disabled_rejects_marked_requests() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(vec![rule_of("abc", 0), rule_of("abc$", 100)]);
        let runtime = runtime_with_checker(
            ConfigEntity::new(),
            catalog,
            Arc::new(RejectTokenChecker::new()),
        );
        let slot = GatewayFlowSlot::new(runtime);

        let marked = vec![ParamValue::from("user-42"), ParamValue::from("RAP")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&marked))
            .unwrap();
        assert!(result.is_blocked());
    }

    #[test]
    fn backup_success_short_circuits_remaining_primary_rules() {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        // two primary rules: the first rejects, the second would also reject
        catalog.load_rules(vec![
            rule_of("abc", 0),
            Arc::new(Rule {
                resource: "abc".into(),
                param_index: 0,
                threshold: 0,
                burst_count: 1,
                duration_in_sec: 1,
                ..Default::default()
            }),
            rule_of("abc$", 100),
        ]);
        let mut entity = priority_entity();
        entity.config.priority.trigger_strategy = TriggerStrategy::Any;
        let runtime =
            runtime_with_checker(entity, catalog, Arc::new(RejectTokenChecker::new()));
        let slot = GatewayFlowSlot::new(runtime);

        let marked = vec![ParamValue::from("user-42"), ParamValue::from("RAP")];
        let result = slot
            .check_param_flow(&resource("abc"), 1, Some(&marked))
            .unwrap();
        assert!(result.is_pass());
    }
}
