use crate::{
    base::SlotChain,
    cluster::{CounterStore, MemoryCounterStore, RedisCounterStore},
    config::{ConfigEntity, GatewayConfig},
    logging,
    param::{GatewayFlowSlot, MetricRegistry, ParamStatSlot, RuleCatalog, RuleChecker},
    Result,
};
use std::fmt;
use std::sync::Arc;

/// Process-wide context owned by the gateway: the validated configuration,
/// the counter-store client, the metric registry and the pluggable rule
/// catalog and checker. There is no hidden global state; tests build a
/// runtime around a fake store and throw it away.
pub struct GatewayRuntime {
    config: ConfigEntity,
    store: Arc<dyn CounterStore>,
    registry: MetricRegistry,
    catalog: Arc<dyn RuleCatalog>,
    checker: Arc<dyn RuleChecker>,
}

impl fmt::Debug for GatewayRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRuntime")
            .field("app_name", &self.config.config.app.app_name)
            .field("cluster_enabled", &self.config.config.cluster.enabled)
            .finish()
    }
}

impl GatewayRuntime {
    /// Validates the configuration and binds the counter store: the remote
    /// one when cluster mode is enabled (failing fast on a missing server
    /// address), a process-local one otherwise.
    pub fn new(
        config: ConfigEntity,
        catalog: Arc<dyn RuleCatalog>,
        checker: Arc<dyn RuleChecker>,
    ) -> Result<Self> {
        config.check()?;
        let store: Arc<dyn CounterStore> = if config.config.cluster.enabled {
            Arc::new(RedisCounterStore::connect(&config.config.cluster)?)
        } else {
            Arc::new(MemoryCounterStore::new())
        };
        Ok(Self::with_store(config, store, catalog, checker))
    }

    /// Binds an explicit store, e.g. a fake one in tests.
    pub fn with_store(
        config: ConfigEntity,
        store: Arc<dyn CounterStore>,
        catalog: Arc<dyn RuleCatalog>,
        checker: Arc<dyn RuleChecker>,
    ) -> Self {
        let registry = MetricRegistry::new(Arc::clone(&store));
        GatewayRuntime {
            config,
            store,
            registry,
            catalog,
            checker,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config.config
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<dyn RuleCatalog> {
        &self.catalog
    }

    pub fn checker(&self) -> &Arc<dyn RuleChecker> {
        &self.checker
    }

    /// Wires the admission slot and the bookkeeping slot into a chain ready
    /// for [`EntryBuilder`](crate::api::EntryBuilder).
    pub fn build_slot_chain(self: &Arc<Self>) -> Arc<SlotChain> {
        let mut chain = SlotChain::new();
        chain.add_rule_check_slot(Arc::new(GatewayFlowSlot::new(Arc::clone(self))));
        chain.add_stat_slot(Arc::new(ParamStatSlot::new(Arc::clone(self))));
        Arc::new(chain)
    }

    /// Explicit teardown: drops the process-local metric cache. Remote
    /// counters are left to the surviving gateway processes.
    pub fn shutdown(&self) {
        self.registry.clear();
        logging::info!("[GatewayRuntime] shut down, metric registry cleared");
    }
}
