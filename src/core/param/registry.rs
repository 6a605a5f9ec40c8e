use super::{ParamMetric, Rule};
use crate::{
    base::ResourceWrapper,
    cluster::CounterStore,
    logging, utils,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Process-wide map from resource name to its [`ParamMetric`], created
/// lazily and exactly once per resource. The registry is a cache of which
/// remote tables exist; it holds no counter values and performs no store
/// I/O under its lock.
#[derive(Debug)]
pub struct MetricRegistry {
    store: Arc<dyn CounterStore>,
    metrics: RwLock<HashMap<String, Arc<ParamMetric>>>,
}

impl MetricRegistry {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        MetricRegistry {
            store,
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Init the parameter metric and its counter tables for the given
    /// resource and rule. First reference constructs the metric under
    /// double-checked locking: a fast read probe, then a re-check under the
    /// write lock, so construction races converge on a single winner.
    pub fn init_metrics_for(&self, resource: &ResourceWrapper, rule: &Arc<Rule>) -> Arc<ParamMetric> {
        let resource_name = resource.name();
        let metric = self.metrics.read().unwrap().get(resource_name).cloned();
        let metric = match metric {
            Some(metric) => metric,
            None => {
                let mut metrics = self.metrics.write().unwrap();
                let store = &self.store;
                Arc::clone(metrics.entry(resource_name.clone()).or_insert_with(|| {
                    logging::info!(
                        "[MetricRegistry] Creating parameter metric for: {}",
                        resource_name
                    );
                    Arc::new(ParamMetric::new(resource_name.clone(), Arc::clone(store)))
                }))
            }
        };
        metric.initialize(rule);
        metric
    }

    pub fn metric_for(&self, resource_name: &str) -> Option<Arc<ParamMetric>> {
        self.metrics.read().unwrap().get(resource_name).cloned()
    }

    /// Removes the resource's metric entirely, e.g. when the resource is
    /// decommissioned. Only the affected entry goes away; initialization of
    /// other resources proceeds concurrently.
    pub fn clear_metric_for(&self, resource_name: &str) {
        if utils::is_blank(resource_name) {
            return;
        }
        self.metrics.write().unwrap().remove(resource_name);
        logging::info!(
            "[MetricRegistry] Clearing parameter metric for: {}",
            resource_name
        );
    }

    pub fn clear(&self) {
        self.metrics.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.metrics.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
