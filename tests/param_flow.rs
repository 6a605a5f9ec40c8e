use gateway_param_flow::api::EntryBuilder;
use gateway_param_flow::base::{BlockError, BlockType, ParamValue, ParamsList};
use gateway_param_flow::cluster::{CounterStore, MemoryCounterStore};
use gateway_param_flow::config::{ConfigEntity, TriggerStrategy};
use gateway_param_flow::param::{InMemoryRuleCatalog, RejectTokenChecker, Rule};
use gateway_param_flow::runtime::GatewayRuntime;
use std::sync::Arc;

fn order_svc_rules() -> Vec<Arc<Rule>> {
    vec![
        Arc::new(Rule {
            resource: "orderSvc".into(),
            param_index: 0,
            threshold: 5,
            duration_in_sec: 1,
            ..Default::default()
        }),
        Arc::new(Rule {
            resource: "orderSvc$".into(),
            param_index: 0,
            threshold: 100,
            duration_in_sec: 1,
            ..Default::default()
        }),
    ]
}

fn gateway_runtime(rules: Vec<Arc<Rule>>, priority_enabled: bool) -> Arc<GatewayRuntime> {
    let catalog = Arc::new(InMemoryRuleCatalog::new());
    catalog.load_rules(rules);
    let mut entity = ConfigEntity::new();
    entity.config.priority.enabled = priority_enabled;
    entity.config.priority.trigger_strategy = TriggerStrategy::Marker;
    Arc::new(
        GatewayRuntime::new(entity, catalog, Arc::new(RejectTokenChecker::new())).unwrap(),
    )
}

fn args(values: &[&str]) -> ParamsList {
    values.iter().map(|v| ParamValue::from(*v)).collect()
}

#[test]
fn resources_without_rules_always_admit() {
    let runtime = gateway_runtime(vec![], false);
    let chain = runtime.build_slot_chain();
    for value in &["a", "b", "c"] {
        let entry = EntryBuilder::new("anySvc".into(), Arc::clone(&chain))
            .with_args(Some(args(&[value])))
            .build()
            .unwrap();
        entry.exit();
    }
}

#[test]
fn hot_value_exhausts_threshold_and_is_rejected() {
    let runtime = gateway_runtime(order_svc_rules(), false);
    let chain = runtime.build_slot_chain();

    for _ in 0..5 {
        let entry = EntryBuilder::new("orderSvc".into(), Arc::clone(&chain))
            .with_args(Some(args(&["user-42"])))
            .build()
            .unwrap();
        entry.exit();
    }

    let err = EntryBuilder::new("orderSvc".into(), Arc::clone(&chain))
        .with_args(Some(args(&["user-42"])))
        .build()
        .unwrap_err();
    let block_err = err.downcast_ref::<BlockError>().unwrap();
    assert_eq!(BlockType::HotParamFlow, block_err.block_type());
    assert_eq!("orderSvc", block_err.resource_name());
    assert_eq!("user-42", block_err.triggered_value().unwrap());

    // rejection is idempotent: retrying against unchanged counters fails alike
    let err = EntryBuilder::new("orderSvc".into(), Arc::clone(&chain))
        .with_args(Some(args(&["user-42"])))
        .build()
        .unwrap_err();
    assert!(err.downcast_ref::<BlockError>().is_some());

    // an unrelated value is not throttled
    let entry = EntryBuilder::new("orderSvc".into(), chain)
        .with_args(Some(args(&["user-7"])))
        .build()
        .unwrap();
    entry.exit();
}

#[test]
fn marked_request_falls_back_to_backup_resource() {
    let runtime = gateway_runtime(order_svc_rules(), true);
    let chain = runtime.build_slot_chain();

    // burn through the primary threshold
    for _ in 0..5 {
        let entry = EntryBuilder::new("orderSvc".into(), Arc::clone(&chain))
            .with_args(Some(args(&["user-42"])))
            .build()
            .unwrap();
        entry.exit();
    }

    // the sixth plain request is rejected
    let err = EntryBuilder::new("orderSvc".into(), Arc::clone(&chain))
        .with_args(Some(args(&["user-42"])))
        .build()
        .unwrap_err();
    assert_eq!(
        "user-42",
        err.downcast_ref::<BlockError>()
            .unwrap()
            .triggered_value()
            .unwrap()
    );

    // the identical request with the trailing marker is admitted through the
    // backup resource, whose threshold is not exceeded yet
    let entry = EntryBuilder::new("orderSvc".into(), Arc::clone(&chain))
        .with_args(Some(args(&["user-42", "RAP"])))
        .build()
        .unwrap();
    entry.exit();

    // without the marker it keeps being rejected
    let err = EntryBuilder::new("orderSvc".into(), chain)
        .with_args(Some(args(&["user-42"])))
        .build()
        .unwrap_err();
    assert!(err.downcast_ref::<BlockError>().is_some());
}

#[test]
fn triggered_fallback_without_backup_rules_is_a_configuration_error() {
    let rules = vec![Arc::new(Rule {
        resource: "orderSvc".into(),
        param_index: 0,
        threshold: 0,
        duration_in_sec: 1,
        ..Default::default()
    })];
    let runtime = gateway_runtime(rules, true);
    let chain = runtime.build_slot_chain();

    let err = EntryBuilder::new("orderSvc".into(), chain)
        .with_args(Some(args(&["user-42", "RAP"])))
        .build()
        .unwrap_err();
    // fatal configuration fault, not a rule rejection
    assert!(err.downcast_ref::<BlockError>().is_none());
    assert!(err.to_string().contains("backup rules can not be empty"));
}

#[test]
fn thread_counts_are_symmetric_and_pruned() {
    let rules = vec![Arc::new(Rule {
        resource: "orderSvc".into(),
        param_index: 0,
        threshold: 100,
        duration_in_sec: 1,
        ..Default::default()
    })];
    let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
    let catalog = Arc::new(InMemoryRuleCatalog::new());
    catalog.load_rules(rules);
    let runtime = Arc::new(GatewayRuntime::with_store(
        ConfigEntity::new(),
        Arc::clone(&store),
        catalog,
        Arc::new(RejectTokenChecker::new()),
    ));
    let chain = runtime.build_slot_chain();

    let mut entries = Vec::new();
    for _ in 0..3 {
        entries.push(
            EntryBuilder::new("orderSvc".into(), Arc::clone(&chain))
                .with_args(Some(args(&["user-42"])))
                .build()
                .unwrap(),
        );
    }
    let metric = runtime.registry().metric_for("orderSvc").unwrap();
    assert_eq!(3, metric.thread_count(0, "user-42"));

    for entry in entries {
        entry.exit();
    }
    assert_eq!(0, metric.thread_count(0, "user-42"));
    // the remote entry is removed once the count reaches zero
    assert!(!store
        .exists("threadCountMap:orderSvc#0:user-42")
        .unwrap());
}

#[test]
fn collection_arguments_fan_out_per_element() {
    let rules = vec![Arc::new(Rule {
        resource: "orderSvc".into(),
        param_index: 0,
        threshold: 100,
        duration_in_sec: 1,
        ..Default::default()
    })];
    let runtime = gateway_runtime(rules, false);
    let chain = runtime.build_slot_chain();

    let list_args = vec![ParamValue::from(vec!["a", "b", "c"])];
    let entry = EntryBuilder::new("orderSvc".into(), chain)
        .with_args(Some(list_args))
        .build()
        .unwrap();

    let metric = runtime.registry().metric_for("orderSvc").unwrap();
    assert_eq!(1, metric.thread_count(0, "a"));
    assert_eq!(1, metric.thread_count(0, "b"));
    assert_eq!(1, metric.thread_count(0, "c"));

    entry.exit();
    assert_eq!(0, metric.thread_count(0, "a"));
    assert_eq!(0, metric.thread_count(0, "b"));
    assert_eq!(0, metric.thread_count(0, "c"));
}

#[test]
fn concurrent_entries_never_exceed_threshold() {
    use rand::Rng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    let runtime = gateway_runtime(order_svc_rules(), false);
    let chain = runtime.build_slot_chain();
    let admitted = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let chain = Arc::clone(&chain);
        let admitted = Arc::clone(&admitted);
        handles.push(thread::spawn(move || {
            let jitter = rand::thread_rng().gen_range(0..5u64);
            thread::sleep(std::time::Duration::from_millis(jitter));
            if let Ok(entry) = EntryBuilder::new("orderSvc".into(), chain)
                .with_args(Some(args(&["user-42"])))
                .build()
            {
                admitted.fetch_add(1, Ordering::SeqCst);
                entry.exit();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let admitted = admitted.load(Ordering::SeqCst);
    assert!(admitted >= 1, "someone must get through");
    assert!(admitted <= 5, "threshold overrun: {} admitted", admitted);
}

#[test]
fn gateway_processes_share_counters_through_one_store() {
    // two runtimes stand in for two gateway processes pointed at one store
    let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
    let rules = || {
        vec![Arc::new(Rule {
            resource: "orderSvc".into(),
            param_index: 0,
            threshold: 5,
            duration_in_sec: 1,
            ..Default::default()
        })]
    };
    let mut chains = Vec::new();
    let mut runtimes = Vec::new();
    for _ in 0..2 {
        let catalog = Arc::new(InMemoryRuleCatalog::new());
        catalog.load_rules(rules());
        let runtime = Arc::new(GatewayRuntime::with_store(
            ConfigEntity::new(),
            Arc::clone(&store),
            catalog,
            Arc::new(RejectTokenChecker::new()),
        ));
        chains.push(runtime.build_slot_chain());
        runtimes.push(runtime);
    }

    // five admissions spread over both processes use up the shared bucket
    for i in 0..5 {
        let entry = EntryBuilder::new("orderSvc".into(), Arc::clone(&chains[i % 2]))
            .with_args(Some(args(&["user-42"])))
            .build()
            .unwrap();
        entry.exit();
    }
    // either process rejects the sixth
    let err = EntryBuilder::new("orderSvc".into(), Arc::clone(&chains[1]))
        .with_args(Some(args(&["user-42"])))
        .build()
        .unwrap_err();
    assert!(err.downcast_ref::<BlockError>().is_some());
}
