//! Integration test: saving a session envelope and rebuilding an
//! orchestrator from it.

use std::time::Duration;

use gantry_core::ComponentConfig;
use gantry_engine::{ConfigError, KindRegistry, Orchestrator, OrchestratorConfig, SessionConfig};
use gantry_graph::GraphError;
use gantry_test_utils::{
    cap, factory, ConfigurableComponent, EventLog, RecordingComponent, Settings,
};
use serde_json::json;

fn orch() -> Orchestrator {
    Orchestrator::new(OrchestratorConfig::default()).unwrap()
}

fn registry(log: &EventLog) -> KindRegistry {
    let mut reg = KindRegistry::new();
    reg.register(ConfigurableComponent::KIND, factory(ConfigurableComponent::default))
        .unwrap();
    let rec_log = log.clone();
    reg.register(
        "recorder",
        factory(move || RecordingComponent::new("recorder", &rec_log).persisted(json!(null))),
    )
    .unwrap();
    let net_log = log.clone();
    reg.register(
        "net",
        factory(move || {
            RecordingComponent::new("net", &net_log)
                .supplies(cap("net"))
                .persisted(json!(null))
        }),
    )
    .unwrap();
    reg
}

// ── Save ────────────────────────────────────────────────────────

#[test]
fn only_persisted_components_are_saved_in_registration_order() {
    let log = EventLog::new();
    let mut o = orch();
    o.set_tolerable_lag(Duration::from_millis(5));
    o.register(ConfigurableComponent::new("north", 1));
    o.register(RecordingComponent::new("transient", &log));
    o.register(ConfigurableComponent::new("south", 2));
    o.apply_pending_changes().unwrap();

    let session = o.save_configuration().unwrap();
    assert!((session.tolerable_lag_secs - 0.005).abs() < 1e-12);
    assert_eq!(session.components.len(), 2);
    let labels: Vec<String> = session
        .components
        .iter()
        .map(|blob| blob.decode::<Settings>().unwrap().label)
        .collect();
    assert_eq!(labels, vec!["north", "south"]);
}

#[test]
fn save_hooks_run_only_while_attached() {
    let log = EventLog::new();
    let mut o = orch();
    o.register(RecordingComponent::new("a", &log));
    o.register(RecordingComponent::new("b", &log));
    assert!(o.save().unwrap().is_empty());
    assert!(log.is_empty());

    o.attach().unwrap();
    o.save().unwrap();
    assert_eq!(log.with_suffix("save"), vec!["a", "b"]);
}

// ── Reload ──────────────────────────────────────────────────────

#[test]
fn saved_session_round_trips_through_json() {
    let log = EventLog::new();
    let mut original = orch();
    original.set_tolerable_lag(Duration::from_millis(5));
    original.register(ConfigurableComponent::new("north", 1));
    original.register(ConfigurableComponent::new("south", 2));
    original.register(RecordingComponent::new("recorder", &log).persisted(json!({ "volume": 7 })));
    original.attach().unwrap();
    let saved = original.save_configuration().unwrap();
    let json = saved.to_json().unwrap();

    let reg = registry(&log);
    let mut restored = orch();
    let ids = restored
        .append_configuration(&SessionConfig::from_json(&json).unwrap(), &reg)
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(restored.tolerable_lag(), Duration::from_millis(5));
    restored.attach().unwrap();

    let again = restored.save_configuration().unwrap();
    assert_eq!(again.components, saved.components);
    assert!((again.tolerable_lag_secs - saved.tolerable_lag_secs).abs() < 1e-12);
}

#[test]
fn blob_is_loaded_before_attach() {
    let log = EventLog::new();
    let reg = registry(&log);
    let session = SessionConfig {
        tolerable_lag_secs: 0.01,
        components: vec![ComponentConfig::with_data("recorder", json!({ "volume": 3 }))],
    };

    let mut o = orch();
    o.append_configuration(&session, &reg).unwrap();
    o.attach().unwrap();
    assert!(log.position("recorder:load").unwrap() < log.position("recorder:attach").unwrap());
    assert_eq!(o.save_configuration().unwrap().components, session.components);
}

#[test]
fn register_with_config_loads_typed_settings() {
    let mut o = orch();
    let id = o.register_with_config(
        ConfigurableComponent::default(),
        ComponentConfig::encode(
            ConfigurableComponent::KIND,
            &Settings {
                label: "east".into(),
                level: 9,
            },
        )
        .unwrap(),
    );
    o.attach().unwrap();

    let saved = o.save_configuration().unwrap();
    assert_eq!(saved.components.len(), 1);
    let settings: Settings = saved.components[0].decode().unwrap();
    assert_eq!(settings.label, "east");
    assert_eq!(settings.level, 9);
    assert!(o.contains(id));
}

#[test]
fn unknown_kind_leaves_orchestrator_untouched() {
    let log = EventLog::new();
    let reg = registry(&log);
    let session = SessionConfig {
        tolerable_lag_secs: 0.5,
        components: vec![
            ComponentConfig::new(ConfigurableComponent::KIND),
            ComponentConfig::new("ghost"),
        ],
    };

    let mut o = orch();
    let lag = o.tolerable_lag();
    match o.append_configuration(&session, &reg) {
        Err(ConfigError::UnknownKind { kind }) => assert_eq!(kind, "ghost"),
        other => panic!("expected UnknownKind, got {other:?}"),
    }
    assert_eq!(o.pending_changes(), 0);
    assert_eq!(o.tolerable_lag(), lag);
}

#[test]
fn invalid_lag_is_rejected() {
    let log = EventLog::new();
    let reg = registry(&log);
    let mut o = orch();
    for bad in [f64::NAN, -1.0, f64::INFINITY] {
        let session = SessionConfig {
            tolerable_lag_secs: bad,
            components: Vec::new(),
        };
        assert!(matches!(
            o.append_configuration(&session, &reg),
            Err(ConfigError::InvalidTolerableLag { .. })
        ));
    }
}

#[test]
fn corrupt_blob_is_a_load_fault() {
    let log = EventLog::new();
    let reg = registry(&log);
    let session = SessionConfig {
        tolerable_lag_secs: 0.01,
        components: vec![ComponentConfig::with_data(
            ConfigurableComponent::KIND,
            json!({ "label": 12 }),
        )],
    };

    let mut o = orch();
    let ids = o.append_configuration(&session, &reg).unwrap();
    let faults = o.attach().unwrap();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].entry, ids[0]);
    assert!(o.is_attached());
}

#[test]
fn load_configuration_attaches_while_attached() {
    let log = EventLog::new();
    let reg = registry(&log);
    let mut o = orch();
    o.attach().unwrap();

    let session = SessionConfig {
        tolerable_lag_secs: 0.01,
        components: vec![ComponentConfig::new("net")],
    };
    let ids = o.load_configuration(&session, &reg).unwrap();
    assert_eq!(o.ordered_entries(), ids.as_slice());
    assert_eq!(o.pending_changes(), 0);
    assert_eq!(log.count("net:attach"), 1);
}

#[test]
fn load_configuration_surfaces_graph_errors() {
    let log = EventLog::new();
    let reg = registry(&log);
    let session = SessionConfig {
        tolerable_lag_secs: 0.01,
        components: vec![ComponentConfig::new("net"), ComponentConfig::new("net")],
    };

    let mut o = orch();
    match o.load_configuration(&session, &reg) {
        Err(ConfigError::Graph(GraphError::DuplicateCapability { capability, .. })) => {
            assert_eq!(capability, cap("net"));
        }
        other => panic!("expected a DuplicateCapability graph error, got {other:?}"),
    }
    assert_eq!(o.entries_of_kind("net").len(), 1);
}
