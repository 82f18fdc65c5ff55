use std::sync::Arc;

use amee::{
    module::testing::{ProbeModule, probe_config},
    registry::{ModuleRegistry, RegistryErrorKind},
    telemetry::{CoreEvent, NoopTelemetrySink, RecordingTelemetrySink},
};

fn registry() -> ModuleRegistry {
    ModuleRegistry::new(16, Arc::new(NoopTelemetrySink))
}

#[tokio::test]
async fn snapshot_contains_exactly_the_still_registered_ids() {
    let registry = registry();

    for id in ["a", "b", "c", "d"] {
        registry
            .register(id, Box::new(ProbeModule::new()))
            .expect("registration should succeed");
    }
    registry.deregister("b").await.expect("b should deregister");
    registry.deregister("d").await.expect("d should deregister");
    registry
        .register("e", Box::new(ProbeModule::new()))
        .expect("registration should succeed");

    let ids: Vec<_> = registry
        .snapshot()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids, vec!["a", "c", "e"]);
}

#[tokio::test]
async fn duplicate_registration_fails_and_original_is_untouched() {
    let registry = registry();
    let probe = ProbeModule::new();
    registry
        .register("worker", Box::new(probe.clone()))
        .expect("registration should succeed");

    let err = registry
        .register("worker", Box::new(ProbeModule::new()))
        .expect_err("duplicate id should be rejected");
    assert_eq!(err.kind, RegistryErrorKind::DuplicateId);

    // The original module is still resolvable and fully operational.
    let handle = registry.get("worker").expect("original should remain");
    handle
        .initialize(&probe_config())
        .await
        .expect("original module should initialize");
    assert_eq!(probe.initialize_calls(), 1);
}

#[tokio::test]
async fn deregistering_unknown_id_fails_not_found_without_side_effects() {
    let registry = registry();
    registry
        .register("present", Box::new(ProbeModule::new()))
        .expect("registration should succeed");
    let version = registry.version();

    let err = registry
        .deregister("absent")
        .await
        .expect_err("unknown id should fail");
    assert_eq!(err.kind, RegistryErrorKind::NotFound);
    assert_eq!(registry.version(), version);
    assert!(registry.contains("present"));
}

#[tokio::test]
async fn deregister_terminates_module_exactly_once_and_frees_the_id() {
    let registry = registry();
    let probe = ProbeModule::new();
    let handle = registry
        .register("x", Box::new(probe.clone()))
        .expect("registration should succeed");
    handle
        .initialize(&probe_config())
        .await
        .expect("initialization should succeed");

    registry.deregister("x").await.expect("x should deregister");

    let err = registry.get("x").expect_err("x should be gone");
    assert_eq!(err.kind, RegistryErrorKind::NotFound);
    assert_eq!(probe.terminate_calls(), 1);

    // Identifier is immediately reusable.
    registry
        .register("x", Box::new(ProbeModule::new()))
        .expect("id should be reusable");
}

#[tokio::test]
async fn registry_emits_registration_events() {
    let telemetry = Arc::new(RecordingTelemetrySink::new());
    let registry = ModuleRegistry::new(16, telemetry.clone());

    registry
        .register("observed", Box::new(ProbeModule::new()))
        .expect("registration should succeed");
    registry
        .deregister("observed")
        .await
        .expect("deregistration should succeed");

    let events = telemetry.events();
    assert!(events.contains(&CoreEvent::ModuleRegistered {
        module_id: "observed".to_string()
    }));
    assert!(events.contains(&CoreEvent::ModuleDeregistered {
        module_id: "observed".to_string()
    }));
}

#[tokio::test]
async fn drain_terminates_every_module() {
    let registry = registry();
    let probes: Vec<ProbeModule> = (0..3).map(|_| ProbeModule::new()).collect();
    for (index, probe) in probes.iter().enumerate() {
        let handle = registry
            .register(&format!("m{index}"), Box::new(probe.clone()))
            .expect("registration should succeed");
        handle
            .initialize(&probe_config())
            .await
            .expect("initialization should succeed");
    }

    registry.drain().await;

    assert!(registry.is_empty());
    for probe in &probes {
        assert_eq!(probe.terminate_calls(), 1);
    }
}
