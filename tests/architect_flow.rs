use std::{sync::Arc, time::Duration};

use serde_json::json;

use amee::{
    Architect, Config, OrchestrateMode,
    engine::{BroadcastPolicy, LoopErrorKind},
    module::testing::{ProbeModule, RejectingInitModule, probe_config},
    telemetry::NoopTelemetrySink,
};
use tokio_util::sync::CancellationToken;

fn architect() -> Architect {
    Architect::new(
        &Config::default(),
        Arc::new(BroadcastPolicy),
        Arc::new(NoopTelemetrySink),
    )
    .expect("architect should wire up")
}

#[tokio::test]
async fn full_cycle_reaches_every_registered_module() {
    let architect = architect();
    let probe_a = ProbeModule::new();
    let probe_b = ProbeModule::new();

    architect
        .register_module("A", Box::new(probe_a.clone()), &probe_config())
        .await
        .expect("A should register");
    architect
        .register_module("B", Box::new(probe_b.clone()), &probe_config())
        .await
        .expect("B should register");
    architect
        .add_sensor(Arc::new(amee::periphery::testing::FixedSensor::new(
            "answer",
            json!(42),
        )))
        .expect("sensor should be accepted");

    let summary = architect
        .orchestrate(OrchestrateMode::SingleCycle, CancellationToken::new())
        .await
        .expect("orchestration should succeed");
    assert_eq!(summary.cycles_run, 1);

    for probe in [&probe_a, &probe_b] {
        assert_eq!(probe.initialize_calls(), 1);
        assert_eq!(probe.adapt_calls(), 1);
        assert_eq!(
            probe.received_feedback()[0].reading("answer"),
            Some(&json!(42))
        );
    }
}

#[tokio::test]
async fn failed_initialization_rolls_back_registration() {
    let architect = architect();

    let err = architect
        .register_module("flaky", Box::new(RejectingInitModule), &probe_config())
        .await
        .expect_err("rejected configuration should fail registration");
    assert!(err.to_string().contains("flaky"));

    assert!(!architect.registry().contains("flaky"));

    // The id is free for a working module.
    architect
        .register_module("flaky", Box::new(ProbeModule::new()), &probe_config())
        .await
        .expect("id should be reusable after rollback");
}

#[tokio::test]
async fn continuous_orchestration_runs_until_cancelled() {
    let architect = architect();
    architect
        .register_module("echo", Box::new(ProbeModule::new()), &probe_config())
        .await
        .expect("module should register");

    let shutdown = CancellationToken::new();
    let canceller = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        canceller.cancel();
    });

    let summary = architect
        .orchestrate(
            OrchestrateMode::Continuous {
                interval: Duration::from_millis(10),
            },
            shutdown,
        )
        .await
        .expect("orchestration should end cleanly");
    assert!(summary.cycles_run >= 1);
}

#[tokio::test]
async fn shutdown_terminates_modules_and_stops_the_loop() {
    let architect = architect();
    let probe = ProbeModule::new();
    architect
        .register_module("worker", Box::new(probe.clone()), &probe_config())
        .await
        .expect("module should register");

    architect.shutdown().await;

    assert_eq!(probe.terminate_calls(), 1);
    assert!(architect.registry().is_empty());

    let err = architect
        .run_cycle()
        .await
        .expect_err("loop should be stopped after shutdown");
    assert_eq!(err.kind, LoopErrorKind::Stopped);
}
