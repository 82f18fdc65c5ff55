use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use amee::{
    Architect, Config, OrchestrateMode,
    cli::parse_args,
    engine::RelaySnapshotPolicy,
    logging::init_tracing,
    module::{ModuleConfig, PassthroughModule},
    periphery::{ClockSensor, StderrEffector, SystemStatsSensor},
    telemetry::TracingTelemetrySink,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let mut config = if args.config_path.exists() {
        Config::load(&args.config_path)?
    } else {
        eprintln!(
            "config {} not found; using built-in defaults",
            args.config_path.display()
        );
        Config::default()
    };
    if let Some(log_dir) = args.log_dir {
        config.logging.dir = log_dir;
    }

    let logging_guard = init_tracing(&config.logging)?;
    tracing::info!(
        target: "amee",
        run_id = %logging_guard.run_id(),
        "amee starting"
    );

    let architect = Architect::new(
        &config,
        Arc::new(RelaySnapshotPolicy),
        Arc::new(TracingTelemetrySink),
    )?;

    if config.periphery.std_system_stats {
        architect.add_sensor(Arc::new(SystemStatsSensor::new()))?;
    }
    if config.periphery.std_clock {
        architect.add_sensor(Arc::new(ClockSensor::new()))?;
    }
    if config.periphery.std_stderr_effector {
        architect.add_effector(Arc::new(StderrEffector))?;
    }

    let mut echo_config = ModuleConfig::new();
    echo_config.insert("label".to_string(), Value::String("echo".to_string()));
    architect
        .register_module("echo", Box::new(PassthroughModule::new()), &echo_config)
        .await?;

    let mut sigint = signal(SignalKind::interrupt()).context("unable to listen for SIGINT")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!(target: "amee", "received SIGINT"),
            _ = sigterm.recv() => tracing::info!(target: "amee", "received SIGTERM"),
        }
        signal_shutdown.cancel();
    });

    let mode = if args.single_cycle {
        OrchestrateMode::SingleCycle
    } else {
        OrchestrateMode::Continuous {
            interval: config.r#loop.interval(),
        }
    };
    let summary = architect.orchestrate(mode, shutdown).await?;

    architect.shutdown().await;
    tracing::info!(target: "amee", cycles = summary.cycles_run, "amee stopped");
    Ok(())
}
