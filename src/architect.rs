//! Composition root: one registry + one feedback loop per architect.
//!
//! Multiple architects may coexist in a process; they share nothing.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    engine::{AdaptationPolicy, CycleReport, FeedbackLoop, LoopError, LoopErrorKind},
    module::{Module, ModuleConfig},
    periphery::ports::{EffectorPort, SensorPort},
    registry::{ModuleRegistry, RegistryError},
    telemetry::TelemetrySink,
};

/// How `orchestrate` schedules cycles. The loop itself never self-schedules;
/// this is the external scheduling collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrateMode {
    SingleCycle,
    Continuous { interval: Duration },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestrationSummary {
    pub cycles_run: u64,
}

pub struct Architect {
    registry: Arc<ModuleRegistry>,
    feedback_loop: Arc<FeedbackLoop>,
}

impl Architect {
    /// Wire a registry and a feedback loop and bind them. The loop is ready
    /// for cycles as soon as this returns.
    pub fn new(
        config: &Config,
        policy: Arc<dyn AdaptationPolicy>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self> {
        let registry = Arc::new(ModuleRegistry::new(
            config.registry.feedback_window,
            Arc::clone(&telemetry),
        ));
        let feedback_loop = Arc::new(FeedbackLoop::new(
            config.r#loop.timeouts(),
            policy,
            telemetry,
        ));
        feedback_loop
            .initialize(Arc::clone(&registry))
            .context("failed to bind feedback loop to registry")?;

        Ok(Self {
            registry,
            feedback_loop,
        })
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn feedback_loop(&self) -> &Arc<FeedbackLoop> {
        &self.feedback_loop
    }

    /// Register and initialize a module. On initialization failure the
    /// registration is rolled back, so the registry never holds a
    /// half-activated entry.
    pub async fn register_module(
        &self,
        id: &str,
        module: Box<dyn Module>,
        config: &ModuleConfig,
    ) -> Result<()> {
        let handle = self
            .registry
            .register(id, module)
            .with_context(|| format!("failed to register module '{id}'"))?;

        if let Err(err) = handle.initialize(config).await {
            if let Err(rollback_err) = self.registry.deregister(id).await {
                tracing::warn!(
                    target: "amee::architect",
                    module_id = %id,
                    reason = %rollback_err,
                    "rollback deregistration failed after rejected initialization"
                );
            }
            return Err(err).with_context(|| format!("failed to initialize module '{id}'"));
        }
        Ok(())
    }

    pub async fn deregister_module(&self, id: &str) -> Result<(), RegistryError> {
        self.registry.deregister(id).await
    }

    pub fn add_sensor(&self, sensor: Arc<dyn SensorPort>) -> Result<(), LoopError> {
        self.feedback_loop.add_sensor(sensor)
    }

    pub fn add_effector(&self, effector: Arc<dyn EffectorPort>) -> Result<(), LoopError> {
        self.feedback_loop.add_effector(effector)
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, LoopError> {
        self.feedback_loop.run_cycle().await
    }

    /// Drive the loop per `mode` until done or cancelled.
    ///
    /// Continuous mode ticks at the configured interval, skipping missed
    /// ticks; a `Stopped` loop ends orchestration normally rather than as an
    /// error.
    pub async fn orchestrate(
        &self,
        mode: OrchestrateMode,
        shutdown: CancellationToken,
    ) -> Result<OrchestrationSummary, LoopError> {
        let mut summary = OrchestrationSummary::default();

        match mode {
            OrchestrateMode::SingleCycle => {
                self.feedback_loop.run_cycle().await?;
                summary.cycles_run = 1;
            }
            OrchestrateMode::Continuous { interval } => {
                let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = ticker.tick() => {
                            match self.feedback_loop.run_cycle().await {
                                Ok(_) => summary.cycles_run = summary.cycles_run.saturating_add(1),
                                Err(err) if err.kind == LoopErrorKind::Stopped => break,
                                Err(err) => return Err(err),
                            }
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Stop the loop and terminate every registered module, regardless of
    /// cycle state. Modules are drained before sensors/effectors are released
    /// with the loop itself.
    pub async fn shutdown(&self) {
        self.feedback_loop.stop();
        self.registry.drain().await;
    }
}
