use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::{
    engine::{
        error::{
            LoopError, already_bound, capability_rejected, cycle_in_progress, not_initialized,
            stopped,
        },
        policy::AdaptationPolicy,
        snapshot::{
            AdaptFailure, CommandTarget, CycleReport, EffectorCommand, EffectorFailure,
            FeedbackSnapshot, SensorFailure,
        },
    },
    module::error::timed_out,
    periphery::ports::{EffectorPort, SensorPort},
    registry::ModuleRegistry,
    telemetry::{CoreEvent, TelemetrySink},
};

/// Per-call bounds for the blocking collaborators of one cycle. A port that
/// exceeds its bound is treated as failed-and-skipped for that cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopTimeouts {
    pub sensor: Duration,
    pub adapt: Duration,
    pub effector: Duration,
}

impl Default for LoopTimeouts {
    fn default() -> Self {
        Self {
            sensor: Duration::from_millis(2_000),
            adapt: Duration::from_millis(2_000),
            effector: Duration::from_millis(2_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Running,
    Stopped,
}

struct LoopState {
    phase: LoopPhase,
    registry: Option<Arc<ModuleRegistry>>,
    sensors: Vec<Arc<dyn SensorPort>>,
    effectors: Vec<Arc<dyn EffectorPort>>,
    cycle_id: u64,
}

/// The control state machine: `Idle -> Running -> (Idle | Stopped)`.
///
/// `run_cycle` is the atomic unit and is non-reentrant: a second caller while
/// a cycle runs gets `CycleInProgress`, never a queued cycle. Periodic
/// execution is the scheduling caller's job ([`crate::Architect::orchestrate`]).
///
/// The phase lock is never held across an await; the cycle works on clones of
/// the sensor/effector sets and a registry snapshot taken at cycle start, so
/// registration traffic during a cycle never mutates a collection
/// mid-iteration.
pub struct FeedbackLoop {
    state: Mutex<LoopState>,
    timeouts: LoopTimeouts,
    policy: Arc<dyn AdaptationPolicy>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl FeedbackLoop {
    pub fn new(
        timeouts: LoopTimeouts,
        policy: Arc<dyn AdaptationPolicy>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            state: Mutex::new(LoopState {
                phase: LoopPhase::Idle,
                registry: None,
                sensors: Vec::new(),
                effectors: Vec::new(),
                cycle_id: 0,
            }),
            timeouts,
            policy,
            telemetry,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.state.lock().expect("lock poisoned").phase
    }

    /// Bind the registry adaptation dispatches against. Required before any
    /// cycle; rebinding is rejected.
    pub fn initialize(&self, registry: Arc<ModuleRegistry>) -> Result<(), LoopError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.registry.is_some() {
            return Err(already_bound("feedback loop is already bound to a registry"));
        }
        state.registry = Some(registry);
        Ok(())
    }

    pub fn add_sensor(&self, sensor: Arc<dyn SensorPort>) -> Result<(), LoopError> {
        let mut state = self.state.lock().expect("lock poisoned");
        Self::require_mutable(&state, "sensor")?;
        if sensor.name().trim().is_empty() {
            return Err(capability_rejected("sensor name cannot be empty"));
        }
        if state
            .sensors
            .iter()
            .any(|existing| existing.name() == sensor.name())
        {
            return Err(capability_rejected(format!(
                "sensor '{}' already added",
                sensor.name()
            )));
        }
        state.sensors.push(sensor);
        Ok(())
    }

    pub fn add_effector(&self, effector: Arc<dyn EffectorPort>) -> Result<(), LoopError> {
        let mut state = self.state.lock().expect("lock poisoned");
        Self::require_mutable(&state, "effector")?;
        if effector.name().trim().is_empty() {
            return Err(capability_rejected("effector name cannot be empty"));
        }
        if state
            .effectors
            .iter()
            .any(|existing| existing.name() == effector.name())
        {
            return Err(capability_rejected(format!(
                "effector '{}' already added",
                effector.name()
            )));
        }
        state.effectors.push(effector);
        Ok(())
    }

    /// Poll every sensor once and return the resulting snapshot. Failing or
    /// timed-out sensors are excluded; their readings are simply absent.
    pub async fn monitor(&self) -> FeedbackSnapshot {
        let (cycle_id, sensors) = {
            let state = self.state.lock().expect("lock poisoned");
            (state.cycle_id, state.sensors.clone())
        };
        let (snapshot, _failures) = self.collect_readings(cycle_id, &sensors).await;
        snapshot
    }

    /// Dispatch a policy projection of `snapshot` to every module currently in
    /// the bound registry. Partial-failure semantics: each module failure is
    /// isolated, logged, and reported; delivery is best-effort, never
    /// all-or-nothing.
    pub async fn adapt(
        &self,
        snapshot: &FeedbackSnapshot,
    ) -> Result<(Vec<String>, Vec<AdaptFailure>), LoopError> {
        let registry = {
            let state = self.state.lock().expect("lock poisoned");
            state
                .registry
                .clone()
                .ok_or_else(|| not_initialized("feedback loop has no bound registry"))?
        };
        Ok(self.dispatch_adaptation(&registry, snapshot).await)
    }

    /// One full monitor -> adapt -> act pass.
    pub async fn run_cycle(&self) -> Result<CycleReport, LoopError> {
        let (cycle_id, sensors, effectors, registry) = {
            let mut state = self.state.lock().expect("lock poisoned");
            match state.phase {
                LoopPhase::Stopped => return Err(stopped("feedback loop is stopped")),
                LoopPhase::Running => {
                    return Err(cycle_in_progress("a cycle is already running"));
                }
                LoopPhase::Idle => {}
            }
            let registry = state
                .registry
                .clone()
                .ok_or_else(|| not_initialized("feedback loop has no bound registry"))?;
            state.phase = LoopPhase::Running;
            state.cycle_id = state.cycle_id.saturating_add(1);
            (
                state.cycle_id,
                state.sensors.clone(),
                state.effectors.clone(),
                registry,
            )
        };

        self.telemetry.on_event(CoreEvent::CycleStarted { cycle_id });

        let (snapshot, sensor_failures) = self.collect_readings(cycle_id, &sensors).await;
        let (adapted, adaptation_failures) = self.dispatch_adaptation(&registry, &snapshot).await;
        let commands = self.policy.derive_commands(&snapshot);
        let (commands_dispatched, effector_failures) =
            self.dispatch_commands(&effectors, commands).await;

        let report = CycleReport {
            cycle_id,
            readings_collected: snapshot.readings.len(),
            sensor_failures,
            adapted,
            adaptation_failures,
            commands_dispatched,
            effector_failures,
        };

        self.telemetry.on_event(CoreEvent::CycleCompleted {
            cycle_id,
            readings: report.readings_collected,
            adapted: report.adapted.len(),
            failures: report.sensor_failures.len()
                + report.adaptation_failures.len()
                + report.effector_failures.len(),
        });

        let mut state = self.state.lock().expect("lock poisoned");
        // stop() may have landed mid-cycle; Stopped stays terminal.
        if state.phase == LoopPhase::Running {
            state.phase = LoopPhase::Idle;
        }
        Ok(report)
    }

    /// Terminal transition. Idempotent; a running cycle completes but no new
    /// cycle can start afterwards.
    pub fn stop(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.phase != LoopPhase::Stopped {
            state.phase = LoopPhase::Stopped;
            self.telemetry.on_event(CoreEvent::LoopStopped);
        }
    }

    fn require_mutable(state: &LoopState, port: &str) -> Result<(), LoopError> {
        match state.phase {
            LoopPhase::Idle => Ok(()),
            LoopPhase::Running => Err(cycle_in_progress(format!(
                "cannot add a {port} while a cycle is running"
            ))),
            LoopPhase::Stopped => Err(stopped(format!(
                "cannot add a {port} to a stopped feedback loop"
            ))),
        }
    }

    async fn collect_readings(
        &self,
        cycle_id: u64,
        sensors: &[Arc<dyn SensorPort>],
    ) -> (FeedbackSnapshot, Vec<SensorFailure>) {
        let mut snapshot = FeedbackSnapshot::new(cycle_id);
        let mut failures = Vec::new();

        let polls = sensors.iter().map(|sensor| {
            let sensor = Arc::clone(sensor);
            let bound = self.timeouts.sensor;
            async move {
                let name = sensor.name().to_string();
                let outcome = tokio::time::timeout(bound, sensor.sense()).await;
                (name, outcome)
            }
        });

        for (name, outcome) in join_all(polls).await {
            match outcome {
                Ok(Ok(value)) => {
                    snapshot.insert_reading(name, value);
                }
                Ok(Err(err)) => {
                    self.telemetry.on_event(CoreEvent::SensorFailed {
                        sensor: name.clone(),
                        reason: err.to_string(),
                    });
                    failures.push(SensorFailure {
                        sensor: name,
                        reason: err.to_string(),
                    });
                }
                Err(_) => {
                    let reason = format!("sense exceeded {:?}", self.timeouts.sensor);
                    self.telemetry.on_event(CoreEvent::SensorFailed {
                        sensor: name.clone(),
                        reason: reason.clone(),
                    });
                    failures.push(SensorFailure {
                        sensor: name,
                        reason,
                    });
                }
            }
        }

        (snapshot, failures)
    }

    async fn dispatch_adaptation(
        &self,
        registry: &ModuleRegistry,
        snapshot: &FeedbackSnapshot,
    ) -> (Vec<String>, Vec<AdaptFailure>) {
        let mut adapted = Vec::new();
        let mut failures = Vec::new();

        for (module_id, handle) in registry.snapshot() {
            let record = self.policy.project(&module_id, snapshot);
            let outcome = tokio::time::timeout(self.timeouts.adapt, handle.adapt(record)).await;
            let failure = match outcome {
                Ok(Ok(())) => {
                    adapted.push(module_id);
                    continue;
                }
                Ok(Err(err)) => err,
                Err(_) => timed_out(format!("adapt exceeded {:?}", self.timeouts.adapt)),
            };

            self.telemetry.on_event(CoreEvent::AdaptationFailed {
                cycle_id: snapshot.cycle_id,
                module_id: module_id.clone(),
                reason: failure.message.clone(),
            });
            failures.push(AdaptFailure {
                module_id,
                kind: failure.kind,
                reason: failure.message,
            });
        }

        (adapted, failures)
    }

    async fn dispatch_commands(
        &self,
        effectors: &[Arc<dyn EffectorPort>],
        commands: Vec<EffectorCommand>,
    ) -> (usize, Vec<EffectorFailure>) {
        let mut dispatched = 0usize;
        let mut failures = Vec::new();

        for command in commands {
            let targets: Vec<&Arc<dyn EffectorPort>> = match &command.target {
                CommandTarget::All => effectors.iter().collect(),
                CommandTarget::Named(name) => {
                    let matched: Vec<_> = effectors
                        .iter()
                        .filter(|effector| effector.name() == name.as_str())
                        .collect();
                    if matched.is_empty() {
                        failures.push(EffectorFailure {
                            effector: name.clone(),
                            reason: "no such effector".to_string(),
                        });
                    }
                    matched
                }
            };

            for effector in targets {
                let outcome =
                    tokio::time::timeout(self.timeouts.effector, effector.act(command.payload.clone()))
                        .await;
                let reason = match outcome {
                    Ok(Ok(())) => {
                        dispatched = dispatched.saturating_add(1);
                        continue;
                    }
                    Ok(Err(err)) => err.to_string(),
                    Err(_) => format!("act exceeded {:?}", self.timeouts.effector),
                };

                self.telemetry.on_event(CoreEvent::EffectorFailed {
                    effector: effector.name().to_string(),
                    reason: reason.clone(),
                });
                failures.push(EffectorFailure {
                    effector: effector.name().to_string(),
                    reason,
                });
            }
        }

        (dispatched, failures)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::{
        engine::{
            error::LoopErrorKind,
            policy::BroadcastPolicy,
        },
        periphery::testing::FixedSensor,
        registry::ModuleRegistry,
        telemetry::NoopTelemetrySink,
    };

    use super::{FeedbackLoop, LoopPhase, LoopTimeouts};

    fn unbound_loop() -> FeedbackLoop {
        FeedbackLoop::new(
            LoopTimeouts::default(),
            Arc::new(BroadcastPolicy),
            Arc::new(NoopTelemetrySink),
        )
    }

    fn registry() -> Arc<ModuleRegistry> {
        Arc::new(ModuleRegistry::new(8, Arc::new(NoopTelemetrySink)))
    }

    #[test]
    fn initialize_twice_fails_already_bound() {
        let feedback_loop = unbound_loop();
        feedback_loop
            .initialize(registry())
            .expect("first bind should succeed");

        let err = feedback_loop
            .initialize(registry())
            .expect_err("second bind should fail");
        assert_eq!(err.kind, LoopErrorKind::AlreadyBound);
    }

    #[tokio::test]
    async fn run_cycle_without_registry_fails_not_initialized() {
        let feedback_loop = unbound_loop();
        let err = feedback_loop
            .run_cycle()
            .await
            .expect_err("unbound loop should reject cycles");
        assert_eq!(err.kind, LoopErrorKind::NotInitialized);
    }

    #[test]
    fn duplicate_sensor_name_fails_capability_check() {
        let feedback_loop = unbound_loop();
        feedback_loop
            .add_sensor(Arc::new(FixedSensor::new("temp", json!(1))))
            .expect("first sensor should be accepted");

        let err = feedback_loop
            .add_sensor(Arc::new(FixedSensor::new("temp", json!(2))))
            .expect_err("duplicate sensor name should fail");
        assert_eq!(err.kind, LoopErrorKind::Capability);
    }

    #[test]
    fn stop_is_terminal_and_idempotent() {
        let feedback_loop = unbound_loop();
        feedback_loop.stop();
        feedback_loop.stop();
        assert_eq!(feedback_loop.phase(), LoopPhase::Stopped);

        let err = feedback_loop
            .add_sensor(Arc::new(FixedSensor::new("late", json!(0))))
            .expect_err("stopped loop should reject new sensors");
        assert_eq!(err.kind, LoopErrorKind::Stopped);
    }
}
