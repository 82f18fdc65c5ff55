//! Observability port.
//!
//! Every log-worthy occurrence in the core is emitted as a [`CoreEvent`] to an
//! injected [`TelemetrySink`]; the core has no hidden global logger state and
//! tests substitute a recording sink. Storage and wire format are the sink's
//! concern.

use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    ModuleRegistered {
        module_id: String,
    },
    ModuleDeregistered {
        module_id: String,
    },
    ModuleTerminationFailed {
        module_id: String,
        reason: String,
    },
    CycleStarted {
        cycle_id: u64,
    },
    CycleCompleted {
        cycle_id: u64,
        readings: usize,
        adapted: usize,
        failures: usize,
    },
    SensorFailed {
        sensor: String,
        reason: String,
    },
    AdaptationFailed {
        cycle_id: u64,
        module_id: String,
        reason: String,
    },
    EffectorFailed {
        effector: String,
        reason: String,
    },
    LoopStopped,
}

pub trait TelemetrySink: Send + Sync {
    fn on_event(&self, event: CoreEvent);
}

#[derive(Default)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn on_event(&self, _event: CoreEvent) {}
}

/// Sink forwarding every event as a structured `tracing` event.
#[derive(Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn on_event(&self, event: CoreEvent) {
        match event {
            CoreEvent::ModuleRegistered { module_id } => {
                tracing::info!(target: "amee::registry", module_id = %module_id, "module registered");
            }
            CoreEvent::ModuleDeregistered { module_id } => {
                tracing::info!(target: "amee::registry", module_id = %module_id, "module deregistered");
            }
            CoreEvent::ModuleTerminationFailed { module_id, reason } => {
                tracing::warn!(
                    target: "amee::registry",
                    module_id = %module_id,
                    reason = %reason,
                    "module termination failed; entry removed anyway"
                );
            }
            CoreEvent::CycleStarted { cycle_id } => {
                tracing::info!(target: "amee::engine", cycle_id, "cycle started");
            }
            CoreEvent::CycleCompleted {
                cycle_id,
                readings,
                adapted,
                failures,
            } => {
                tracing::info!(
                    target: "amee::engine",
                    cycle_id,
                    readings,
                    adapted,
                    failures,
                    "cycle completed"
                );
            }
            CoreEvent::SensorFailed { sensor, reason } => {
                tracing::warn!(
                    target: "amee::engine",
                    sensor = %sensor,
                    reason = %reason,
                    "sensor excluded from snapshot"
                );
            }
            CoreEvent::AdaptationFailed {
                cycle_id,
                module_id,
                reason,
            } => {
                tracing::warn!(
                    target: "amee::engine",
                    cycle_id,
                    module_id = %module_id,
                    reason = %reason,
                    "module adaptation failed; cycle continues"
                );
            }
            CoreEvent::EffectorFailed { effector, reason } => {
                tracing::warn!(
                    target: "amee::engine",
                    effector = %effector,
                    reason = %reason,
                    "effector dispatch failed"
                );
            }
            CoreEvent::LoopStopped => {
                tracing::info!(target: "amee::engine", "feedback loop stopped");
            }
        }
    }
}

/// Sink retaining every event in order, for test assertions.
#[derive(Default)]
pub struct RecordingTelemetrySink {
    events: Mutex<Vec<CoreEvent>>,
}

impl RecordingTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CoreEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }
}

impl TelemetrySink for RecordingTelemetrySink {
    fn on_event(&self, event: CoreEvent) {
        self.events.lock().expect("lock poisoned").push(event);
    }
}
