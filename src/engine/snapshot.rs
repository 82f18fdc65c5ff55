use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::ModuleErrorKind;

/// Aggregated sensor readings for one cycle, keyed by sensor name.
///
/// Assembled fresh by `monitor()` each cycle and discarded afterwards; the
/// only retention across cycles is each module's own feedback window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    pub cycle_id: u64,
    pub readings: BTreeMap<String, Value>,
}

impl FeedbackSnapshot {
    pub fn new(cycle_id: u64) -> Self {
        Self {
            cycle_id,
            readings: BTreeMap::new(),
        }
    }

    pub fn insert_reading(&mut self, sensor: impl Into<String>, value: Value) {
        self.readings.insert(sensor.into(), value);
    }

    pub fn reading(&self, sensor: &str) -> Option<&Value> {
        self.readings.get(sensor)
    }
}

/// Per-module projection of a cycle's snapshot, delivered via `adapt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub cycle_id: u64,
    pub readings: BTreeMap<String, Value>,
}

impl FeedbackRecord {
    pub fn empty(cycle_id: u64) -> Self {
        Self {
            cycle_id,
            readings: BTreeMap::new(),
        }
    }

    pub fn reading(&self, sensor: &str) -> Option<&Value> {
        self.readings.get(sensor)
    }
}

/// Addressing for a policy-derived effector command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandTarget {
    All,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectorCommand {
    pub target: CommandTarget,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFailure {
    pub sensor: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptFailure {
    pub module_id: String,
    /// Taxonomy of the failure; `Timeout` when the module exceeded the
    /// per-module adapt bound.
    pub kind: ModuleErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectorFailure {
    pub effector: String,
    pub reason: String,
}

/// Outcome of one `run_cycle` pass. Isolated per-sensor and per-module
/// failures degrade the report instead of aborting the cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: u64,
    pub readings_collected: usize,
    pub sensor_failures: Vec<SensorFailure>,
    pub adapted: Vec<String>,
    pub adaptation_failures: Vec<AdaptFailure>,
    pub commands_dispatched: usize,
    pub effector_failures: Vec<EffectorFailure>,
}
