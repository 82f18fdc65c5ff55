//! Sensor/effector doubles shared by unit and integration tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::periphery::{
    error::{PeripheryError, act_failed, sense_failed},
    ports::{EffectorPort, SensorPort},
};

/// Sensor returning the same value on every cycle.
pub struct FixedSensor {
    name: String,
    value: Value,
}

impl FixedSensor {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[async_trait]
impl SensorPort for FixedSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sense(&self) -> Result<Value, PeripheryError> {
        Ok(self.value.clone())
    }
}

/// Sensor that fails every reading.
pub struct FailingSensor {
    name: String,
}

impl FailingSensor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl SensorPort for FailingSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sense(&self) -> Result<Value, PeripheryError> {
        Err(sense_failed(format!("sensor '{}' backend down", self.name)))
    }
}

/// Sensor that sleeps past the loop's per-sensor timeout before answering.
pub struct BlockingSensor {
    name: String,
    delay: Duration,
    value: Value,
}

impl BlockingSensor {
    pub fn new(name: impl Into<String>, delay: Duration, value: Value) -> Self {
        Self {
            name: name.into(),
            delay,
            value,
        }
    }
}

#[async_trait]
impl SensorPort for BlockingSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sense(&self) -> Result<Value, PeripheryError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.value.clone())
    }
}

/// Effector recording every command it receives. Clones share storage.
#[derive(Clone)]
pub struct RecordingEffector {
    name: String,
    commands: Arc<Mutex<Vec<Value>>>,
}

impl RecordingEffector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn commands(&self) -> Vec<Value> {
        self.commands.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl EffectorPort for RecordingEffector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn act(&self, command: Value) -> Result<(), PeripheryError> {
        self.commands.lock().expect("lock poisoned").push(command);
        Ok(())
    }
}

/// Effector that rejects every command.
pub struct FailingEffector {
    name: String,
}

impl FailingEffector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EffectorPort for FailingEffector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn act(&self, _command: Value) -> Result<(), PeripheryError> {
        Err(act_failed(format!(
            "effector '{}' rejected command",
            self.name
        )))
    }
}
