//! Sensor and effector capability contracts.
//!
//! Sensors are read-only environment probes; effectors are write-only
//! actuation points. Both may block on I/O, so the loop wraps every call in a
//! per-port timeout and isolates failures. Any internal state is the port's
//! own concern; the loop treats them as stateless.

use async_trait::async_trait;
use serde_json::Value;

use crate::periphery::error::PeripheryError;

#[async_trait]
pub trait SensorPort: Send + Sync {
    /// Stable name keying this sensor's readings in the feedback snapshot.
    fn name(&self) -> &str;

    async fn sense(&self) -> Result<Value, PeripheryError>;
}

#[async_trait]
pub trait EffectorPort: Send + Sync {
    /// Stable name used for command targeting and failure reporting.
    fn name(&self) -> &str;

    async fn act(&self, command: Value) -> Result<(), PeripheryError>;
}
