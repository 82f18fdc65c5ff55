//! Builtin periphery: std sensors and effectors available without any
//! external collaborator, toggled per config.

use std::{sync::Mutex, time::Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use sysinfo::System;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::periphery::{
    error::{PeripheryError, sense_failed},
    ports::{EffectorPort, SensorPort},
};

/// Host memory/cpu probe backed by `sysinfo`.
pub struct SystemStatsSensor {
    system: Mutex<System>,
}

impl SystemStatsSensor {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }
}

impl Default for SystemStatsSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorPort for SystemStatsSensor {
    fn name(&self) -> &str {
        "std.system_stats"
    }

    async fn sense(&self) -> Result<Value, PeripheryError> {
        let mut system = self.system.lock().expect("lock poisoned");
        system.refresh_memory();
        let load = System::load_average();

        Ok(json!({
            "total_memory": system.total_memory(),
            "used_memory": system.used_memory(),
            "cpu_count": system.cpus().len(),
            "load_average_one": load.one,
        }))
    }
}

/// Wall-clock and uptime probe.
pub struct ClockSensor {
    started_at: Instant,
}

impl ClockSensor {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for ClockSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorPort for ClockSensor {
    fn name(&self) -> &str {
        "std.clock"
    }

    async fn sense(&self) -> Result<Value, PeripheryError> {
        let now = OffsetDateTime::now_utc();
        let rfc3339 = now
            .format(&Rfc3339)
            .map_err(|err| sense_failed(format!("failed to format wall clock: {err}")))?;

        Ok(json!({
            "unix_timestamp": now.unix_timestamp(),
            "rfc3339": rfc3339,
            "uptime_ms": self.started_at.elapsed().as_millis() as u64,
        }))
    }
}

/// Effector that writes each command to stderr, one line per command.
#[derive(Default)]
pub struct StderrEffector;

#[async_trait]
impl EffectorPort for StderrEffector {
    fn name(&self) -> &str {
        "std.stderr"
    }

    async fn act(&self, command: Value) -> Result<(), PeripheryError> {
        eprintln!("[effector:{}] {command}", self.name());
        Ok(())
    }
}
