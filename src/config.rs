use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::LoopTimeouts;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub r#loop: CoreLoopConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub periphery: PeripheryConfig,
}

fn default_cycle_interval_ms() -> u64 {
    1_000
}

fn default_port_timeout_ms() -> u64 {
    2_000
}

fn default_feedback_window() -> usize {
    64
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/amee")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreLoopConfig {
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    #[serde(default = "default_port_timeout_ms")]
    pub sensor_timeout_ms: u64,
    #[serde(default = "default_port_timeout_ms")]
    pub adapt_timeout_ms: u64,
    #[serde(default = "default_port_timeout_ms")]
    pub effector_timeout_ms: u64,
}

impl Default for CoreLoopConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            sensor_timeout_ms: default_port_timeout_ms(),
            adapt_timeout_ms: default_port_timeout_ms(),
            effector_timeout_ms: default_port_timeout_ms(),
        }
    }
}

impl CoreLoopConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms.max(1))
    }

    pub fn timeouts(&self) -> LoopTimeouts {
        LoopTimeouts {
            sensor: Duration::from_millis(self.sensor_timeout_ms.max(1)),
            adapt: Duration::from_millis(self.adapt_timeout_ms.max(1)),
            effector: Duration::from_millis(self.effector_timeout_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Retained feedback records per module; oldest evicted first.
    #[serde(default = "default_feedback_window")]
    pub feedback_window: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            feedback_window: default_feedback_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeripheryConfig {
    #[serde(default = "default_enabled_true")]
    pub std_system_stats: bool,
    #[serde(default = "default_enabled_true")]
    pub std_clock: bool,
    #[serde(default = "default_enabled_true")]
    pub std_stderr_effector: bool,
}

impl Default for PeripheryConfig {
    fn default() -> Self {
        Self {
            std_system_stats: true,
            std_clock: true,
            std_stderr_effector: true,
        }
    }
}

impl Config {
    /// Load a JSON5 config file. When the document names a `$schema`, the
    /// instance is validated against it before deserialization; without one
    /// only serde's structural checks apply.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        if let Some(schema_path) = declared_schema_path(config_base, &config_value) {
            validate_against_schema(&config_value, &schema_path)?;
        }

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize core config")?;

        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }
}

fn declared_schema_path(config_base: &Path, config_value: &Value) -> Option<PathBuf> {
    let path_text = config_value.get("$schema").and_then(Value::as_str)?;
    let configured = PathBuf::from(path_text);
    if configured.is_absolute() {
        Some(configured)
    } else {
        Some(config_base.join(configured))
    }
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read config schema {}", schema_path.display()))?;
    let schema_value: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse config schema {}", schema_path.display()))?;

    let compiled = JSONSchema::compile(&schema_value)
        .map_err(|err| anyhow!("invalid config schema {}: {err}", schema_path.display()))?;

    if let Err(errors) = compiled.validate(config_value) {
        let details: Vec<String> = errors
            .map(|err| format!("{}: {err}", err.instance_path))
            .collect();
        return Err(anyhow!(
            "config failed schema validation: {}",
            details.join("; ")
        ));
    }
    Ok(())
}
