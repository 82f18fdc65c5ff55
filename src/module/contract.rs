//! Module capability contract.
//!
//! A module is a self-contained unit of work with the lifecycle
//! `initialize -> process* -> adapt* -> terminate`. Implementations only
//! provide the raw behavior; phase enforcement (Ready-only dispatch,
//! terminate-once) lives in [`crate::module::ModuleHandle`], so a module body
//! never has to re-check its own lifecycle.

use async_trait::async_trait;
use serde_json::Value;

use crate::{engine::FeedbackRecord, module::error::ModuleError};

/// Opaque configuration payload supplied by the external config layer.
///
/// The core validates only structural conformance: every key named by
/// [`Module::required_config_keys`] must be present before `initialize` runs.
pub type ModuleConfig = serde_json::Map<String, Value>;

/// Capability contract for registry-resident modules.
///
/// Implementations must be `Send + Sync`; the registry wraps each module in a
/// handle with its own async mutex, so `&mut self` here never races.
#[async_trait]
pub trait Module: Send + Sync {
    /// Configuration keys that must be present before `initialize` is called.
    ///
    /// Missing keys are rejected by the handle with a `Configuration` error
    /// without invoking the module.
    fn required_config_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Apply configuration. On error the module must be left inactive: the
    /// handle keeps the phase at Uninitialized and no later call reaches the
    /// module until a successful initialize.
    async fn initialize(&mut self, config: &ModuleConfig) -> Result<(), ModuleError>;

    /// Transform input to output. Pure data transformation; no side effects
    /// are required by the contract.
    async fn process(&mut self, input: Value) -> Result<Value, ModuleError>;

    /// Consume one feedback record, possibly mutating internal parameters.
    ///
    /// An `Adaptation` error is non-fatal to the feedback loop: the loop logs
    /// it and continues with the remaining modules.
    async fn adapt(&mut self, feedback: &FeedbackRecord) -> Result<(), ModuleError>;

    /// Release held resources. Called at most once by the handle; repeat
    /// terminations are absorbed as no-ops before reaching the module.
    async fn terminate(&mut self) -> Result<(), ModuleError>;
}

/// Lifecycle phase tracked per registered module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    Ready,
    Terminated,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Terminated => "terminated",
        }
    }
}
