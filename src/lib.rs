//! Adaptive modular orchestration core.
//!
//! An [`Architect`] owns one [`registry::ModuleRegistry`] and one
//! [`engine::FeedbackLoop`]; each cycle polls sensors into a feedback
//! snapshot, dispatches policy-projected feedback to every registered
//! module's `adapt`, and drives effectors with policy-derived commands.
//! Per-sensor and per-module failures are isolated and logged; a cycle
//! degrades, it never aborts.

pub mod architect;
pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod module;
pub mod periphery;
pub mod registry;
pub mod telemetry;

pub use architect::{Architect, OrchestrateMode, OrchestrationSummary};
pub use config::Config;
