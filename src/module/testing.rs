//! Shared module doubles for unit and integration tests.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    engine::FeedbackRecord,
    module::{
        contract::{Module, ModuleConfig},
        error::{ModuleError, adaptation_failed, configuration_invalid, invalid_input},
    },
};

/// Config accepted by [`ProbeModule`].
pub fn probe_config() -> ModuleConfig {
    let mut config = ModuleConfig::new();
    config.insert("role".to_string(), Value::String("probe".to_string()));
    config
}

#[derive(Default)]
struct ProbeCalls {
    initialize: AtomicUsize,
    process: AtomicUsize,
    adapt: AtomicUsize,
    terminate: AtomicUsize,
    feedback: Mutex<Vec<FeedbackRecord>>,
}

/// Recording module: counts every lifecycle call and keeps the feedback it
/// received. Clones share the same counters, so a test can keep a probe after
/// boxing a clone into the registry.
#[derive(Clone, Default)]
pub struct ProbeModule {
    calls: Arc<ProbeCalls>,
}

impl ProbeModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize_calls(&self) -> usize {
        self.calls.initialize.load(Ordering::SeqCst)
    }

    pub fn process_calls(&self) -> usize {
        self.calls.process.load(Ordering::SeqCst)
    }

    pub fn adapt_calls(&self) -> usize {
        self.calls.adapt.load(Ordering::SeqCst)
    }

    pub fn terminate_calls(&self) -> usize {
        self.calls.terminate.load(Ordering::SeqCst)
    }

    /// Feedback records received so far, oldest first.
    pub fn received_feedback(&self) -> Vec<FeedbackRecord> {
        self.calls.feedback.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Module for ProbeModule {
    fn required_config_keys(&self) -> &'static [&'static str] {
        &["role"]
    }

    async fn initialize(&mut self, _config: &ModuleConfig) -> Result<(), ModuleError> {
        self.calls.initialize.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn process(&mut self, input: Value) -> Result<Value, ModuleError> {
        self.calls.process.fetch_add(1, Ordering::SeqCst);
        if input.is_null() {
            return Err(invalid_input("probe module cannot process null input"));
        }
        Ok(input)
    }

    async fn adapt(&mut self, feedback: &FeedbackRecord) -> Result<(), ModuleError> {
        self.calls.adapt.fetch_add(1, Ordering::SeqCst);
        self.calls
            .feedback
            .lock()
            .expect("lock poisoned")
            .push(feedback.clone());
        Ok(())
    }

    async fn terminate(&mut self) -> Result<(), ModuleError> {
        self.calls.terminate.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Module whose `adapt` always reports an adaptation failure.
#[derive(Default)]
pub struct FailingAdaptModule;

#[async_trait]
impl Module for FailingAdaptModule {
    async fn initialize(&mut self, _config: &ModuleConfig) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn process(&mut self, input: Value) -> Result<Value, ModuleError> {
        Ok(input)
    }

    async fn adapt(&mut self, _feedback: &FeedbackRecord) -> Result<(), ModuleError> {
        Err(adaptation_failed("feedback shape not understood"))
    }

    async fn terminate(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Module whose `adapt` sleeps past any reasonable per-module timeout.
pub struct HangingAdaptModule {
    pub delay: Duration,
}

#[async_trait]
impl Module for HangingAdaptModule {
    async fn initialize(&mut self, _config: &ModuleConfig) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn process(&mut self, input: Value) -> Result<Value, ModuleError> {
        Ok(input)
    }

    async fn adapt(&mut self, _feedback: &FeedbackRecord) -> Result<(), ModuleError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn terminate(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Module that refuses every configuration, for initialize-rollback tests.
#[derive(Default)]
pub struct RejectingInitModule;

#[async_trait]
impl Module for RejectingInitModule {
    async fn initialize(&mut self, _config: &ModuleConfig) -> Result<(), ModuleError> {
        Err(configuration_invalid("configuration rejected"))
    }

    async fn process(&mut self, input: Value) -> Result<Value, ModuleError> {
        Ok(input)
    }

    async fn adapt(&mut self, _feedback: &FeedbackRecord) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn terminate(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}
