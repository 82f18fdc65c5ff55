use async_trait::async_trait;
use serde_json::Value;

use crate::{
    engine::FeedbackRecord,
    module::{
        contract::{Module, ModuleConfig},
        error::{ModuleError, invalid_input},
    },
};

/// Minimal concrete module: echoes its input and tracks the last feedback
/// cycle it saw. Used by the binary to exercise a full live loop and by tests
/// needing a real module without bespoke behavior.
#[derive(Default)]
pub struct PassthroughModule {
    label: Option<String>,
    last_feedback_cycle: Option<u64>,
}

impl PassthroughModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_feedback_cycle(&self) -> Option<u64> {
        self.last_feedback_cycle
    }
}

#[async_trait]
impl Module for PassthroughModule {
    fn required_config_keys(&self) -> &'static [&'static str] {
        &["label"]
    }

    async fn initialize(&mut self, config: &ModuleConfig) -> Result<(), ModuleError> {
        self.label = config
            .get("label")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(())
    }

    async fn process(&mut self, input: Value) -> Result<Value, ModuleError> {
        if input.is_null() {
            return Err(invalid_input("passthrough input cannot be null"));
        }
        Ok(input)
    }

    async fn adapt(&mut self, feedback: &FeedbackRecord) -> Result<(), ModuleError> {
        self.last_feedback_cycle = Some(feedback.cycle_id);
        Ok(())
    }

    async fn terminate(&mut self) -> Result<(), ModuleError> {
        self.label = None;
        Ok(())
    }
}
