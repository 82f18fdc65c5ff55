use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleErrorKind {
    Configuration,
    InvalidInput,
    NotReady,
    Terminated,
    Adaptation,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleError {
    pub kind: ModuleErrorKind,
    pub message: String,
}

impl ModuleError {
    pub fn new(kind: ModuleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ModuleError {}

pub fn configuration_invalid(message: impl Into<String>) -> ModuleError {
    ModuleError::new(ModuleErrorKind::Configuration, message)
}

pub fn invalid_input(message: impl Into<String>) -> ModuleError {
    ModuleError::new(ModuleErrorKind::InvalidInput, message)
}

pub fn not_ready(message: impl Into<String>) -> ModuleError {
    ModuleError::new(ModuleErrorKind::NotReady, message)
}

pub fn terminated(message: impl Into<String>) -> ModuleError {
    ModuleError::new(ModuleErrorKind::Terminated, message)
}

pub fn adaptation_failed(message: impl Into<String>) -> ModuleError {
    ModuleError::new(ModuleErrorKind::Adaptation, message)
}

pub fn timed_out(message: impl Into<String>) -> ModuleError {
    ModuleError::new(ModuleErrorKind::Timeout, message)
}
