use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheryErrorKind {
    SenseFailed,
    ActFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheryError {
    pub kind: PeripheryErrorKind,
    pub message: String,
}

impl PeripheryError {
    pub fn new(kind: PeripheryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PeripheryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PeripheryError {}

pub fn sense_failed(message: impl Into<String>) -> PeripheryError {
    PeripheryError::new(PeripheryErrorKind::SenseFailed, message)
}

pub fn act_failed(message: impl Into<String>) -> PeripheryError {
    PeripheryError::new(PeripheryErrorKind::ActFailed, message)
}
