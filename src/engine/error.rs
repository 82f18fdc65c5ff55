use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopErrorKind {
    AlreadyBound,
    NotInitialized,
    CycleInProgress,
    Stopped,
    Capability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopError {
    pub kind: LoopErrorKind,
    pub message: String,
}

impl LoopError {
    pub fn new(kind: LoopErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LoopError {}

pub fn already_bound(message: impl Into<String>) -> LoopError {
    LoopError::new(LoopErrorKind::AlreadyBound, message)
}

pub fn not_initialized(message: impl Into<String>) -> LoopError {
    LoopError::new(LoopErrorKind::NotInitialized, message)
}

pub fn cycle_in_progress(message: impl Into<String>) -> LoopError {
    LoopError::new(LoopErrorKind::CycleInProgress, message)
}

pub fn stopped(message: impl Into<String>) -> LoopError {
    LoopError::new(LoopErrorKind::Stopped, message)
}

pub fn capability_rejected(message: impl Into<String>) -> LoopError {
    LoopError::new(LoopErrorKind::Capability, message)
}
