use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    InvalidId,
    DuplicateId,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    pub message: String,
}

impl RegistryError {
    pub fn new(kind: RegistryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegistryError {}

pub fn invalid_id(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::InvalidId, message)
}

pub fn duplicate_id(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::DuplicateId, message)
}

pub fn not_found(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::NotFound, message)
}
