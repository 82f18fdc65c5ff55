pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryErrorKind};
pub use registry::ModuleRegistry;
