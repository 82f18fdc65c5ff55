pub mod contract;
pub mod error;
pub mod handle;
pub mod passthrough;
pub mod testing;

pub use contract::{LifecyclePhase, Module, ModuleConfig};
pub use error::{ModuleError, ModuleErrorKind};
pub use handle::ModuleHandle;
pub use passthrough::PassthroughModule;
