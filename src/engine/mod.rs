pub mod error;
pub mod feedback_loop;
pub mod policy;
pub mod snapshot;

pub use error::{LoopError, LoopErrorKind};
pub use feedback_loop::{FeedbackLoop, LoopPhase, LoopTimeouts};
pub use policy::{AdaptationPolicy, BroadcastPolicy, RelaySnapshotPolicy};
pub use snapshot::{
    AdaptFailure, CommandTarget, CycleReport, EffectorCommand, EffectorFailure, FeedbackRecord,
    FeedbackSnapshot, SensorFailure,
};
