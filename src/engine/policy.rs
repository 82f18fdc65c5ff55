//! Pluggable adaptation policy.
//!
//! The loop never hardcodes how a snapshot turns into per-module feedback or
//! effector actions; that is this trait's job. The defaults are deterministic
//! and data-free, matching the contract that "adaptation" is a policy seam,
//! not a learning algorithm.

use crate::engine::snapshot::{CommandTarget, EffectorCommand, FeedbackRecord, FeedbackSnapshot};

pub trait AdaptationPolicy: Send + Sync {
    /// Derive the feedback record delivered to `module_id` for this cycle.
    fn project(&self, module_id: &str, snapshot: &FeedbackSnapshot) -> FeedbackRecord;

    /// Derive the effector commands to dispatch after adaptation.
    fn derive_commands(&self, snapshot: &FeedbackSnapshot) -> Vec<EffectorCommand>;
}

/// Default policy: every module receives the full snapshot, no effector
/// commands are issued.
#[derive(Default)]
pub struct BroadcastPolicy;

impl AdaptationPolicy for BroadcastPolicy {
    fn project(&self, _module_id: &str, snapshot: &FeedbackSnapshot) -> FeedbackRecord {
        FeedbackRecord {
            cycle_id: snapshot.cycle_id,
            readings: snapshot.readings.clone(),
        }
    }

    fn derive_commands(&self, _snapshot: &FeedbackSnapshot) -> Vec<EffectorCommand> {
        Vec::new()
    }
}

/// Broadcast policy that additionally relays the whole snapshot to every
/// effector, one command per cycle. Used by the binary so a live loop
/// exercises the act phase.
#[derive(Default)]
pub struct RelaySnapshotPolicy;

impl AdaptationPolicy for RelaySnapshotPolicy {
    fn project(&self, module_id: &str, snapshot: &FeedbackSnapshot) -> FeedbackRecord {
        BroadcastPolicy.project(module_id, snapshot)
    }

    fn derive_commands(&self, snapshot: &FeedbackSnapshot) -> Vec<EffectorCommand> {
        if snapshot.readings.is_empty() {
            return Vec::new();
        }
        let payload = serde_json::json!({
            "cycle_id": snapshot.cycle_id,
            "readings": snapshot.readings,
        });
        vec![EffectorCommand {
            target: CommandTarget::All,
            payload,
        }]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AdaptationPolicy, BroadcastPolicy, RelaySnapshotPolicy};
    use crate::engine::snapshot::{CommandTarget, FeedbackSnapshot};

    #[test]
    fn broadcast_projects_full_snapshot() {
        let mut snapshot = FeedbackSnapshot::new(7);
        snapshot.insert_reading("temp", json!(21.5));

        let record = BroadcastPolicy.project("any-module", &snapshot);
        assert_eq!(record.cycle_id, 7);
        assert_eq!(record.reading("temp"), Some(&json!(21.5)));
        assert!(BroadcastPolicy.derive_commands(&snapshot).is_empty());
    }

    #[test]
    fn relay_emits_one_broadcast_command_when_readings_exist() {
        let mut snapshot = FeedbackSnapshot::new(3);
        snapshot.insert_reading("clock", json!(1234));

        let commands = RelaySnapshotPolicy.derive_commands(&snapshot);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].target, CommandTarget::All);
        assert_eq!(commands[0].payload["cycle_id"], json!(3));
    }

    #[test]
    fn relay_emits_nothing_for_empty_snapshot() {
        let snapshot = FeedbackSnapshot::new(3);
        assert!(RelaySnapshotPolicy.derive_commands(&snapshot).is_empty());
    }
}
