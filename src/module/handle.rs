use std::collections::VecDeque;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    engine::FeedbackRecord,
    module::{
        contract::{LifecyclePhase, Module, ModuleConfig},
        error::{ModuleError, configuration_invalid, not_ready, terminated},
    },
};

struct ModuleCell {
    phase: LifecyclePhase,
    module: Box<dyn Module>,
    feedback_window: VecDeque<FeedbackRecord>,
    window_capacity: usize,
}

/// Registry-owned wrapper around a module.
///
/// The handle is the single place where the lifecycle state machine is
/// enforced: `process`/`adapt` are Ready-only, `initialize` transitions
/// Uninitialized -> Ready exactly once, `terminate` transitions Ready ->
/// Terminated exactly once and is a no-op on an already-terminated module.
/// It also owns the module's bounded feedback window (oldest evicted first).
pub struct ModuleHandle {
    id: String,
    seq: u64,
    inner: Mutex<ModuleCell>,
}

impl std::fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl ModuleHandle {
    pub(crate) fn new(
        id: impl Into<String>,
        seq: u64,
        module: Box<dyn Module>,
        window_capacity: usize,
    ) -> Self {
        Self {
            id: id.into(),
            seq,
            inner: Mutex::new(ModuleCell {
                phase: LifecyclePhase::Uninitialized,
                module,
                feedback_window: VecDeque::new(),
                window_capacity,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registration sequence number; drives deterministic snapshot order.
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.inner.lock().await.phase
    }

    /// Validate required keys and initialize the module.
    ///
    /// On any failure the phase stays Uninitialized; the module is never left
    /// half-activated.
    pub async fn initialize(&self, config: &ModuleConfig) -> Result<(), ModuleError> {
        let mut cell = self.inner.lock().await;
        match cell.phase {
            LifecyclePhase::Ready => {
                return Err(configuration_invalid(format!(
                    "module '{}' is already initialized",
                    self.id
                )));
            }
            LifecyclePhase::Terminated => {
                return Err(terminated(format!(
                    "module '{}' is terminated and cannot be re-initialized",
                    self.id
                )));
            }
            LifecyclePhase::Uninitialized => {}
        }

        let missing: Vec<&str> = cell
            .module
            .required_config_keys()
            .iter()
            .copied()
            .filter(|key| !config.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(configuration_invalid(format!(
                "module '{}' config is missing required keys: {}",
                self.id,
                missing.join(", ")
            )));
        }

        cell.module.initialize(config).await?;
        cell.phase = LifecyclePhase::Ready;
        Ok(())
    }

    pub async fn process(&self, input: Value) -> Result<Value, ModuleError> {
        let mut cell = self.inner.lock().await;
        self.require_ready(cell.phase)?;
        cell.module.process(input).await
    }

    /// Dispatch one feedback record; on success it is retained in the bounded
    /// feedback window.
    pub async fn adapt(&self, record: FeedbackRecord) -> Result<(), ModuleError> {
        let mut cell = self.inner.lock().await;
        self.require_ready(cell.phase)?;
        cell.module.adapt(&record).await?;

        cell.feedback_window.push_back(record);
        while cell.feedback_window.len() > cell.window_capacity {
            cell.feedback_window.pop_front();
        }
        Ok(())
    }

    /// Terminate the module.
    ///
    /// Fails with `NotReady` on a never-initialized module; a second call on a
    /// terminated module is a no-op. The phase moves to Terminated even when
    /// the module's own terminate reports an error.
    pub async fn terminate(&self) -> Result<(), ModuleError> {
        let mut cell = self.inner.lock().await;
        match cell.phase {
            LifecyclePhase::Uninitialized => Err(not_ready(format!(
                "module '{}' was never initialized",
                self.id
            ))),
            LifecyclePhase::Terminated => Ok(()),
            LifecyclePhase::Ready => {
                cell.phase = LifecyclePhase::Terminated;
                cell.module.terminate().await
            }
        }
    }

    /// Best-effort termination used on registry removal: an Uninitialized
    /// module holds nothing and is released without a module call.
    pub(crate) async fn shutdown(&self) -> Result<(), ModuleError> {
        let mut cell = self.inner.lock().await;
        match cell.phase {
            LifecyclePhase::Ready => {
                cell.phase = LifecyclePhase::Terminated;
                cell.module.terminate().await
            }
            LifecyclePhase::Uninitialized | LifecyclePhase::Terminated => {
                cell.phase = LifecyclePhase::Terminated;
                Ok(())
            }
        }
    }

    /// Snapshot of the retained feedback records, oldest first.
    pub async fn feedback_window(&self) -> Vec<FeedbackRecord> {
        self.inner
            .lock()
            .await
            .feedback_window
            .iter()
            .cloned()
            .collect()
    }

    fn require_ready(&self, phase: LifecyclePhase) -> Result<(), ModuleError> {
        match phase {
            LifecyclePhase::Ready => Ok(()),
            LifecyclePhase::Uninitialized => Err(not_ready(format!(
                "module '{}' is not initialized",
                self.id
            ))),
            LifecyclePhase::Terminated => {
                Err(terminated(format!("module '{}' is terminated", self.id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        engine::FeedbackRecord,
        module::{
            LifecyclePhase, ModuleErrorKind,
            testing::{ProbeModule, probe_config},
        },
    };

    use super::ModuleHandle;

    fn handle_with_probe(window: usize) -> (ModuleHandle, ProbeModule) {
        let probe = ProbeModule::new();
        let handle = ModuleHandle::new("probe", 0, Box::new(probe.clone()), window);
        (handle, probe)
    }

    #[tokio::test]
    async fn initialize_moves_uninitialized_to_ready() {
        let (handle, _probe) = handle_with_probe(4);
        assert_eq!(handle.phase().await, LifecyclePhase::Uninitialized);

        handle
            .initialize(&probe_config())
            .await
            .expect("initialize should succeed");
        assert_eq!(handle.phase().await, LifecyclePhase::Ready);
    }

    #[tokio::test]
    async fn initialize_rejects_missing_required_keys() {
        let (handle, probe) = handle_with_probe(4);

        let err = handle
            .initialize(&serde_json::Map::new())
            .await
            .expect_err("missing keys should fail");
        assert_eq!(err.kind, ModuleErrorKind::Configuration);
        assert_eq!(handle.phase().await, LifecyclePhase::Uninitialized);
        assert_eq!(probe.initialize_calls(), 0);
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let (handle, _probe) = handle_with_probe(4);
        handle
            .initialize(&probe_config())
            .await
            .expect("initialize should succeed");

        let err = handle
            .initialize(&probe_config())
            .await
            .expect_err("re-initialize should fail");
        assert_eq!(err.kind, ModuleErrorKind::Configuration);
    }

    #[tokio::test]
    async fn process_before_initialize_fails_not_ready() {
        let (handle, _probe) = handle_with_probe(4);
        let err = handle
            .process(json!("in"))
            .await
            .expect_err("process before initialize should fail");
        assert_eq!(err.kind, ModuleErrorKind::NotReady);
    }

    #[tokio::test]
    async fn terminate_is_exactly_once_and_idempotent() {
        let (handle, probe) = handle_with_probe(4);
        handle
            .initialize(&probe_config())
            .await
            .expect("initialize should succeed");

        handle.terminate().await.expect("terminate should succeed");
        handle
            .terminate()
            .await
            .expect("second terminate is a no-op");
        assert_eq!(probe.terminate_calls(), 1);

        let err = handle
            .adapt(FeedbackRecord::empty(1))
            .await
            .expect_err("adapt after terminate should fail");
        assert_eq!(err.kind, ModuleErrorKind::Terminated);
    }

    #[tokio::test]
    async fn terminate_on_uninitialized_fails_not_ready() {
        let (handle, _probe) = handle_with_probe(4);
        let err = handle
            .terminate()
            .await
            .expect_err("terminate before initialize should fail");
        assert_eq!(err.kind, ModuleErrorKind::NotReady);
    }

    #[tokio::test]
    async fn feedback_window_evicts_oldest_beyond_capacity() {
        let (handle, _probe) = handle_with_probe(2);
        handle
            .initialize(&probe_config())
            .await
            .expect("initialize should succeed");

        for cycle_id in 1..=3 {
            handle
                .adapt(FeedbackRecord::empty(cycle_id))
                .await
                .expect("adapt should succeed");
        }

        let window = handle.feedback_window().await;
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].cycle_id, 2);
        assert_eq!(window[1].cycle_id, 3);
    }
}
