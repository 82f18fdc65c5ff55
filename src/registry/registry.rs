use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use crate::{
    module::{Module, ModuleHandle},
    registry::error::{RegistryError, duplicate_id, invalid_id, not_found},
    telemetry::{CoreEvent, TelemetrySink},
};

#[derive(Default)]
struct RegistryState {
    version: u64,
    next_seq: u64,
    by_id: BTreeMap<String, Arc<ModuleHandle>>,
}

/// Concurrency-safe owner of the live module set.
///
/// Exclusive-writer/multiple-reader: callers may register and deregister while
/// a running cycle reads. `snapshot()` reflects the registry at call time only;
/// mutation after the call never changes an iteration already handed out.
///
/// Registration stores the module and nothing more; initialization is the
/// caller's responsibility (the Architect's convenience path does both).
/// Deregistration terminates the module best-effort: a termination failure is
/// emitted to telemetry but never blocks removal, so identifiers cannot leak.
pub struct ModuleRegistry {
    state: RwLock<RegistryState>,
    feedback_window: usize,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ModuleRegistry {
    pub fn new(feedback_window: usize, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            feedback_window,
            telemetry,
        }
    }

    /// Mutation counter; bumped on every successful register/deregister.
    pub fn version(&self) -> u64 {
        self.state.read().expect("lock poisoned").version
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state
            .read()
            .expect("lock poisoned")
            .by_id
            .contains_key(id)
    }

    /// Store a module under `id`. The module stays Uninitialized until the
    /// caller initializes it through the returned handle.
    pub fn register(
        &self,
        id: &str,
        module: Box<dyn Module>,
    ) -> Result<Arc<ModuleHandle>, RegistryError> {
        if id.trim().is_empty() {
            return Err(invalid_id("module id cannot be empty"));
        }

        let handle = {
            let mut guard = self.state.write().expect("lock poisoned");
            if guard.by_id.contains_key(id) {
                return Err(duplicate_id(format!("module '{id}' already registered")));
            }

            let seq = guard.next_seq;
            guard.next_seq = guard.next_seq.saturating_add(1);
            let handle = Arc::new(ModuleHandle::new(id, seq, module, self.feedback_window));
            guard.by_id.insert(id.to_string(), Arc::clone(&handle));
            guard.version = guard.version.saturating_add(1);
            handle
        };

        self.telemetry.on_event(CoreEvent::ModuleRegistered {
            module_id: id.to_string(),
        });
        Ok(handle)
    }

    /// Remove `id` and terminate its module. The identifier is reusable as
    /// soon as this returns, even when termination reported an error.
    pub async fn deregister(&self, id: &str) -> Result<(), RegistryError> {
        let handle = {
            let mut guard = self.state.write().expect("lock poisoned");
            let handle = guard
                .by_id
                .remove(id)
                .ok_or_else(|| not_found(format!("module '{id}' not registered")))?;
            guard.version = guard.version.saturating_add(1);
            handle
        };

        if let Err(err) = handle.shutdown().await {
            self.telemetry.on_event(CoreEvent::ModuleTerminationFailed {
                module_id: id.to_string(),
                reason: err.to_string(),
            });
        }
        self.telemetry.on_event(CoreEvent::ModuleDeregistered {
            module_id: id.to_string(),
        });
        Ok(())
    }

    /// Shared handle to the registered module; adaptation through it is
    /// immediately visible to every other holder.
    pub fn get(&self, id: &str) -> Result<Arc<ModuleHandle>, RegistryError> {
        self.state
            .read()
            .expect("lock poisoned")
            .by_id
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| not_found(format!("module '{id}' not registered")))
    }

    /// Point-in-time view of the live modules in registration order.
    /// Restartable; safe to hold while the registry mutates.
    pub fn snapshot(&self) -> Vec<(String, Arc<ModuleHandle>)> {
        let guard = self.state.read().expect("lock poisoned");
        let mut entries: Vec<_> = guard
            .by_id
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();
        entries.sort_by_key(|(_, handle)| handle.seq());
        entries
    }

    /// Terminate and remove every module, continuing past failures. Used at
    /// Architect shutdown.
    pub async fn drain(&self) {
        let mut entries = {
            let mut guard = self.state.write().expect("lock poisoned");
            let drained: Vec<_> = std::mem::take(&mut guard.by_id).into_iter().collect();
            if !drained.is_empty() {
                guard.version = guard.version.saturating_add(1);
            }
            drained
        };

        entries.sort_by_key(|(_, handle)| handle.seq());
        for (id, handle) in entries {
            if let Err(err) = handle.shutdown().await {
                self.telemetry.on_event(CoreEvent::ModuleTerminationFailed {
                    module_id: id.clone(),
                    reason: err.to_string(),
                });
            }
            self.telemetry
                .on_event(CoreEvent::ModuleDeregistered { module_id: id });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        module::testing::ProbeModule,
        registry::error::RegistryErrorKind,
        telemetry::NoopTelemetrySink,
    };

    use super::ModuleRegistry;

    fn registry() -> ModuleRegistry {
        ModuleRegistry::new(8, Arc::new(NoopTelemetrySink))
    }

    #[test]
    fn register_rejects_duplicate_and_keeps_original() {
        let registry = registry();
        let original = registry
            .register("mod-a", Box::new(ProbeModule::new()))
            .expect("first registration should succeed");

        let err = registry
            .register("mod-a", Box::new(ProbeModule::new()))
            .expect_err("duplicate id should fail");
        assert_eq!(err.kind, RegistryErrorKind::DuplicateId);

        let resolved = registry.get("mod-a").expect("original should remain");
        assert!(Arc::ptr_eq(&original, &resolved));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_empty_id() {
        let registry = registry();
        let err = registry
            .register("  ", Box::new(ProbeModule::new()))
            .expect_err("blank id should fail");
        assert_eq!(err.kind, RegistryErrorKind::InvalidId);
    }

    #[tokio::test]
    async fn deregister_unknown_id_leaves_state_unchanged() {
        let registry = registry();
        registry
            .register("mod-a", Box::new(ProbeModule::new()))
            .expect("registration should succeed");
        let version_before = registry.version();

        let err = registry
            .deregister("ghost")
            .await
            .expect_err("unknown id should fail");
        assert_eq!(err.kind, RegistryErrorKind::NotFound);
        assert_eq!(registry.version(), version_before);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn deregistered_id_is_immediately_reusable() {
        let registry = registry();
        registry
            .register("mod-a", Box::new(ProbeModule::new()))
            .expect("registration should succeed");
        registry
            .deregister("mod-a")
            .await
            .expect("deregistration should succeed");

        registry
            .register("mod-a", Box::new(ProbeModule::new()))
            .expect("id should be reusable after deregistration");
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let registry = registry();
        for id in ["zeta", "alpha", "mid"] {
            registry
                .register(id, Box::new(ProbeModule::new()))
                .expect("registration should succeed");
        }

        let ids: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn snapshot_is_stable_under_concurrent_mutation() {
        let registry = registry();
        registry
            .register("mod-a", Box::new(ProbeModule::new()))
            .expect("registration should succeed");

        let snapshot = registry.snapshot();
        registry
            .deregister("mod-a")
            .await
            .expect("deregistration should succeed");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, "mod-a");
        assert!(registry.is_empty());
    }
}
