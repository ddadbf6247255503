//! The active catalog and the lock serializing rebuilds.
//!
//! A panic while a guard is held poisons the lock; the slot recovers the guard
//! and keeps serving, since the catalog is only ever replaced wholesale.

use std::sync::{Arc, LockResult, Mutex, MutexGuard, RwLock};

use tracing::warn;

use super::catalog::Catalog;

#[derive(Debug, Default)]
pub(crate) struct CatalogSlot {
    active: RwLock<Option<Arc<Catalog>>>,
    rebuild: Mutex<()>,
}

impl CatalogSlot {
    pub fn current(&self) -> Option<Arc<Catalog>> {
        recover(self.active.read(), "rwlock.read", "current").clone()
    }

    pub fn install(&self, catalog: Catalog) -> Arc<Catalog> {
        let catalog = Arc::new(catalog);
        *recover(self.active.write(), "rwlock.write", "install") = Some(Arc::clone(&catalog));
        catalog
    }

    /// Held for the duration of one build-and-install.
    pub fn rebuild_guard(&self) -> MutexGuard<'_, ()> {
        recover(self.rebuild.lock(), "mutex.lock", "rebuild")
    }
}

fn recover<G>(result: LockResult<G>, lock_kind: &'static str, op: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            lock_kind,
            result = "poisoned_recovered",
            "Recovered from poisoned catalog lock"
        );
        poisoned.into_inner()
    })
}
