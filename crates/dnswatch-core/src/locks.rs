//! Per-task mutual exclusion
//!
//! The scheduler and [`crate::service::TaskService`] both read-modify-write
//! tasks. Holding a task's lock across the whole read-modify-write keeps a
//! command from interleaving with a reconciliation pass on the same task.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Shared table of per-task async locks
///
/// Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct TaskLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for `id`
    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a deleted task
    ///
    /// Holders of an already-acquired guard are unaffected.
    pub fn forget(&self, id: Uuid) {
        self.locks.remove(&id);
    }
}
