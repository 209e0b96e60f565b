// # Memory Task Store
//
// In-memory implementation of TaskStore.
//
// ## Purpose
//
// A fast store that does not survive restarts. Useful for tests,
// ephemeral deployments and embedding.
//
// ## Crash Behavior
//
// - All tasks are lost on restart/crash
// - Nothing to recover

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Error;
use crate::task::DdnsTask;
use crate::traits::task_store::TaskStore;

/// In-memory task store
///
/// Tasks live in a HashMap behind a RwLock. Cloning shares the same map.
///
/// # Example
///
/// ```rust,no_run
/// use dnswatch_core::state::MemoryTaskStore;
/// use dnswatch_core::traits::TaskStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryTaskStore::new();
///     assert!(store.get_all().await?.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    inner: Arc<RwLock<HashMap<Uuid, DdnsTask>>>,
}

impl MemoryTaskStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with tasks
    pub fn with_tasks(tasks: impl IntoIterator<Item = DdnsTask>) -> Self {
        let map = tasks.into_iter().map(|t| (t.id(), t)).collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored tasks
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// Oldest first, id as tie-breaker
pub(crate) fn sorted(mut tasks: Vec<DdnsTask>) -> Vec<DdnsTask> {
    tasks.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
    tasks
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn get(&self, id: Uuid) -> Result<Option<DdnsTask>, Error> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<DdnsTask>, Error> {
        let guard = self.inner.read().await;
        Ok(sorted(guard.values().cloned().collect()))
    }

    async fn get_enabled(&self) -> Result<Vec<DdnsTask>, Error> {
        let guard = self.inner.read().await;
        Ok(sorted(
            guard.values().filter(|t| t.is_enabled()).cloned().collect(),
        ))
    }

    async fn add(&self, task: &DdnsTask) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&task.id()) {
            return Err(Error::store(format!("Task {} already exists", task.id())));
        }
        guard.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &DdnsTask) -> Result<bool, Error> {
        let mut guard = self.inner.write().await;
        match guard.get_mut(&task.id()) {
            Some(slot) => {
                *slot = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, Error> {
        Ok(self.inner.write().await.remove(&id).is_some())
    }
}
