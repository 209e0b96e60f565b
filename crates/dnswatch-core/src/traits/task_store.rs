// # Task Store Trait
//
// Persistence contract for DDNS tasks.
//
// ## Purpose
//
// The scheduler reads enabled tasks every tick and writes each due task
// back after checking it. Command handlers add, mutate and delete tasks
// through the same store. Missing tasks are reported as absence
// (`None` / `false`), never as an error.
//
// ## Implementations
//
// - In-memory: [`crate::state::MemoryTaskStore`]
// - JSON file: [`crate::state::FileTaskStore`]
//
// ## Usage
//
// ```rust,ignore
// use dnswatch_core::TaskStore;
//
// let store = /* TaskStore implementation */;
// store.add(&task).await?;
//
// if let Some(mut task) = store.get(task_id).await? {
//     task.disable(chrono::Utc::now());
//     store.update(&task).await?;
// }
// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::task::DdnsTask;

/// Trait for task store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
/// Writers of the same task coordinate through [`crate::locks::TaskLocks`];
/// the store itself only has to keep each call atomic.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Get a task by id
    ///
    /// - `Ok(Some(task))`: found
    /// - `Ok(None)`: no task with this id
    /// - `Err(Error)`: storage error
    async fn get(&self, id: Uuid) -> Result<Option<DdnsTask>, crate::Error>;

    /// All tasks, enabled or not, oldest first
    async fn get_all(&self) -> Result<Vec<DdnsTask>, crate::Error>;

    /// Enabled tasks only, oldest first
    async fn get_enabled(&self) -> Result<Vec<DdnsTask>, crate::Error>;

    /// Insert a new task
    ///
    /// Fails with `Error::Store` if a task with the same id exists.
    async fn add(&self, task: &DdnsTask) -> Result<(), crate::Error>;

    /// Replace a stored task
    ///
    /// Returns `false` if no task with this id exists.
    async fn update(&self, task: &DdnsTask) -> Result<bool, crate::Error>;

    /// Delete a task
    ///
    /// Returns `false` if no task with this id existed.
    async fn delete(&self, id: Uuid) -> Result<bool, crate::Error>;
}
