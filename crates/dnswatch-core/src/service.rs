//! Task lifecycle operations for command handlers
//!
//! Every mutation re-reads the task under its [`TaskLocks`] entry, applies
//! one named operation and writes it back, so it never interleaves with a
//! scheduler pass over the same task. Unknown ids are absence, not errors.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::locks::TaskLocks;
use crate::task::{DdnsTask, NewTask};
use crate::traits::TaskStore;

/// Lifecycle façade over a [`TaskStore`]
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    locks: TaskLocks,
}

impl TaskService {
    /// Build a service sharing `locks` with the scheduler
    pub fn new(store: Arc<dyn TaskStore>, locks: TaskLocks) -> Self {
        Self { store, locks }
    }

    /// Validate and store a new task
    pub async fn create(&self, input: NewTask) -> Result<DdnsTask> {
        let task = DdnsTask::create(input, Utc::now())?;
        self.store.add(&task).await?;
        info!(task_id = %task.id(), task = task.name(), "Task created");
        Ok(task)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<DdnsTask>> {
        self.store.get(id).await
    }

    /// All tasks, oldest first
    pub async fn list(&self) -> Result<Vec<DdnsTask>> {
        self.store.get_all().await
    }

    pub async fn enable(&self, id: Uuid) -> Result<Option<DdnsTask>> {
        self.modify(id, |task| {
            task.enable(Utc::now());
            Ok(())
        })
        .await
    }

    pub async fn disable(&self, id: Uuid) -> Result<Option<DdnsTask>> {
        self.modify(id, |task| {
            task.disable(Utc::now());
            Ok(())
        })
        .await
    }

    /// Change the check interval; `Error::Validation` below one minute
    pub async fn update_interval(&self, id: Uuid, minutes: u32) -> Result<Option<DdnsTask>> {
        self.modify(id, |task| task.update_interval(minutes, Utc::now()))
            .await
    }

    pub async fn update_credentials(
        &self,
        id: Uuid,
        provider_id: &str,
        provider_secret: &str,
        extra: HashMap<String, String>,
    ) -> Result<Option<DdnsTask>> {
        self.modify(id, |task| {
            task.update_credentials(provider_id, provider_secret, extra, Utc::now())
        })
        .await
    }

    /// Delete a task; `false` if it did not exist
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let deleted = {
            let _guard = self.locks.acquire(id).await;
            self.store.delete(id).await?
        };
        if deleted {
            self.locks.forget(id);
            info!(task_id = %id, "Task deleted");
        }
        Ok(deleted)
    }

    async fn modify<F>(&self, id: Uuid, apply: F) -> Result<Option<DdnsTask>>
    where
        F: FnOnce(&mut DdnsTask) -> Result<()>,
    {
        let _guard = self.locks.acquire(id).await;

        let Some(mut task) = self.store.get(id).await? else {
            return Ok(None);
        };
        apply(&mut task)?;

        if !self.store.update(&task).await? {
            return Ok(None);
        }
        Ok(Some(task))
    }
}
