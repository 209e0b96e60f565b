// # File Task Store
//
// File-based implementation of TaskStore with crash recovery.
//
// ## Purpose
//
// Persists tasks and their reconciliation state across daemon restarts.
// The scheduler relies on `last_known_ip` surviving a restart so an
// unchanged address is not pushed to the provider again.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename
// - Corruption detection: JSON validated on load
// - Automatic backup: previous good file kept as `.backup`
// - Recovery: falls back to the backup if the main file is corrupted
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "tasks": [
//     { "id": "6f1c...", "name": "home", "domain": "example.com", ... }
//   ]
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Error;
use crate::state::memory::sorted;
use crate::task::DdnsTask;
use crate::traits::task_store::TaskStore;

/// Task file format version
const TASK_FILE_VERSION: &str = "1.0";

/// File-based task store
///
/// Every mutation rewrites the whole file before returning, so a successful
/// `add`/`update`/`delete` is durable.
///
/// # Example
///
/// ```rust,no_run
/// use dnswatch_core::state::FileTaskStore;
/// use dnswatch_core::traits::TaskStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileTaskStore::new("/var/lib/dnswatch/tasks.json").await?;
///     println!("{} tasks", store.get_all().await?.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileTaskStore {
    path: PathBuf,
    tasks: RwLock<HashMap<Uuid, DdnsTask>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskFileFormat {
    version: String,
    tasks: Vec<DdnsTask>,
}

impl FileTaskStore {
    /// Create or load a file task store
    ///
    /// 1. Load the existing file
    /// 2. If it is corrupted, load the backup and restore it
    /// 3. If both fail, start empty
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create task store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let tasks = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            tasks: RwLock::new(tasks),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<Uuid, DdnsTask>, Error> {
        match Self::load(path).await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "Loaded task file");
                Ok(tasks)
            }
            Err(LoadError::Corrupted(reason)) => {
                tracing::warn!(
                    "Task file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    reason
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with no tasks.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(tasks) => {
                        tracing::info!(count = tasks.len(), "Recovered tasks from backup");
                        if let Err(e) = fs::copy(&backup_path, path).await {
                            tracing::error!("Failed to restore task file from backup: {}", e);
                        }
                        Ok(tasks)
                    }
                    Err(e) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with no tasks.",
                            e
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(LoadError::Io(e)) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<HashMap<Uuid, DdnsTask>, LoadError> {
        if !path.exists() {
            tracing::debug!("Task file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Io(Error::store(format!(
                "Failed to read task file {}: {}",
                path.display(),
                e
            )))
        })?;

        let file: TaskFileFormat =
            serde_json::from_str(&content).map_err(|e| LoadError::Corrupted(e.to_string()))?;

        if file.version != TASK_FILE_VERSION {
            tracing::warn!(
                "Task file version mismatch: expected {}, got {}. Attempting to load anyway.",
                TASK_FILE_VERSION,
                file.version
            );
        }

        Ok(file.tasks.into_iter().map(|t| (t.id(), t)).collect())
    }

    /// Write the given snapshot atomically
    ///
    /// Called with the write guard held so concurrent writers cannot
    /// reorder file contents.
    async fn write(&self, tasks: &HashMap<Uuid, DdnsTask>) -> Result<(), Error> {
        let file = TaskFileFormat {
            version: TASK_FILE_VERSION.to_string(),
            tasks: sorted(tasks.values().cloned().collect()),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::store(format!("Failed to serialize tasks: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            out.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Task file written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

enum LoadError {
    Corrupted(String),
    Io(Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Corrupted(reason) => write!(f, "corrupted: {}", reason),
            LoadError::Io(e) => write!(f, "{}", e),
        }
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn get(&self, id: Uuid) -> Result<Option<DdnsTask>, Error> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<DdnsTask>, Error> {
        let guard = self.tasks.read().await;
        Ok(sorted(guard.values().cloned().collect()))
    }

    async fn get_enabled(&self) -> Result<Vec<DdnsTask>, Error> {
        let guard = self.tasks.read().await;
        Ok(sorted(
            guard.values().filter(|t| t.is_enabled()).cloned().collect(),
        ))
    }

    async fn add(&self, task: &DdnsTask) -> Result<(), Error> {
        let mut guard = self.tasks.write().await;
        if guard.contains_key(&task.id()) {
            return Err(Error::store(format!("Task {} already exists", task.id())));
        }

        let mut next = guard.clone();
        next.insert(task.id(), task.clone());
        self.write(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn update(&self, task: &DdnsTask) -> Result<bool, Error> {
        let mut guard = self.tasks.write().await;
        if !guard.contains_key(&task.id()) {
            return Ok(false);
        }

        let mut next = guard.clone();
        next.insert(task.id(), task.clone());
        self.write(&next).await?;
        *guard = next;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, Error> {
        let mut guard = self.tasks.write().await;
        if !guard.contains_key(&id) {
            return Ok(false);
        }

        let mut next = guard.clone();
        next.remove(&id);
        self.write(&next).await?;
        *guard = next;
        Ok(true)
    }
}
