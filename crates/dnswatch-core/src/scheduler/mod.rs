//! Reconciliation scheduler
//!
//! The scheduler is responsible for:
//! - Ticking on a fixed period until shutdown
//! - Picking the enabled tasks that are due
//! - Discovering the current public IP for each of them
//! - Pushing a changed IP to the task's provider
//! - Persisting every checked task, whatever the outcome
//!
//! ## Architecture
//!
//! ```text
//!   interval tick
//!        │
//!        ▼
//! ┌──────────────┐   enabled tasks   ┌─────────────┐
//! │  Scheduler   │◄──────────────────│  TaskStore  │
//! └──────────────┘                   └─────────────┘
//!        │ per task (lock held)             ▲
//!        ├──► IpDiscovery ── ip ──┐         │ persist
//!        │                        ▼         │
//!        │              unchanged? ─────────┤
//!        │                        │ changed │
//!        └──► ProviderFactory ──► DnsProvider::update_record
//! ```
//!
//! ## Fault isolation
//!
//! A failing, hanging or panicking provider only affects its own task: the
//! call runs under a timeout and `catch_unwind`, the failure is recorded on
//! the task and the tick moves on. Store failures while persisting are
//! logged and the tick continues.

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::locks::TaskLocks;
use crate::registry::ProviderFactory;
use crate::task::DdnsTask;
use crate::traits::{IpDiscovery, RecordRequest, TaskStore};
use chrono::{DateTime, Utc};
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use std::any::Any;
use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events emitted by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A tick began with this many enabled tasks
    TickStarted { enabled_tasks: usize },

    /// Task was not due, disabled or gone when its turn came
    TaskSkipped { task_id: Uuid },

    /// Public IP matches the last pushed one
    TaskUnchanged { task_id: Uuid, ip: IpAddr },

    /// Provider record updated
    TaskUpdated {
        task_id: Uuid,
        previous_ip: Option<IpAddr>,
        new_ip: IpAddr,
    },

    /// Discovery or provider update failed
    TaskFailed { task_id: Uuid, error: String },

    /// A tick completed
    TickFinished { report: TickReport },

    /// Scheduler stopped
    Stopped { reason: String },
}

/// Per-tick counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Tasks that went through discovery (updated + unchanged + failed)
    pub checked: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TickReport {
    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
            TaskOutcome::Unchanged => self.unchanged += 1,
            TaskOutcome::Updated => self.updated += 1,
            TaskOutcome::Failed => self.failed += 1,
        }
        self.checked += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Skipped,
    Unchanged,
    Updated,
    Failed,
}

/// Periodic DDNS reconciliation loop
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Start with [`Scheduler::run()`]
/// 3. Cancel the shutdown token to stop; the task in flight finishes first
///
/// [`Scheduler::tick`] runs a single pass and can be driven directly.
pub struct Scheduler {
    store: Arc<dyn TaskStore>,
    discovery: Arc<dyn IpDiscovery>,
    factory: Arc<ProviderFactory>,
    locks: TaskLocks,
    config: SchedulerConfig,
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields
    /// scheduler events. Fails with `Error::Config` on invalid settings.
    pub fn new(
        store: Arc<dyn TaskStore>,
        discovery: Arc<dyn IpDiscovery>,
        factory: Arc<ProviderFactory>,
        config: SchedulerConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let scheduler = Self {
            store,
            discovery,
            factory,
            locks: TaskLocks::new(),
            config,
            event_tx: tx,
        };

        Ok((scheduler, rx))
    }

    /// Share a lock table with other writers, such as a `TaskService`
    pub fn with_locks(mut self, locks: TaskLocks) -> Self {
        self.locks = locks;
        self
    }

    /// The lock table this scheduler takes per task
    pub fn locks(&self) -> TaskLocks {
        self.locks.clone()
    }

    /// Run until `shutdown` is cancelled
    ///
    /// The store is probed once before the first tick; a store failure at
    /// that point is fatal. The first tick fires immediately.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Startup probe failed
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let tasks = self.store.get_all().await.map_err(|e| {
            error!("Task store probe failed: {}", e);
            e
        })?;

        info!(
            tasks = tasks.len(),
            tick_secs = self.config.tick_interval_secs,
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }

                _ = ticker.tick() => {
                    self.tick_until(Utc::now(), &shutdown).await;
                }
            }
        }

        self.emit_event(SchedulerEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        info!("Scheduler stopped");
        Ok(())
    }

    /// Run one reconciliation pass as of `now`
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        self.tick_until(now, &CancellationToken::new()).await
    }

    /// One pass; no task starts once `shutdown` is cancelled
    async fn tick_until(&self, now: DateTime<Utc>, shutdown: &CancellationToken) -> TickReport {
        let mut report = TickReport::default();

        let tasks = match self.store.get_enabled().await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("Failed to load enabled tasks: {}", e);
                self.emit_event(SchedulerEvent::TickFinished { report });
                return report;
            }
        };

        debug!(enabled = tasks.len(), "Tick started");
        self.emit_event(SchedulerEvent::TickStarted {
            enabled_tasks: tasks.len(),
        });

        let outcomes: Vec<TaskOutcome> = futures::stream::iter(tasks.into_iter().map(|t| t.id()))
            .map(|id| async move {
                if shutdown.is_cancelled() {
                    return TaskOutcome::Skipped;
                }
                match AssertUnwindSafe(self.process_task(id, now)).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(task_id = %id, "Task processing panicked: {}", message);
                        self.emit_event(SchedulerEvent::TaskFailed {
                            task_id: id,
                            error: message,
                        });
                        TaskOutcome::Failed
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_tasks)
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        info!(
            checked = report.checked,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            skipped = report.skipped,
            "Tick finished"
        );
        self.emit_event(SchedulerEvent::TickFinished { report });
        report
    }

    /// Check-then-act for one task, under its lock
    async fn process_task(&self, id: Uuid, now: DateTime<Utc>) -> TaskOutcome {
        let _guard = self.locks.acquire(id).await;

        // Re-read: a command may have changed the task since the tick loaded it
        let mut task = match self.store.get(id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(task_id = %id, "Task deleted before its turn");
                self.emit_event(SchedulerEvent::TaskSkipped { task_id: id });
                return TaskOutcome::Skipped;
            }
            Err(e) => {
                error!(task_id = %id, "Failed to load task: {}", e);
                self.emit_event(SchedulerEvent::TaskFailed {
                    task_id: id,
                    error: e.to_string(),
                });
                return TaskOutcome::Failed;
            }
        };

        if !task.is_due(now) {
            debug!(task_id = %id, task = task.name(), "Task not due");
            self.emit_event(SchedulerEvent::TaskSkipped { task_id: id });
            return TaskOutcome::Skipped;
        }

        let reconciled = AssertUnwindSafe(self.reconcile(&mut task, now))
            .catch_unwind()
            .await;
        let outcome = match reconciled {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = format!("task processing panicked: {}", panic_message(panic.as_ref()));
                error!(task_id = %id, task = task.name(), "{}", message);
                task.record_check(now);
                self.fail(&mut task, message, now)
            }
        };
        self.persist(&task).await;
        outcome
    }

    async fn reconcile(&self, task: &mut DdnsTask, now: DateTime<Utc>) -> TaskOutcome {
        let id = task.id();
        let preferred = task
            .preferred_ip_source()
            .or(self.config.preferred_ip_source.as_deref())
            .map(str::to_string);

        // Discovery is bounded by its per-source timeouts; shutdown is only
        // observed between tasks.
        let cancel = CancellationToken::new();
        let discovered = AssertUnwindSafe(self.discovery.discover(preferred.as_deref(), &cancel))
            .catch_unwind()
            .await;

        task.record_check(now);

        let found = match discovered {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                let message = e.to_string();
                warn!(task_id = %id, task = task.name(), "IP discovery failed: {}", message);
                return self.fail(task, message, now);
            }
            Err(panic) => {
                let message = format!("IP discovery panicked: {}", panic_message(panic.as_ref()));
                error!(task_id = %id, task = task.name(), "{}", message);
                return self.fail(task, message, now);
            }
        };

        let previous_ip = task.last_known_ip();
        if previous_ip == Some(found.ip) {
            debug!(task_id = %id, ip = %found.ip, "IP unchanged, skipping provider update");
            self.emit_event(SchedulerEvent::TaskUnchanged {
                task_id: id,
                ip: found.ip,
            });
            return TaskOutcome::Unchanged;
        }

        // Construction runs the adapter's constructor and `configure`
        let created = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.factory
                .create(task.provider_name(), task.provider_config())
        }));
        let provider = match created {
            Ok(Some(provider)) => provider,
            Ok(None) => {
                warn!(task_id = %id, provider = task.provider_name(), "Provider not registered");
                return self.fail(task, "provider not found", now);
            }
            Err(panic) => {
                let message = format!("provider panicked: {}", panic_message(panic.as_ref()));
                error!(task_id = %id, provider = task.provider_name(), "{}", message);
                return self.fail(task, message, now);
            }
        };

        let request = RecordRequest::address(task.sub_domain(), found.ip, task.ttl());
        let call = AssertUnwindSafe(provider.update_record(
            task.domain().as_str(),
            task.record_id(),
            &request,
        ))
        .catch_unwind();

        let failure = match tokio::time::timeout(self.config.provider_timeout(), call).await {
            Ok(Ok(Ok(_record))) => None,
            Ok(Ok(Err(e))) => Some(e.to_string()),
            Ok(Err(panic)) => Some(format!(
                "provider panicked: {}",
                panic_message(panic.as_ref())
            )),
            Err(_) => Some(format!(
                "provider call timed out after {}s",
                self.config.provider_timeout_secs
            )),
        };

        if let Some(message) = failure {
            warn!(
                task_id = %id,
                provider = task.provider_name(),
                record = %task.record_name(),
                "Provider update failed: {}",
                message
            );
            return self.fail(task, message, now);
        }

        task.update_ip(found.ip, now);
        info!(
            task_id = %id,
            record = %task.record_name(),
            source = %found.source,
            "Updated {:?} -> {}",
            previous_ip,
            found.ip
        );
        self.emit_event(SchedulerEvent::TaskUpdated {
            task_id: id,
            previous_ip,
            new_ip: found.ip,
        });
        TaskOutcome::Updated
    }

    fn fail(
        &self,
        task: &mut DdnsTask,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> TaskOutcome {
        let message = message.into();
        task.record_error(message.clone(), now);
        self.emit_event(SchedulerEvent::TaskFailed {
            task_id: task.id(),
            error: message,
        });
        TaskOutcome::Failed
    }

    async fn persist(&self, task: &DdnsTask) {
        match self.store.update(task).await {
            Ok(true) => {}
            Ok(false) => warn!(task_id = %task.id(), "Task vanished before it could be saved"),
            Err(e) => error!(task_id = %task.id(), "Failed to persist task: {}", e),
        }
    }

    fn emit_event(&self, event: SchedulerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // No listener
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
