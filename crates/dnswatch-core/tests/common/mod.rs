//! Test doubles and common utilities for scheduler contract tests
//!
//! Minimal doubles for discovery, providers and the task store. Each one
//! records how it was called so tests can assert on side effects.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dnswatch_core::error::{Error, Result};
use dnswatch_core::registry::ProviderFactory;
use dnswatch_core::traits::{
    DnsProvider, IpDiscovery, ProviderConfig, ProviderDomain, ProviderError, ProviderRecord,
    ProviderResult, PublicIp, RecordFilter, RecordRequest, TaskStore,
};
use dnswatch_core::{DdnsTask, MemoryTaskStore, NewTask, SchedulerConfig};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const MOCK_PROVIDER: &str = "mock";

/// Build a valid task input for the mock provider
pub fn new_task(name: &str, record_id: &str, interval_minutes: u32) -> NewTask {
    NewTask {
        name: name.to_string(),
        provider_name: MOCK_PROVIDER.to_string(),
        provider_id: format!("{}-id", name),
        provider_secret: "secret".to_string(),
        provider_extra: HashMap::new(),
        domain: "example.com".to_string(),
        record_id: record_id.to_string(),
        sub_domain: Some(name.to_string()),
        ttl: 600,
        interval_minutes,
    }
}

pub fn task_at(name: &str, record_id: &str, created: DateTime<Utc>) -> DdnsTask {
    DdnsTask::create(new_task(name, record_id, 5), created).unwrap()
}

/// Scheduler settings with a small provider timeout
pub fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        tick_interval_secs: 60,
        provider_timeout_secs: 2,
        max_concurrent_tasks: 4,
        preferred_ip_source: None,
        event_channel_capacity: 1024,
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Discovery that answers from a script, repeating the last entry
pub struct ScriptedDiscovery {
    script: Mutex<VecDeque<std::result::Result<IpAddr, String>>>,
    last: Mutex<std::result::Result<IpAddr, String>>,
    calls: AtomicUsize,
    preferred: Mutex<Vec<Option<String>>>,
}

impl ScriptedDiscovery {
    pub fn fixed(ip: IpAddr) -> Self {
        Self::script(vec![Ok(ip)])
    }

    pub fn failing(message: &str) -> Self {
        Self::script(vec![Err(message.to_string())])
    }

    pub fn script(entries: Vec<std::result::Result<IpAddr, String>>) -> Self {
        let last = entries
            .last()
            .cloned()
            .unwrap_or_else(|| Err("empty script".to_string()));
        Self {
            script: Mutex::new(entries.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
            preferred: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Preferred source passed on each call, in call order
    pub fn preferred_seen(&self) -> Vec<Option<String>> {
        self.preferred.lock().unwrap().clone()
    }
}

#[async_trait]
impl IpDiscovery for ScriptedDiscovery {
    async fn discover(
        &self,
        preferred: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<PublicIp> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.preferred
            .lock()
            .unwrap()
            .push(preferred.map(str::to_string));

        let next = match self.script.lock().unwrap().pop_front() {
            Some(entry) => entry,
            None => self.last.lock().unwrap().clone(),
        };

        next.map(|ip| PublicIp {
            ip,
            source: "scripted".to_string(),
        })
        .map_err(Error::discovery)
    }
}

/// Discovery that panics when asked for one particular source
pub struct ExplodingDiscovery {
    ip: IpAddr,
    trigger: String,
}

impl ExplodingDiscovery {
    pub fn new(ip: IpAddr, trigger: &str) -> Self {
        Self {
            ip,
            trigger: trigger.to_string(),
        }
    }
}

#[async_trait]
impl IpDiscovery for ExplodingDiscovery {
    async fn discover(
        &self,
        preferred: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<PublicIp> {
        if preferred == Some(self.trigger.as_str()) {
            panic!("source {} blew up", self.trigger);
        }
        Ok(PublicIp {
            ip: self.ip,
            source: "exploding".to_string(),
        })
    }
}

/// How the mock provider answers `update_record` for a record id
#[derive(Clone)]
pub enum Behavior {
    Succeed,
    Fail(ProviderError),
    Panic,
    Hang,
    /// Signal `entered`, then wait for `release`
    Gate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    },
}

#[derive(Debug, Clone)]
pub struct UpdateCall {
    pub credential_id: String,
    pub domain: String,
    pub record_id: String,
    pub request: RecordRequest,
}

/// Shared state behind every mock provider instance
#[derive(Default)]
pub struct MockBackend {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<Vec<UpdateCall>>,
    instances: AtomicUsize,
    configure_panics: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_behavior(&self, record_id: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(record_id.to_string(), behavior);
    }

    /// Make `configure` panic for this credential id
    pub fn panic_on_configure(&self, credential_id: &str) {
        self.configure_panics
            .lock()
            .unwrap()
            .push(credential_id.to_string());
    }

    pub fn calls(&self) -> Vec<UpdateCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn instances_built(&self) -> usize {
        self.instances.load(Ordering::SeqCst)
    }

    /// Factory with the mock registered under [`MOCK_PROVIDER`]
    pub fn factory(self: &Arc<Self>) -> Arc<ProviderFactory> {
        let factory = ProviderFactory::new();
        let backend = Arc::clone(self);
        factory.register(MOCK_PROVIDER, move || {
            backend.instances.fetch_add(1, Ordering::SeqCst);
            Box::new(MockProvider {
                backend: Arc::clone(&backend),
                config: ProviderConfig::default(),
            }) as Box<dyn DnsProvider>
        });
        Arc::new(factory)
    }
}

pub struct MockProvider {
    backend: Arc<MockBackend>,
    config: ProviderConfig,
}

#[async_trait]
impl DnsProvider for MockProvider {
    fn provider_name(&self) -> &'static str {
        MOCK_PROVIDER
    }

    fn configure(&mut self, config: ProviderConfig) {
        if self.backend.configure_panics.lock().unwrap().contains(&config.id) {
            panic!("bad credentials for {}", config.id);
        }
        self.config = config;
    }

    async fn list_domains(&self) -> ProviderResult<Vec<ProviderDomain>> {
        Ok(Vec::new())
    }

    async fn list_records(
        &self,
        _domain: &str,
        _filter: &RecordFilter,
    ) -> ProviderResult<Vec<ProviderRecord>> {
        Ok(Vec::new())
    }

    async fn add_record(
        &self,
        _domain: &str,
        _record: &RecordRequest,
    ) -> ProviderResult<ProviderRecord> {
        Err(ProviderError::unknown("not used"))
    }

    async fn update_record(
        &self,
        domain: &str,
        record_id: &str,
        record: &RecordRequest,
    ) -> ProviderResult<ProviderRecord> {
        self.backend.calls.lock().unwrap().push(UpdateCall {
            credential_id: self.config.id.clone(),
            domain: domain.to_string(),
            record_id: record_id.to_string(),
            request: record.clone(),
        });

        let behavior = self
            .backend
            .behaviors
            .lock()
            .unwrap()
            .get(record_id)
            .cloned()
            .unwrap_or(Behavior::Succeed);

        match behavior {
            Behavior::Succeed => {}
            Behavior::Fail(e) => return Err(e),
            Behavior::Panic => panic!("provider exploded on {}", record_id),
            Behavior::Hang => std::future::pending::<()>().await,
            Behavior::Gate { entered, release } => {
                entered.notify_one();
                release.notified().await;
            }
        }

        Ok(ProviderRecord {
            id: record_id.to_string(),
            sub_domain: record.sub_domain.clone(),
            record_type: record.record_type,
            value: record.value.clone(),
            ttl: record.ttl,
        })
    }

    async fn delete_record(&self, _domain: &str, _record_id: &str) -> ProviderResult<()> {
        Ok(())
    }
}

/// Memory store wrapper with injectable failures
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryTaskStore,
    fail_reads: AtomicBool,
    fail_updates_for: Mutex<Vec<Uuid>>,
    updates: AtomicUsize,
}

impl FlakyStore {
    pub fn with_tasks(tasks: impl IntoIterator<Item = DdnsTask>) -> Self {
        Self {
            inner: MemoryTaskStore::with_tasks(tasks),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates_for(&self, id: Uuid) {
        self.fail_updates_for.lock().unwrap().push(id);
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::store("disk on fire"));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn get(&self, id: Uuid) -> Result<Option<DdnsTask>> {
        self.check_reads()?;
        self.inner.get(id).await
    }

    async fn get_all(&self) -> Result<Vec<DdnsTask>> {
        self.check_reads()?;
        self.inner.get_all().await
    }

    async fn get_enabled(&self) -> Result<Vec<DdnsTask>> {
        self.check_reads()?;
        self.inner.get_enabled().await
    }

    async fn add(&self, task: &DdnsTask) -> Result<()> {
        self.inner.add(task).await
    }

    async fn update(&self, task: &DdnsTask) -> Result<bool> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates_for.lock().unwrap().contains(&task.id()) {
            return Err(Error::store("write refused"));
        }
        self.inner.update(task).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.inner.delete(id).await
    }
}
