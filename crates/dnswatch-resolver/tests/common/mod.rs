//! Scripted resolver clients for resolution-engine contract tests

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use dnswatch_core::types::{DnsServer, DomainName, IspProvider, RecordType, ResolvedRecord};
use dnswatch_resolver::{ClientFactory, QueryFailure, ResolverClient, ResolverSettings};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a scripted server does with every query
#[derive(Debug, Clone)]
pub enum Reply {
    Answer {
        delay: Duration,
        values: Vec<&'static str>,
    },
    Fail(QueryFailure),
    Hang,
}

impl Reply {
    pub fn answer(values: &[&'static str]) -> Self {
        Reply::Answer {
            delay: Duration::ZERO,
            values: values.to_vec(),
        }
    }

    pub fn slow(delay_ms: u64, values: &[&'static str]) -> Self {
        Reply::Answer {
            delay: Duration::from_millis(delay_ms),
            values: values.to_vec(),
        }
    }
}

struct ScriptedClient {
    reply: Reply,
}

#[async_trait]
impl ResolverClient for ScriptedClient {
    async fn query(
        &self,
        _domain: &DomainName,
        record_type: RecordType,
    ) -> Result<Vec<ResolvedRecord>, QueryFailure> {
        match &self.reply {
            Reply::Answer { delay, values } => {
                tokio::time::sleep(*delay).await;
                Ok(values
                    .iter()
                    .map(|v| ResolvedRecord::new(*v, 300, record_type))
                    .collect())
            }
            Reply::Fail(failure) => Err(failure.clone()),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Factory handing out scripted clients keyed by server address
#[derive(Default)]
pub struct ScriptedFactory {
    replies: DashMap<IpAddr, Reply>,
    created: DashMap<DnsServer, usize>,
    total_created: AtomicUsize,
    /// Sleep inside `create` to widen race windows
    pub create_delay: Option<Duration>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, ip: &str, reply: Reply) -> Self {
        self.replies.insert(ip.parse().unwrap(), reply);
        self
    }

    pub fn created_for(&self, server: DnsServer) -> usize {
        self.created.get(&server).map(|c| *c).unwrap_or(0)
    }

    pub fn total_created(&self) -> usize {
        self.total_created.load(Ordering::SeqCst)
    }
}

impl ClientFactory for ScriptedFactory {
    fn create(&self, server: DnsServer, _settings: &ResolverSettings) -> Arc<dyn ResolverClient> {
        if let Some(delay) = self.create_delay {
            std::thread::sleep(delay);
        }
        *self.created.entry(server).or_insert(0) += 1;
        self.total_created.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .replies
            .get(&server.ip())
            .map(|r| r.clone())
            .unwrap_or_else(|| Reply::Fail(QueryFailure::Network("unreachable".to_string())));
        Arc::new(ScriptedClient { reply })
    }
}

pub fn isp(id: &str, ip: &str) -> IspProvider {
    IspProvider::new(
        id,
        format!("{} DNS", id),
        DnsServer::from_ip(ip.parse().unwrap()),
        None,
    )
}

pub fn settings(timeout_ms: u64, attempts: usize) -> ResolverSettings {
    ResolverSettings {
        timeout: Duration::from_millis(timeout_ms),
        attempts,
    }
}

pub fn domain() -> DomainName {
    DomainName::parse("example.com").unwrap()
}
