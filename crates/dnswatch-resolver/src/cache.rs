//! Process-wide resolver client cache
//!
//! One client per distinct server, created on first use and kept for the
//! life of the cache. Distinct servers are few and static, so there is no
//! eviction.

use dashmap::DashMap;
use std::sync::Arc;

use dnswatch_core::types::DnsServer;

use crate::client::{ClientFactory, ResolverClient, ResolverSettings};

pub struct ClientCache {
    clients: DashMap<DnsServer, Arc<dyn ResolverClient>>,
    factory: Arc<dyn ClientFactory>,
    settings: ResolverSettings,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn ClientFactory>, settings: ResolverSettings) -> Self {
        Self {
            clients: DashMap::new(),
            factory,
            settings,
        }
    }

    /// Client for `server`, creating it exactly once
    ///
    /// Creation runs under the entry's shard lock, so concurrent first
    /// requests for the same server build a single client.
    pub fn get_or_create(&self, server: DnsServer) -> Arc<dyn ResolverClient> {
        if let Some(client) = self.clients.get(&server) {
            return Arc::clone(client.value());
        }

        let entry = self.clients.entry(server).or_insert_with(|| {
            tracing::debug!(server = %server, "Resolver client cache miss");
            self.factory.create(server, &self.settings)
        });
        Arc::clone(entry.value())
    }

    /// Number of cached clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn settings(&self) -> ResolverSettings {
        self.settings
    }
}
