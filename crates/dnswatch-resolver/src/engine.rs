//! Resolution engine
//!
//! Resolves one domain/type pair against one server, or fans the same
//! query out to many ISP resolvers for comparison. Every call yields a
//! completed [`DnsQuery`]; failures are recorded on it, never returned.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dnswatch_core::config::ResolverConfig;
use dnswatch_core::types::{DnsQuery, DnsServer, DomainName, IspProvider, RecordType};

use crate::cache::ClientCache;
use crate::client::{ClientFactory, HickoryClientFactory, QueryFailure, ResolverSettings};

/// Resolves queries through one cached client per name server
///
/// Never returns an error: every call yields a [`DnsQuery`] completed
/// with either records or a failure message.
pub struct ResolutionEngine {
    cache: ClientCache,
}

impl ResolutionEngine {
    pub fn new(factory: Arc<dyn ClientFactory>, settings: ResolverSettings) -> Self {
        Self {
            cache: ClientCache::new(factory, settings),
        }
    }

    /// Engine over hickory clients
    pub fn with_hickory(config: &ResolverConfig) -> Self {
        Self::new(Arc::new(HickoryClientFactory), ResolverSettings::from(config))
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    /// Resolve against one server
    pub async fn resolve(
        &self,
        domain: &DomainName,
        record_type: RecordType,
        server: DnsServer,
        isp_name: Option<&str>,
    ) -> DnsQuery {
        self.resolve_cancellable(domain, record_type, server, isp_name, &CancellationToken::new())
            .await
    }

    /// Resolve against one server, giving up when `cancel` fires
    ///
    /// Cancellation and the `timeout * attempts` deadline both complete the
    /// query as a timeout failure.
    pub async fn resolve_cancellable(
        &self,
        domain: &DomainName,
        record_type: RecordType,
        server: DnsServer,
        isp_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> DnsQuery {
        let mut query = DnsQuery::new(
            domain.clone(),
            record_type,
            server,
            isp_name.map(str::to_string),
        );

        let client = self.cache.get_or_create(server);
        let deadline = self.cache.settings().deadline();
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(QueryFailure::Timeout("query cancelled".to_string())),

            result = tokio::time::timeout(deadline, client.query(domain, record_type)) => {
                result.unwrap_or_else(|_| {
                    Err(QueryFailure::Timeout(format!(
                        "no answer within {} ms",
                        deadline.as_millis()
                    )))
                })
            }
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let completed = match outcome {
            Ok(records) => {
                debug!(
                    domain = %domain,
                    record_type = %record_type,
                    server = %server,
                    answers = records.len(),
                    elapsed_ms,
                    "Resolved"
                );
                query.set_result(records, elapsed_ms)
            }
            Err(failure) => {
                warn!(
                    domain = %domain,
                    record_type = %record_type,
                    server = %server,
                    "Resolution failed: {}",
                    failure
                );
                query.set_error(failure.to_string())
            }
        };

        if let Err(e) = completed {
            warn!("Could not complete DNS query: {}", e);
        }
        query
    }

    /// Resolve against each provider's primary server concurrently
    ///
    /// Output order matches `providers`.
    pub async fn batch_resolve(
        &self,
        domain: &DomainName,
        record_type: RecordType,
        providers: &[IspProvider],
    ) -> Vec<DnsQuery> {
        self.batch_resolve_cancellable(domain, record_type, providers, &CancellationToken::new())
            .await
    }

    pub async fn batch_resolve_cancellable(
        &self,
        domain: &DomainName,
        record_type: RecordType,
        providers: &[IspProvider],
        cancel: &CancellationToken,
    ) -> Vec<DnsQuery> {
        let queries = providers.iter().map(|provider| {
            self.resolve_cancellable(
                domain,
                record_type,
                provider.primary,
                Some(&provider.name),
                cancel,
            )
        });
        join_all(queries).await
    }
}
