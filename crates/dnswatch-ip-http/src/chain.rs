//! Ordered fallback over IP sources

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dnswatch_core::config::IpDiscoveryConfig;
use dnswatch_core::traits::{IpDiscovery, PublicIp};
use dnswatch_core::{Error, Result};

use crate::fetch::{FetchError, HttpFetch, ReqwestFetcher};
use crate::sources::{IpSourceEntry, builtin_sources};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tries each source in turn until one reports a valid address
///
/// Every call starts from scratch: nothing is cached between calls and
/// a failing source is not retried within the same call.
pub struct DiscoveryChain {
    sources: Vec<IpSourceEntry>,
    fetcher: Arc<dyn HttpFetch>,
    request_timeout: Duration,
}

impl DiscoveryChain {
    pub fn new(
        sources: Vec<IpSourceEntry>,
        fetcher: Arc<dyn HttpFetch>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            fetcher,
            request_timeout,
        }
    }

    /// Built-in table, reqwest fetcher, 10 s per source
    pub fn with_defaults() -> Self {
        Self::new(
            builtin_sources(),
            Arc::new(ReqwestFetcher::new()),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Chain from configuration; `sources: None` keeps the built-in table
    pub fn from_config(config: &IpDiscoveryConfig) -> Self {
        let sources = match &config.sources {
            Some(list) => list.iter().map(IpSourceEntry::from).collect(),
            None => builtin_sources(),
        };
        Self::new(
            sources,
            Arc::new(ReqwestFetcher::new()),
            config.request_timeout(),
        )
    }

    pub fn sources(&self) -> &[IpSourceEntry] {
        &self.sources
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub async fn current_public_ip(&self, preferred: Option<&str>) -> Result<PublicIp> {
        self.current_public_ip_cancellable(preferred, &CancellationToken::new())
            .await
    }

    pub async fn current_public_ip_cancellable(
        &self,
        preferred: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PublicIp> {
        let mut failures = Vec::new();

        for source in self.attempt_order(preferred) {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                outcome = self.try_source(source) => outcome,
            };

            match outcome {
                Ok(ip) => {
                    debug!(source = %source.id, %ip, "public IP discovered");
                    return Ok(PublicIp {
                        ip,
                        source: source.id.clone(),
                    });
                }
                Err(reason) => {
                    debug!(source = %source.id, "IP source failed: {}", reason);
                    failures.push(format!("{}: {}", source.id, reason));
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::discovery("no IP sources configured"));
        }

        warn!("every IP source failed ({} tried)", failures.len());
        Err(Error::discovery(format!(
            "no IP source succeeded: {}",
            failures.join("; ")
        )))
    }

    /// Preferred source first (when known), then the rest in table order
    fn attempt_order(&self, preferred: Option<&str>) -> Vec<&IpSourceEntry> {
        let wanted = preferred.map(str::trim).filter(|p| !p.is_empty());

        let first = wanted.and_then(|id| {
            let found = self
                .sources
                .iter()
                .position(|s| s.id.eq_ignore_ascii_case(id));
            if found.is_none() {
                debug!(preferred = id, "unknown preferred IP source, ignoring");
            }
            found
        });

        let mut order = Vec::with_capacity(self.sources.len());
        if let Some(index) = first {
            order.push(&self.sources[index]);
        }
        order.extend(
            self.sources
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != first)
                .map(|(_, s)| s),
        );
        order
    }

    async fn try_source(&self, source: &IpSourceEntry) -> std::result::Result<IpAddr, String> {
        let fetched = tokio::time::timeout(
            self.request_timeout,
            self.fetcher.get_text(&source.url, self.request_timeout),
        )
        .await
        .unwrap_or(Err(FetchError::Timeout));

        let body = fetched.map_err(|e| e.to_string())?;
        parse_ip_response(&body, source.json_field.as_deref())
    }
}

#[async_trait]
impl IpDiscovery for DiscoveryChain {
    async fn discover(
        &self,
        preferred: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PublicIp> {
        self.current_public_ip_cancellable(preferred, cancel).await
    }
}

fn cancelled() -> Error {
    Error::discovery("timed out: discovery cancelled")
}

/// Extract an address from a lookup-service response body
///
/// A JSON object body is read at `json_field` (or `"ip"` when unset);
/// anything else is taken as the plain-text address.
pub fn parse_ip_response(body: &str, json_field: Option<&str>) -> std::result::Result<IpAddr, String> {
    let body = body.trim();
    if body.is_empty() {
        return Err("empty response".to_string());
    }

    let candidate = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            let field = json_field.unwrap_or("ip");
            match map.get(field) {
                Some(serde_json::Value::String(s)) => s.trim().to_string(),
                Some(_) => return Err(format!("field '{}' is not a string", field)),
                None => return Err(format!("field '{}' missing from response", field)),
            }
        }
        _ => body.to_string(),
    };

    candidate
        .parse::<IpAddr>()
        .map_err(|_| format!("not an IP address: {:?}", truncate(&candidate)))
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(64) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
