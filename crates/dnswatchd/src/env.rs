//! Environment-variable configuration
//!
//! Every setting has a default; only malformed values are errors.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

use dnswatch_core::config::{DnswatchConfig, StoreConfig};

/// Process settings read from `DNSWATCH_*` variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub log_level: String,
    pub core: DnswatchConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests need not touch the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut core = DnswatchConfig::default();

        if let Some(v) = parse_var(&get, "DNSWATCH_TICK_INTERVAL_SECS")? {
            core.scheduler.tick_interval_secs = v;
        }
        if let Some(v) = parse_var(&get, "DNSWATCH_PROVIDER_TIMEOUT_SECS")? {
            core.scheduler.provider_timeout_secs = v;
        }
        if let Some(v) = parse_var(&get, "DNSWATCH_MAX_CONCURRENT_TASKS")? {
            core.scheduler.max_concurrent_tasks = v;
        }
        if let Some(v) = parse_var(&get, "DNSWATCH_EVENT_CHANNEL_CAPACITY")? {
            core.scheduler.event_channel_capacity = v;
        }
        core.scheduler.preferred_ip_source = get("DNSWATCH_IP_SOURCE");

        if let Some(v) = parse_var(&get, "DNSWATCH_RESOLVER_TIMEOUT_MS")? {
            core.resolver.timeout_ms = v;
        }
        if let Some(v) = parse_var(&get, "DNSWATCH_RESOLVER_ATTEMPTS")? {
            core.resolver.attempts = v;
        }

        if let Some(v) = parse_var(&get, "DNSWATCH_IP_REQUEST_TIMEOUT_SECS")? {
            core.ip_discovery.request_timeout_secs = v;
        }

        core.store = match get("DNSWATCH_STORE_PATH") {
            Some(path) => StoreConfig::File {
                path: PathBuf::from(path),
            },
            None => StoreConfig::Memory,
        };

        let log_level = get("DNSWATCH_LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase();

        Ok(Self { log_level, core })
    }

    pub fn validate(&self) -> Result<()> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "DNSWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        self.core.validate()?;
        Ok(())
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{} has an invalid value: '{}'", key, raw))
        })
        .transpose()
}
