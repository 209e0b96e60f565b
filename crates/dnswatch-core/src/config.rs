//! Configuration types for dnswatch
//!
//! All sections deserialize with defaults, so an empty JSON object is a
//! valid configuration. Call [`DnswatchConfig::validate`] before use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnswatchConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub ip_discovery: IpDiscoveryConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl DnswatchConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.scheduler.validate()?;
        self.resolver.validate()?;
        self.ip_discovery.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Reconciliation scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between ticks
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Upper bound on a single provider call, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Tasks processed concurrently within one tick
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Discovery source tried first when a task names none
    #[serde(default)]
    pub preferred_ip_source: Option<String>,

    /// Capacity of the scheduler event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tick_interval_secs == 0 {
            return Err(crate::Error::config("Scheduler tick interval must be > 0"));
        }
        if self.provider_timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }
        if self.max_concurrent_tasks == 0 {
            return Err(crate::Error::config("max_concurrent_tasks must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            provider_timeout_secs: default_provider_timeout_secs(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            preferred_ip_source: None,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// DNS resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_resolver_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per query
    #[serde(default = "default_resolver_attempts")]
    pub attempts: usize,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_ms == 0 {
            return Err(crate::Error::config("Resolver timeout must be > 0"));
        }
        if self.attempts == 0 {
            return Err(crate::Error::config("Resolver attempts must be > 0"));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_resolver_timeout_ms(),
            attempts: default_resolver_attempts(),
        }
    }
}

/// Public-IP discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpDiscoveryConfig {
    /// Per-source request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Replacement source table; `None` keeps the built-in one
    #[serde(default)]
    pub sources: Option<Vec<IpSourceConfig>>,
}

impl IpDiscoveryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("IP discovery timeout must be > 0"));
        }
        if let Some(sources) = &self.sources {
            if sources.is_empty() {
                return Err(crate::Error::config("IP source table cannot be empty"));
            }
            for source in sources {
                source.validate()?;
            }
        }
        Ok(())
    }
}

impl Default for IpDiscoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            sources: None,
        }
    }
}

/// One public-IP source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSourceConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub supports_ipv6: bool,
    /// JSON field holding the address; plain-text body when absent
    #[serde(default)]
    pub json_field: Option<String>,
}

impl IpSourceConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.id.trim().is_empty() {
            return Err(crate::Error::config("IP source id cannot be empty"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(crate::Error::config(format!(
                "IP source '{}' URL must start with http:// or https://",
                self.id
            )));
        }
        Ok(())
    }
}

/// Task store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON file store
    File {
        /// Path to the task file
        path: PathBuf,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.as_os_str().is_empty() => {
                Err(crate::Error::config("Task store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_tasks() -> usize {
    4
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_resolver_timeout_ms() -> u64 {
    5000
}

fn default_resolver_attempts() -> usize {
    2
}

fn default_request_timeout_secs() -> u64 {
    10
}
