//! Name-keyed provider factory
//!
//! Concrete provider adapters register a constructor under their name; the
//! scheduler and command handlers ask for a configured instance by name at
//! call time. Nothing is cached: every [`ProviderFactory::create`] builds a
//! fresh instance and configures it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnswatch_core::registry::ProviderFactory;
//!
//! let factory = ProviderFactory::new();
//! factory.register("cloudflare", || Box::new(CloudflareProvider::default()) as _);
//!
//! match factory.create("Cloudflare", task.provider_config()) {
//!     Some(provider) => { /* call provider */ }
//!     None => { /* provider not found */ }
//! }
//! ```

use crate::traits::{DnsProvider, ProviderConfig};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Constructor for unconfigured provider instances
pub trait DnsProviderFactory: Send + Sync {
    /// Build a new, unconfigured instance
    fn build(&self) -> Box<dyn DnsProvider>;
}

impl<F> DnsProviderFactory for F
where
    F: Fn() -> Box<dyn DnsProvider> + Send + Sync,
{
    fn build(&self) -> Box<dyn DnsProvider> {
        self()
    }
}

/// Registry mapping provider names to constructors
///
/// Names are matched case-insensitively. The registry uses interior
/// mutability, so it can be shared behind an `Arc` and extended at runtime.
#[derive(Default)]
pub struct ProviderFactory {
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ProviderFactory {
    /// Create a new empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`, replacing any previous one
    pub fn register(&self, name: &str, factory: impl DnsProviderFactory + 'static) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(normalize(name), Box::new(factory));
    }

    /// Build and configure a provider
    ///
    /// # Returns
    ///
    /// - `Some(provider)`: a fresh instance configured with `config`
    /// - `None`: no provider is registered under `name`
    pub fn create(&self, name: &str, config: ProviderConfig) -> Option<Box<dyn DnsProvider>> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = providers.get(&normalize(name))?;
        let mut provider = factory.build();
        provider.configure(config);
        Some(provider)
    }

    /// Check if a provider name is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(&normalize(name))
    }

    /// Registered provider names, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }
}
