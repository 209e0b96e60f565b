//! Core traits
//!
//! The abstract interfaces the scheduler and command handlers are written
//! against.
//!
//! - [`DnsProvider`]: DNS-hosting provider capability set
//! - [`TaskStore`]: Task persistence
//! - [`IpDiscovery`]: Public-IP discovery

pub mod dns_provider;
pub mod ip_discovery;
pub mod task_store;

pub use dns_provider::{
    DnsProvider, ProviderConfig, ProviderDomain, ProviderError, ProviderErrorCode,
    ProviderRecord, ProviderResult, RecordFilter, RecordRequest,
};
pub use ip_discovery::{IpDiscovery, PublicIp};
pub use task_store::TaskStore;
