// # dnswatch-core
//
// Core library for DNS comparison and dynamic-DNS reconciliation.
//
// ## Architecture Overview
//
// - **types**: Validated domain names, record types, DNS servers, ISP
//   reference data and `DnsQuery` results
// - **DnsProvider**: Trait for DNS-hosting provider APIs
// - **TaskStore**: Trait for DDNS task persistence
// - **IpDiscovery**: Trait for public-IP discovery
// - **ProviderFactory**: Name-keyed registry of provider constructors
// - **Scheduler**: Periodic reconciliation loop over DDNS tasks
// - **TaskService**: Task lifecycle operations for command handlers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Plugin-Based**: Providers are registered by name, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: An unchanged IP never reaches the provider

pub mod config;
pub mod error;
pub mod locks;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod task;
pub mod traits;
pub mod types;

// Re-export core types for convenience
pub use config::{
    DnswatchConfig, IpDiscoveryConfig, IpSourceConfig, ResolverConfig, SchedulerConfig,
    StoreConfig,
};
pub use error::{Error, Result};
pub use locks::TaskLocks;
pub use registry::ProviderFactory;
pub use scheduler::{Scheduler, SchedulerEvent, TickReport};
pub use service::TaskService;
pub use state::{FileTaskStore, MemoryTaskStore};
pub use task::{DdnsTask, NewTask};
pub use traits::{DnsProvider, IpDiscovery, PublicIp, TaskStore};
pub use types::{
    DnsQuery, DnsServer, DomainName, IspProvider, RecordType, ResolveResult, ResolvedRecord,
};
