//! Value types shared by the resolution engine and the scheduler

pub mod domain;
pub mod query;
pub mod server;

pub use domain::{DomainName, RecordType};
pub use query::{DnsQuery, ResolveResult, ResolvedRecord};
pub use server::{DEFAULT_DNS_PORT, DnsServer, IspProvider, builtin_isp_providers};
