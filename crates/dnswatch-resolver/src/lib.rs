//! DNS resolution and comparison for dnswatch
//!
//! - [`ResolutionEngine`]: single and batch resolves, producing completed
//!   [`dnswatch_core::DnsQuery`] values
//! - [`ClientCache`]: one resolver client per name server
//! - [`HickoryClientFactory`]: hickory-resolver backed clients
//! - [`ComparisonSummary`]: agreement across batch results
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dnswatch_core::config::ResolverConfig;
//! use dnswatch_core::types::{builtin_isp_providers, DomainName, RecordType};
//! use dnswatch_resolver::{ComparisonSummary, ResolutionEngine};
//!
//! # async fn demo() -> Result<(), dnswatch_core::Error> {
//! let engine = ResolutionEngine::with_hickory(&ResolverConfig::default());
//! let domain = DomainName::parse("example.com")?;
//! let queries = engine
//!     .batch_resolve(&domain, RecordType::A, &builtin_isp_providers())
//!     .await;
//! let summary = ComparisonSummary::from_queries(&queries);
//! println!("{:.0}% consistent", summary.consistency_percentage);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod compare;
pub mod engine;

pub use cache::ClientCache;
pub use client::{
    ClientFactory, HickoryClient, HickoryClientFactory, QueryFailure, ResolverClient,
    ResolverSettings,
};
pub use compare::{AnswerGroup, ComparisonSummary};
pub use engine::ResolutionEngine;
