// # HTTP IP Discovery
//
// Learns the host's public address by asking HTTP lookup services
// (ipify, ipinfo.io, ip-api.com...) in order until one answers with a
// valid address.
//
// ## Architecture
//
// - `sources`: the lookup-service table
// - `fetch`: `HttpFetch` primitive and its reqwest implementation
// - `chain`: `DiscoveryChain`, the ordered fallback and response parsing
//
// `DiscoveryChain` implements `dnswatch_core::IpDiscovery`, so the
// scheduler never sees HTTP details.

pub mod chain;
pub mod fetch;
pub mod sources;

pub use chain::{DiscoveryChain, parse_ip_response};
pub use fetch::{FetchError, HttpFetch, ReqwestFetcher};
pub use sources::{IpSourceEntry, builtin_sources};
