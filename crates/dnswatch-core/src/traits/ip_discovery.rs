// # IP Discovery Trait
//
// Defines how the scheduler learns the host's current public address.
//
// ## Implementations
//
// - HTTP source chain: `dnswatch-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dnswatch_core::IpDiscovery;
// use tokio_util::sync::CancellationToken;
//
// let discovery = /* IpDiscovery implementation */;
// let found = discovery.discover(Some("ipify"), &CancellationToken::new()).await?;
// println!("{} (via {})", found.ip, found.source);
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;

/// A discovered public address and the source that reported it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIp {
    pub ip: IpAddr,
    /// Id of the source that answered
    pub source: String,
}

/// Trait for public-IP discovery implementations
///
/// Every call is a fresh attempt; implementations must not cache results.
/// Failures are returned as `Error::Discovery`, never panics.
///
/// # Cancellation
///
/// Cancelling `cancel` aborts any in-flight network call; the call then
/// returns a timeout-class `Error::Discovery`.
#[async_trait]
pub trait IpDiscovery: Send + Sync {
    /// Discover the current public address
    ///
    /// # Parameters
    ///
    /// - `preferred`: id of the source to try first, if known
    /// - `cancel`: cancellation signal for the whole discovery
    async fn discover(
        &self,
        preferred: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PublicIp, crate::Error>;
}
