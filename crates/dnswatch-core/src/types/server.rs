//! Name server addresses and ISP reference data

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::{Error, Result};

/// Standard DNS port
pub const DEFAULT_DNS_PORT: u16 = 53;

/// A DNS server endpoint (address + port)
///
/// Equality and hashing cover both the address and the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDnsServer")]
pub struct DnsServer {
    ip: IpAddr,
    port: u16,
}

#[derive(Deserialize)]
struct RawDnsServer {
    ip: IpAddr,
    #[serde(default = "default_port")]
    port: u32,
}

fn default_port() -> u32 {
    u32::from(DEFAULT_DNS_PORT)
}

impl TryFrom<RawDnsServer> for DnsServer {
    type Error = Error;

    fn try_from(raw: RawDnsServer) -> Result<Self> {
        Self::with_port(raw.ip, raw.port)
    }
}

impl DnsServer {
    /// Server on the standard port 53
    pub fn from_ip(ip: IpAddr) -> Self {
        Self {
            ip,
            port: DEFAULT_DNS_PORT,
        }
    }

    /// Server on an explicit port; the port must be in 1..=65535
    pub fn with_port(ip: IpAddr, port: u32) -> Result<Self> {
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                Error::validation(format!("DNS server port must be 1-65535. Got: {}", port))
            })?;

        Ok(Self { ip, port })
    }

    /// Parse an address string with an optional port (defaults to 53)
    pub fn parse(address: &str, port: Option<u32>) -> Result<Self> {
        let ip: IpAddr = address.trim().parse().map_err(|_| {
            Error::validation(format!("Invalid DNS server address: '{}'", address))
        })?;

        Self::with_port(ip, port.unwrap_or(u32::from(DEFAULT_DNS_PORT)))
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl fmt::Display for DnsServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == DEFAULT_DNS_PORT {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{}", self.socket_addr())
        }
    }
}

/// A name server attributed to a network operator
///
/// Reference data only; used to label comparison output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IspProvider {
    pub id: String,
    pub name: String,
    pub primary: DnsServer,
    pub secondary: Option<DnsServer>,
}

impl IspProvider {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        primary: DnsServer,
        secondary: Option<DnsServer>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary,
            secondary,
        }
    }
}

/// Built-in table of public resolvers used for comparison
pub fn builtin_isp_providers() -> Vec<IspProvider> {
    const TABLE: &[(&str, &str, [u8; 4], [u8; 4])] = &[
        ("google", "Google Public DNS", [8, 8, 8, 8], [8, 8, 4, 4]),
        ("cloudflare", "Cloudflare DNS", [1, 1, 1, 1], [1, 0, 0, 1]),
        ("quad9", "Quad9", [9, 9, 9, 9], [149, 112, 112, 112]),
        ("opendns", "OpenDNS", [208, 67, 222, 222], [208, 67, 220, 220]),
        ("alidns", "AliDNS", [223, 5, 5, 5], [223, 6, 6, 6]),
        ("dnspod", "DNSPod Public DNS", [119, 29, 29, 29], [119, 28, 28, 28]),
        ("114dns", "114DNS", [114, 114, 114, 114], [114, 114, 115, 115]),
        ("baidu", "Baidu Public DNS", [180, 76, 76, 76], [180, 76, 76, 76]),
    ];

    TABLE
        .iter()
        .map(|(id, name, primary, secondary)| {
            let secondary =
                (primary != secondary).then(|| DnsServer::from_ip(IpAddr::from(*secondary)));
            IspProvider::new(
                *id,
                *name,
                DnsServer::from_ip(IpAddr::from(*primary)),
                secondary,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults_to_port_53() {
        let server = DnsServer::parse("8.8.8.8", None).unwrap();
        assert_eq!(server.port(), 53);
        assert_eq!(server.to_string(), "8.8.8.8");
    }

    #[test]
    fn server_rejects_out_of_range_port() {
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        assert!(DnsServer::with_port(ip, 70000).is_err());
        assert!(DnsServer::with_port(ip, 0).is_err());
        assert!(DnsServer::with_port(ip, 65535).is_ok());
    }

    #[test]
    fn server_rejects_invalid_address() {
        assert!(matches!(
            DnsServer::parse("dns.google", None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn server_equality_includes_port() {
        let a = DnsServer::parse("1.1.1.1", Some(53)).unwrap();
        let b = DnsServer::parse("1.1.1.1", Some(5353)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, DnsServer::parse(" 1.1.1.1 ", None).unwrap());
        assert_eq!(b.to_string(), "1.1.1.1:5353");
    }

    #[test]
    fn server_deserialization_validates_port() {
        let ok: DnsServer = serde_json::from_str(r#"{"ip":"9.9.9.9"}"#).unwrap();
        assert_eq!(ok.port(), 53);
        assert!(serde_json::from_str::<DnsServer>(r#"{"ip":"9.9.9.9","port":70000}"#).is_err());
    }

    #[test]
    fn builtin_table_has_unique_ids() {
        let providers = builtin_isp_providers();
        let mut ids: Vec<&str> = providers.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), providers.len());
        assert!(providers.iter().any(|p| p.primary.to_string() == "1.1.1.1"));
    }
}
