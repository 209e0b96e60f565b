//! Public-IP lookup services

use serde::{Deserialize, Serialize};

use dnswatch_core::config::IpSourceConfig;

/// One HTTP service that reports the caller's address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSourceEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    pub supports_ipv6: bool,
    /// JSON field holding the address; `None` for plain-text services
    pub json_field: Option<String>,
}

impl IpSourceEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        supports_ipv6: bool,
        json_field: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            supports_ipv6,
            json_field: json_field.map(str::to_string),
        }
    }
}

impl From<&IpSourceConfig> for IpSourceEntry {
    fn from(config: &IpSourceConfig) -> Self {
        Self {
            id: config.id.trim().to_string(),
            name: config.name.clone(),
            url: config.url.clone(),
            supports_ipv6: config.supports_ipv6,
            json_field: config.json_field.clone(),
        }
    }
}

/// Built-in services, in the order they are tried
pub fn builtin_sources() -> Vec<IpSourceEntry> {
    vec![
        IpSourceEntry::new("ipify", "ipify", "https://api.ipify.org?format=json", false, Some("ip")),
        IpSourceEntry::new("ipinfo", "ipinfo.io", "https://ipinfo.io/json", false, Some("ip")),
        IpSourceEntry::new("ip-api", "ip-api.com", "http://ip-api.com/json/", false, Some("query")),
        IpSourceEntry::new("icanhazip", "icanhazip", "https://icanhazip.com", false, None),
        IpSourceEntry::new("ifconfig", "ifconfig.me", "https://ifconfig.me/ip", false, None),
        IpSourceEntry::new("ipify6", "ipify (IPv6)", "https://api64.ipify.org?format=json", true, Some("ip")),
    ]
}
