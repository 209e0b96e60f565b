//! Domain names and record types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Maximum total length of a domain name (RFC 1035)
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label (RFC 1035)
const MAX_LABEL_LEN: usize = 63;

/// A validated, normalized domain name
///
/// Input is trimmed, lower-cased and stripped of one trailing dot before
/// validation. Once constructed the value is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Parse and normalize a domain name
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_lowercase();
        let normalized = normalized.strip_suffix('.').unwrap_or(&normalized).to_string();

        validate_domain_syntax(&normalized)?;
        Ok(Self(normalized))
    }

    /// Borrow the normalized name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name with a trailing dot, suitable for resolver queries
    pub fn to_fqdn(&self) -> String {
        format!("{}.", self.0)
    }
}

/// Label-by-label syntax check
fn validate_domain_syntax(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::validation("Domain name cannot be empty"));
    }

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(Error::validation(format!(
            "Domain name too long: {} chars (max {}). Got: {}",
            domain.len(),
            MAX_DOMAIN_LEN,
            domain
        )));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(Error::validation(format!(
            "Domain name must have at least two labels: '{}'",
            domain
        )));
    }

    for label in &labels {
        if label.is_empty() {
            return Err(Error::validation(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > MAX_LABEL_LEN {
            return Err(Error::validation(format!(
                "Domain label too long: {} chars (max {}). Label: '{}'",
                label.len(),
                MAX_LABEL_LEN,
                label
            )));
        }

        // Underscores appear in service labels such as `_dmarc`
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::validation(format!(
                "Domain label contains invalid characters: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::validation(format!(
                "Domain label cannot start or end with hyphen: '{}'",
                label
            )));
        }
    }

    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || tld.chars().all(|c| c.is_ascii_digit()) || tld.contains('_') {
        return Err(Error::validation(format!(
            "Invalid top-level label: '{}'",
            tld
        )));
    }

    Ok(())
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(value: DomainName) -> Self {
        value.0
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// DNS record types supported for resolution and comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Soa,
}

impl RecordType {
    /// Every supported record type
    pub const ALL: [RecordType; 7] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Txt,
        RecordType::Ns,
        RecordType::Soa,
    ];

    /// Parse a record type, ignoring surrounding whitespace and case
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "MX" => Ok(RecordType::Mx),
            "TXT" => Ok(RecordType::Txt),
            "NS" => Ok(RecordType::Ns),
            "SOA" => Ok(RecordType::Soa),
            other => Err(Error::validation(format!(
                "Unsupported record type: '{}'. Supported: A, AAAA, CNAME, MX, TXT, NS, SOA",
                other
            ))),
        }
    }

    /// Canonical upper-case mnemonic
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Soa => "SOA",
        }
    }

    /// Address record type matching the IP family
    pub fn for_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
