// # DNS Provider Trait
//
// The capability set every DNS-hosting provider adapter implements.
//
// ## Implementations
//
// Concrete adapters live outside this crate and are registered by name
// with [`crate::registry::ProviderFactory`].
//
// ## Usage
//
// ```rust,ignore
// use dnswatch_core::traits::{DnsProvider, RecordRequest};
//
// let provider = factory.create("cloudflare", task.provider_config())?;
// provider
//     .update_record("example.com", "record-id", &RecordRequest::address(Some("home"), ip, 600))
//     .await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use crate::types::RecordType;

/// Credentials and extra parameters for one provider call
///
/// Transient: built from a task's stored fields right before use and
/// never cached by the factory.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Credential id (API key id, account, token name...)
    pub id: String,
    /// Credential secret
    pub secret: String,
    /// Provider-specific parameters
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            extra: HashMap::new(),
        }
    }

    pub fn with_extra(mut self, extra: HashMap<String, String>) -> Self {
        self.extra = extra;
        self
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("extra", &self.extra)
            .finish()
    }
}

/// Closed set of provider failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    AuthenticationFailed,
    DomainNotFound,
    RecordNotFound,
    RecordAlreadyExists,
    RateLimited,
    InvalidParameter,
    NetworkError,
    Unknown,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication failed",
            Self::DomainNotFound => "domain not found",
            Self::RecordNotFound => "record not found",
            Self::RecordAlreadyExists => "record already exists",
            Self::RateLimited => "rate limited",
            Self::InvalidParameter => "invalid parameter",
            Self::NetworkError => "network error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure returned by a provider operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: ProviderErrorCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidParameter, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Unknown, message)
    }
}

/// Result of every provider operation
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A domain (zone) hosted at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDomain {
    /// Provider-specific id
    pub id: String,
    pub name: String,
    /// Number of records, when the provider reports it
    pub record_count: Option<u32>,
}

/// A record as stored at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Provider-specific id
    pub id: String,
    /// Host part; `None` for the zone apex
    pub sub_domain: Option<String>,
    pub record_type: RecordType,
    pub value: String,
    pub ttl: u32,
}

/// Payload for adding or updating a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRequest {
    pub sub_domain: Option<String>,
    pub record_type: RecordType,
    pub value: String,
    pub ttl: u32,
}

impl RecordRequest {
    /// A/AAAA record pointing at `ip`
    pub fn address(sub_domain: Option<&str>, ip: IpAddr, ttl: u32) -> Self {
        Self {
            sub_domain: sub_domain.map(str::to_string),
            record_type: RecordType::for_ip(ip),
            value: ip.to_string(),
            ttl,
        }
    }
}

/// Optional filter for [`DnsProvider::list_records`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub sub_domain: Option<String>,
    pub record_type: Option<RecordType>,
}

impl RecordFilter {
    /// Whether a record passes this filter
    pub fn matches(&self, record: &ProviderRecord) -> bool {
        let sub_ok = self.sub_domain.as_ref().is_none_or(|wanted| {
            record
                .sub_domain
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(wanted))
        });
        let type_ok = self.record_type.is_none_or(|t| t == record.record_type);
        sub_ok && type_ok
    }
}

/// Trait for DNS-hosting provider adapters
///
/// # Configuration
///
/// [`DnsProvider::configure`] is called once by the factory before any
/// other operation. Each call fully replaces the previous configuration;
/// nothing from an earlier configuration may leak into later calls.
///
/// # Retries and state
///
/// Adapters perform exactly one API exchange per operation. Retry policy,
/// scheduling and persistence belong to the scheduler; an adapter that
/// fails returns a [`ProviderError`] and lets the next interval retry.
///
/// # Thread Safety
///
/// Implementations must be usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Provider identifier (e.g., "cloudflare")
    fn provider_name(&self) -> &'static str;

    /// Install credentials and parameters, replacing any previous ones
    fn configure(&mut self, config: ProviderConfig);

    /// List the domains hosted under the configured account
    async fn list_domains(&self) -> ProviderResult<Vec<ProviderDomain>>;

    /// List records of a domain, optionally filtered
    async fn list_records(
        &self,
        domain: &str,
        filter: &RecordFilter,
    ) -> ProviderResult<Vec<ProviderRecord>>;

    /// Add a record
    async fn add_record(
        &self,
        domain: &str,
        record: &RecordRequest,
    ) -> ProviderResult<ProviderRecord>;

    /// Replace the record with id `record_id`
    async fn update_record(
        &self,
        domain: &str,
        record_id: &str,
        record: &RecordRequest,
    ) -> ProviderResult<ProviderRecord>;

    /// Delete the record with id `record_id`
    async fn delete_record(&self, domain: &str, record_id: &str) -> ProviderResult<()>;
}
