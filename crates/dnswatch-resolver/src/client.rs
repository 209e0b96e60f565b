// # Resolver Clients
//
// A resolver client is bound to exactly one name server and answers
// single-type queries for it. The hickory-backed implementation builds a
// `TokioResolver` whose only upstream is that server: no system
// configuration, no search domains.
//
// ## Answer normalization
//
// | Type      | Value                                               |
// |-----------|-----------------------------------------------------|
// | A / AAAA  | address text                                        |
// | CNAME, NS | target name                                         |
// | MX        | `<preference> <exchange>`                           |
// | TXT       | all character-strings concatenated                  |
// | SOA       | `mname rname serial refresh retry expire minimum`   |
//
// Names lose their trailing dot. Answers of another type than the one
// asked for (the CNAME chain of an A lookup, for instance) are dropped.

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig as HickoryConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, Record, RecordType as WireType};
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, TokioResolver};
use std::sync::Arc;
use std::time::Duration;

use dnswatch_core::config::ResolverConfig;
use dnswatch_core::types::{DnsServer, DomainName, RecordType, ResolvedRecord};

/// Why a query produced no answer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryFailure {
    /// The server answered with an error code (NXDOMAIN, SERVFAIL, REFUSED...)
    #[error("DNS response error: {0}")]
    Response(String),

    /// No answer in time, or the query was cancelled
    #[error("DNS query timed out: {0}")]
    Timeout(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    #[error("DNS query failed: {0}")]
    Other(String),
}

/// Timeout and retry policy for a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Per-attempt timeout
    pub timeout: Duration,
    pub attempts: usize,
}

impl ResolverSettings {
    /// Upper bound for a whole query: `timeout * attempts`
    pub fn deadline(&self) -> Duration {
        let attempts = u32::try_from(self.attempts.max(1)).unwrap_or(u32::MAX);
        self.timeout.saturating_mul(attempts)
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for ResolverSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            timeout: config.timeout(),
            attempts: config.attempts,
        }
    }
}

/// A query capability bound to one name server
#[async_trait]
pub trait ResolverClient: Send + Sync {
    async fn query(
        &self,
        domain: &DomainName,
        record_type: RecordType,
    ) -> Result<Vec<ResolvedRecord>, QueryFailure>;
}

/// Builds clients for the cache
pub trait ClientFactory: Send + Sync {
    fn create(&self, server: DnsServer, settings: &ResolverSettings) -> Arc<dyn ResolverClient>;
}

/// Factory for hickory-backed clients
#[derive(Debug, Clone, Copy, Default)]
pub struct HickoryClientFactory;

impl ClientFactory for HickoryClientFactory {
    fn create(&self, server: DnsServer, settings: &ResolverSettings) -> Arc<dyn ResolverClient> {
        Arc::new(HickoryClient::new(server, settings))
    }
}

/// hickory `TokioResolver` targeting a single server over UDP and TCP
pub struct HickoryClient {
    server: DnsServer,
    resolver: TokioResolver,
}

impl HickoryClient {
    pub fn new(server: DnsServer, settings: &ResolverSettings) -> Self {
        let config = HickoryConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[server.ip()], server.port(), true),
        );

        let mut opts = ResolverOpts::default();
        opts.timeout = settings.timeout;
        opts.attempts = settings.attempts;

        let resolver =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();

        tracing::debug!(server = %server, "Created resolver client");
        Self { server, resolver }
    }
}

#[async_trait]
impl ResolverClient for HickoryClient {
    async fn query(
        &self,
        domain: &DomainName,
        record_type: RecordType,
    ) -> Result<Vec<ResolvedRecord>, QueryFailure> {
        match self
            .resolver
            .lookup(domain.to_fqdn(), wire_type(record_type))
            .await
        {
            Ok(lookup) => Ok(lookup
                .record_iter()
                .filter_map(|record| to_resolved(record, record_type))
                .collect()),
            Err(e) => {
                tracing::trace!(server = %self.server, domain = %domain, "hickory lookup error: {}", e);
                classify(&e).map(|()| Vec::new())
            }
        }
    }
}

fn wire_type(record_type: RecordType) -> WireType {
    match record_type {
        RecordType::A => WireType::A,
        RecordType::Aaaa => WireType::AAAA,
        RecordType::Cname => WireType::CNAME,
        RecordType::Mx => WireType::MX,
        RecordType::Txt => WireType::TXT,
        RecordType::Ns => WireType::NS,
        RecordType::Soa => WireType::SOA,
    }
}

fn to_resolved(record: &Record, wanted: RecordType) -> Option<ResolvedRecord> {
    extract_value(record.data(), wanted).map(|value| ResolvedRecord::new(value, record.ttl(), wanted))
}

fn trim_name(name: impl ToString) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

/// Normalized value of an answer, or `None` if it is not of type `wanted`
pub fn extract_value(data: &RData, wanted: RecordType) -> Option<String> {
    let value = match (wanted, data) {
        (RecordType::A, RData::A(a)) => a.0.to_string(),
        (RecordType::Aaaa, RData::AAAA(aaaa)) => aaaa.0.to_string(),
        (RecordType::Cname, RData::CNAME(cname)) => trim_name(&cname.0),
        (RecordType::Ns, RData::NS(ns)) => trim_name(&ns.0),
        (RecordType::Mx, RData::MX(mx)) => {
            format!("{} {}", mx.preference(), trim_name(mx.exchange()))
        }
        (RecordType::Txt, RData::TXT(txt)) => txt
            .iter()
            .map(|segment| String::from_utf8_lossy(segment).into_owned())
            .collect(),
        (RecordType::Soa, RData::SOA(soa)) => format!(
            "{} {} {} {} {} {} {}",
            trim_name(soa.mname()),
            trim_name(soa.rname()),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        _ => return None,
    };
    Some(value)
}

/// Map a hickory error to a failure
///
/// `Ok(())` means the server answered NOERROR with no records of the
/// requested type, which is an empty success.
pub fn classify(err: &ResolveError) -> Result<(), QueryFailure> {
    let Some(proto) = err.proto() else {
        return Err(QueryFailure::Other(err.to_string()));
    };

    match proto.kind() {
        ProtoErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NoError {
                Ok(())
            } else {
                Err(QueryFailure::Response(format!(
                    "{} ({})",
                    response_code, err
                )))
            }
        }
        ProtoErrorKind::Timeout => Err(QueryFailure::Timeout(err.to_string())),
        ProtoErrorKind::Io(_) | ProtoErrorKind::NoConnections => {
            Err(QueryFailure::Network(err.to_string()))
        }
        _ => Err(QueryFailure::Other(err.to_string())),
    }
}
