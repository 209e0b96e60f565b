//! Resolution attempts and their outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DnsServer, DomainName, RecordType};
use crate::error::{Error, Result};

/// A single answer normalized to text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub value: String,
    pub ttl: u32,
    pub record_type: RecordType,
}

impl ResolvedRecord {
    pub fn new(value: impl Into<String>, ttl: u32, record_type: RecordType) -> Self {
        Self {
            value: value.into(),
            ttl,
            record_type,
        }
    }
}

/// Outcome of one resolution
///
/// A failure carries no records and no timing; a success carries no error.
/// Build values with [`ResolveResult::success`] or [`ResolveResult::failure`];
/// the variants stay public so callers can match on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveResult {
    Success {
        records: Vec<ResolvedRecord>,
        elapsed_ms: u64,
    },
    Failure {
        error: String,
    },
}

impl ResolveResult {
    pub fn success(records: Vec<ResolvedRecord>, elapsed_ms: u64) -> Self {
        Self::Success {
            records,
            elapsed_ms,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Answers in server order; empty on failure
    pub fn records(&self) -> &[ResolvedRecord] {
        match self {
            Self::Success { records, .. } => records,
            Self::Failure { .. } => &[],
        }
    }

    /// Elapsed milliseconds; zero on failure
    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Self::Success { elapsed_ms, .. } => *elapsed_ms,
            Self::Failure { .. } => 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// One resolution attempt against one server
///
/// Created pending; exactly one of [`DnsQuery::set_result`] or
/// [`DnsQuery::set_error`] completes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsQuery {
    id: Uuid,
    domain: DomainName,
    record_type: RecordType,
    server: DnsServer,
    isp_name: Option<String>,
    created_at: DateTime<Utc>,
    result: Option<ResolveResult>,
}

impl DnsQuery {
    pub fn new(
        domain: DomainName,
        record_type: RecordType,
        server: DnsServer,
        isp_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain,
            record_type,
            server,
            isp_name,
            created_at: Utc::now(),
            result: None,
        }
    }

    /// Complete the query with answers
    pub fn set_result(&mut self, records: Vec<ResolvedRecord>, elapsed_ms: u64) -> Result<()> {
        self.complete(ResolveResult::success(records, elapsed_ms))
    }

    /// Complete the query with a failure message
    pub fn set_error(&mut self, message: impl Into<String>) -> Result<()> {
        self.complete(ResolveResult::failure(message))
    }

    fn complete(&mut self, result: ResolveResult) -> Result<()> {
        if self.result.is_some() {
            return Err(Error::invalid_state(format!(
                "DNS query {} already completed",
                self.id
            )));
        }
        self.result = Some(result);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn domain(&self) -> &DomainName {
        &self.domain
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn server(&self) -> DnsServer {
        self.server
    }

    pub fn isp_name(&self) -> Option<&str> {
        self.isp_name.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn result(&self) -> Option<&ResolveResult> {
        self.result.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    /// True only for a completed, successful query
    pub fn is_success(&self) -> bool {
        self.result.as_ref().is_some_and(ResolveResult::is_success)
    }
}
