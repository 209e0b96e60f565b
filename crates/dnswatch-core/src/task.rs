//! The DDNS task: the unit of reconciliation work
//!
//! A task pairs one provider record with a check interval and carries the
//! reconciliation state the scheduler maintains. Fields are private; state
//! only changes through the named operations below.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::traits::dns_provider::ProviderConfig;
use crate::types::DomainName;

/// Extra parameter naming the preferred public-IP source for a task
pub const IP_SOURCE_PARAM: &str = "ip_source";

/// Default record TTL in seconds
pub const DEFAULT_TTL: u32 = 600;

/// Input for [`DdnsTask::create`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub provider_name: String,
    pub provider_id: String,
    pub provider_secret: String,
    #[serde(default)]
    pub provider_extra: HashMap<String, String>,
    pub domain: String,
    pub record_id: String,
    #[serde(default)]
    pub sub_domain: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    pub interval_minutes: u32,
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

/// A persisted DDNS task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdnsTask {
    id: Uuid,
    name: String,
    provider_name: String,
    provider_id: String,
    provider_secret: String,
    #[serde(default)]
    provider_extra: HashMap<String, String>,
    domain: DomainName,
    record_id: String,
    sub_domain: Option<String>,
    ttl: u32,
    #[serde(deserialize_with = "deserialize_interval")]
    interval_minutes: u32,
    enabled: bool,
    last_known_ip: Option<IpAddr>,
    last_check_time: Option<DateTime<Utc>>,
    last_update_time: Option<DateTime<Utc>>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn deserialize_interval<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = u32::deserialize(deserializer)?;
    validate_interval(minutes).map_err(serde::de::Error::custom)?;
    Ok(minutes)
}

fn validate_interval(minutes: u32) -> Result<()> {
    if minutes < 1 {
        return Err(Error::validation(
            "Check interval must be at least 1 minute",
        ));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

impl DdnsTask {
    /// Validate input and build a new, enabled task that has never been checked
    pub fn create(input: NewTask, now: DateTime<Utc>) -> Result<Self> {
        let name = require("Task name", &input.name)?;
        let provider_name = require("Provider name", &input.provider_name)?.to_lowercase();
        let provider_id = require("Provider credential id", &input.provider_id)?;
        let provider_secret = require("Provider credential secret", &input.provider_secret)?;
        let record_id = require("Record id", &input.record_id)?;
        let domain = DomainName::parse(&input.domain)?;
        validate_interval(input.interval_minutes)?;

        if input.ttl < 1 {
            return Err(Error::validation("TTL must be at least 1 second"));
        }

        let sub_domain = input
            .sub_domain
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            provider_name,
            provider_id,
            provider_secret,
            provider_extra: input.provider_extra,
            domain,
            record_id,
            sub_domain,
            ttl: input.ttl,
            interval_minutes: input.interval_minutes,
            enabled: true,
            last_known_ip: None,
            last_check_time: None,
            last_update_time: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the task should be checked at `now`
    ///
    /// True iff enabled and either never checked or at least
    /// `interval_minutes` have passed since the last check.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }

        match self.last_check_time {
            None => true,
            Some(last) => now >= last + Duration::minutes(i64::from(self.interval_minutes)),
        }
    }

    pub fn enable(&mut self, now: DateTime<Utc>) {
        self.enabled = true;
        self.updated_at = now;
    }

    pub fn disable(&mut self, now: DateTime<Utc>) {
        self.enabled = false;
        self.updated_at = now;
    }

    pub fn update_interval(&mut self, minutes: u32, now: DateTime<Utc>) -> Result<()> {
        validate_interval(minutes)?;
        self.interval_minutes = minutes;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_credentials(
        &mut self,
        id: &str,
        secret: &str,
        extra: HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.provider_id = require("Provider credential id", id)?;
        self.provider_secret = require("Provider credential secret", secret)?;
        self.provider_extra = extra;
        self.updated_at = now;
        Ok(())
    }

    /// Note a check attempt, whatever its outcome
    pub fn record_check(&mut self, now: DateTime<Utc>) {
        self.last_check_time = Some(now);
        self.updated_at = now;
    }

    /// Note a failed check or update
    pub fn record_error(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.last_error = Some(message.into());
        self.updated_at = now;
    }

    /// Note a successful provider update
    pub fn update_ip(&mut self, ip: IpAddr, now: DateTime<Utc>) {
        self.last_known_ip = Some(ip);
        self.last_update_time = Some(now);
        self.last_error = None;
        self.updated_at = now;
    }

    /// Transient provider configuration from the stored credentials
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.provider_id, &self.provider_secret)
            .with_extra(self.provider_extra.clone())
    }

    /// Preferred public-IP source, if the task names one
    pub fn preferred_ip_source(&self) -> Option<&str> {
        self.provider_extra
            .get(IP_SOURCE_PARAM)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn provider_secret(&self) -> &str {
        &self.provider_secret
    }

    pub fn provider_extra(&self) -> &HashMap<String, String> {
        &self.provider_extra
    }

    pub fn domain(&self) -> &DomainName {
        &self.domain
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn sub_domain(&self) -> Option<&str> {
        self.sub_domain.as_deref()
    }

    /// Fully qualified record name (sub-domain + domain)
    pub fn record_name(&self) -> String {
        match &self.sub_domain {
            Some(sub) if sub != "@" => format!("{}.{}", sub, self.domain),
            _ => self.domain.to_string(),
        }
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_known_ip(&self) -> Option<IpAddr> {
        self.last_known_ip
    }

    pub fn last_check_time(&self) -> Option<DateTime<Utc>> {
        self.last_check_time
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
