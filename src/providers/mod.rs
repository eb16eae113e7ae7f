// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider adapters.
//!
//! Each backend implements [`DnsProvider`]: it lists the A records and TXT records of
//! one zone and hands them over as raw snapshots keyed by on-the-wire record name.
//! Adapters only fetch; decoding, prefix handling and classification happen in
//! [`crate::normalize`] and [`crate::classifier`], identically for every backend.
//!
//! | Backend | API | Pagination |
//! |---|---|---|
//! | [`route53::Route53`] | Route 53 REST/XML, SigV4 signed | `IsTruncated` / `NextRecordName` |
//! | [`cloudflare::Cloudflare`] | Cloudflare v4 REST/JSON | `result_info.total_pages` |
//! | [`clouddns::CloudDns`] | Google Cloud DNS v1 REST/JSON | `nextPageToken` |
//!
//! Every request goes through [`http::send_with_retry`], and every page is fetched
//! before a snapshot is returned.

pub mod clouddns;
pub mod cloudflare;
pub mod http;
pub mod route53;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::config::Config;
use crate::constants::{FIELD_NAME, FIELD_TARGET, FIELD_TYPE, FIELD_VALUE, RECORD_TYPE_A, RECORD_TYPE_TXT};
use crate::errors::{ConfigError, ProviderError};
use crate::normalize::{FieldMap, RawRecordSet};
use crate::registry::decode;

/// Capability set every DNS backend provides.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// All A records of the zone.
    ///
    /// Field maps carry `name`, `type` and `target`.
    async fn get_records(&self) -> Result<RawRecordSet, ProviderError>;

    /// All TXT records of the zone that may hold registry values.
    ///
    /// Field maps carry `name`, `type` and `value` (the raw, quoted TXT content).
    async fn get_registry(&self) -> Result<RawRecordSet, ProviderError>;
}

/// Supported DNS backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Route53,
    Cloudflare,
    CloudDns,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Route53 => "route53",
            Self::Cloudflare => "cloudflare",
            Self::CloudDns => "clouddns",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "route53" | "aws" => Ok(Self::Route53),
            "cloudflare" | "cf" => Ok(Self::Cloudflare),
            "clouddns" | "gcp" | "google" => Ok(Self::CloudDns),
            _ => Err(ConfigError::UnsupportedProvider {
                provider: s.to_string(),
            }),
        }
    }
}

/// Construct the adapter selected by `config`, with credentials from the environment.
///
/// # Errors
///
/// Returns an error if the provider's credentials are missing or the HTTP client
/// cannot be built.
pub fn build_provider(config: &Config) -> Result<Box<dyn DnsProvider>, ProviderError> {
    let provider: Box<dyn DnsProvider> = match config.provider {
        ProviderKind::Route53 => Box::new(route53::Route53::from_env(&config.zone)?),
        ProviderKind::Cloudflare => Box::new(cloudflare::Cloudflare::from_env(&config.zone)?),
        ProviderKind::CloudDns => {
            let target = config.clouddns.as_ref().ok_or_else(|| ProviderError::MissingCredentials {
                provider: ProviderKind::CloudDns.to_string(),
                variables: "--project and --managed-zone".to_string(),
            })?;
            Box::new(clouddns::CloudDns::from_env(
                &target.project,
                &target.managed_zone,
            )?)
        }
    };
    Ok(provider)
}

/// Read a required credential through `lookup`, treating empty values as unset.
pub(crate) fn required_env(
    lookup: &impl Fn(&str) -> Option<String>,
    provider: ProviderKind,
    variable: &str,
) -> Result<String, ProviderError> {
    lookup(variable)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::MissingCredentials {
            provider: provider.to_string(),
            variables: variable.to_string(),
        })
}

/// Environment lookup used outside tests.
pub(crate) fn process_env(variable: &str) -> Option<String> {
    std::env::var(variable).ok()
}

/// Field map for one A record.
pub(crate) fn record_fields(name: &str, target: &str) -> FieldMap {
    FieldMap::from([
        (FIELD_NAME.to_string(), name.to_string()),
        (FIELD_TYPE.to_string(), RECORD_TYPE_A.to_string()),
        (FIELD_TARGET.to_string(), target.to_string()),
    ])
}

/// Field map for one TXT record.
pub(crate) fn registry_fields(name: &str, value: &str) -> FieldMap {
    FieldMap::from([
        (FIELD_NAME.to_string(), name.to_string()),
        (FIELD_TYPE.to_string(), RECORD_TYPE_TXT.to_string()),
        (FIELD_VALUE.to_string(), value.to_string()),
    ])
}

/// Add an A record to `raw`. The first target seen for a name is kept.
pub(crate) fn insert_record(raw: &mut RawRecordSet, name: &str, target: &str) {
    raw.entry(name.to_string())
        .or_insert_with(|| record_fields(name, target));
}

/// Add a TXT value to `raw`.
///
/// Several TXT values can share a name (a registry value next to an SPF or site
/// verification value). A value that decodes as a registry value replaces one that
/// does not; otherwise the first value seen for a name is kept.
pub(crate) fn insert_registry_value(raw: &mut RawRecordSet, name: &str, value: &str) {
    let is_registry = |fields: &FieldMap| {
        fields
            .get(FIELD_VALUE)
            .is_some_and(|v| decode(v).is_ok())
    };

    match raw.get(name) {
        Some(existing) if is_registry(existing) => {}
        Some(_) if decode(value).is_err() => {}
        _ => {
            raw.insert(name.to_string(), registry_fields(name, value));
        }
    }
}
