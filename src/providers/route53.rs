// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! AWS Route 53 adapter.
//!
//! Talks to the Route 53 REST API directly: requests are signed with AWS Signature
//! Version 4 and responses are XML.
//!
//! - `GET /2013-04-01/hostedzonesbyname?dnsname=<zone>` resolves the hosted zone whose
//!   name is exactly `<zone>.`
//! - `GET /2013-04-01/hostedzone/<id>/rrset` lists record sets, following
//!   `IsTruncated` / `NextRecordName` / `NextRecordType` until the last page
//!
//! An A record's target is its alias DNS name (trailing dot stripped) or, when it has
//! exactly one resource record, that value. A TXT record set is a registry candidate
//! only when it holds exactly one value.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::http::{http_client, send_with_retry};
use super::{
    insert_record, insert_registry_value, process_env, required_env, DnsProvider, ProviderKind,
};
use crate::constants::{
    RECORD_TYPE_A, RECORD_TYPE_TXT, ROUTE53_API_URL, ROUTE53_API_VERSION, ROUTE53_SIGNING_REGION,
    ROUTE53_SIGNING_SERVICE,
};
use crate::errors::ProviderError;
use crate::normalize::{strip_trailing_dot, RawRecordSet};

const PROVIDER: &str = "route53";
const HOSTED_ZONE_ID_PREFIX: &str = "/hostedzone/";

/// AWS credentials used to sign requests.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AwsCredentials {
    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredentials`] if the key pair is not set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            access_key_id: required_env(&lookup, ProviderKind::Route53, "AWS_ACCESS_KEY_ID")?,
            secret_access_key: required_env(&lookup, ProviderKind::Route53, "AWS_SECRET_ACCESS_KEY")?,
            session_token: lookup("AWS_SESSION_TOKEN").filter(|t| !t.is_empty()),
        })
    }
}

/// Route 53 backend for one hosted zone.
#[derive(Debug)]
pub struct Route53 {
    client: HttpClient,
    base_url: String,
    zone: String,
    credentials: AwsCredentials,
    record_sets: OnceCell<Vec<ResourceRecordSet>>,
}

impl Route53 {
    pub fn new(zone: &str, credentials: AwsCredentials) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(PROVIDER)?,
            base_url: ROUTE53_API_URL.to_string(),
            zone: strip_trailing_dot(zone).to_string(),
            credentials,
            record_sets: OnceCell::new(),
        })
    }

    /// Build the adapter with credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing.
    pub fn from_env(zone: &str) -> Result<Self, ProviderError> {
        Self::new(zone, AwsCredentials::from_lookup(process_env)?)
    }

    /// Point the adapter at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Signed GET of `path` with `query`, returning the XML body.
    async fn get(&self, path: &str, query: &BTreeMap<String, String>) -> Result<String, ProviderError> {
        let canonical_query = canonical_query_string(query);
        let url = if canonical_query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{canonical_query}", self.base_url)
        };
        let host = host_of(&url)?;

        send_with_retry(PROVIDER, &url, || {
            let headers = sign_request(
                &self.credentials,
                &host,
                path,
                &canonical_query,
                Utc::now(),
            )?;
            Ok(headers
                .into_iter()
                .fold(self.client.get(&url), |req: RequestBuilder, (k, v)| req.header(k, v)))
        })
        .await
    }

    async fn hosted_zone_id(&self) -> Result<String, ProviderError> {
        let query = BTreeMap::from([("dnsname".to_string(), self.zone.clone())]);
        let body = self
            .get(&format!("/{ROUTE53_API_VERSION}/hostedzonesbyname"), &query)
            .await?;
        let response: ListHostedZonesByNameResponse = parse_xml(&body, "hostedzonesbyname")?;

        find_hosted_zone_id(&response, &self.zone).ok_or_else(|| ProviderError::ZoneNotFound {
            provider: PROVIDER.to_string(),
            zone: self.zone.clone(),
        })
    }

    /// The zone listing, fetched once and shared by the A and TXT views.
    async fn record_sets(&self) -> Result<&[ResourceRecordSet], ProviderError> {
        self.record_sets
            .get_or_try_init(|| self.list_record_sets())
            .await
            .map(Vec::as_slice)
    }

    /// Every record set of the zone, across all pages.
    async fn list_record_sets(&self) -> Result<Vec<ResourceRecordSet>, ProviderError> {
        let zone_id = self.hosted_zone_id().await?;
        let path = format!("/{ROUTE53_API_VERSION}/hostedzone/{zone_id}/rrset");

        let mut query = BTreeMap::new();
        let mut record_sets = Vec::new();
        let mut page = 0;

        loop {
            page += 1;
            let body = self.get(&path, &query).await?;
            let response: ListResourceRecordSetsResponse = parse_xml(&body, "rrset")?;

            debug!(
                zone = %self.zone,
                page = page,
                record_sets = response.resource_record_sets.items.len(),
                truncated = response.is_truncated,
                "Fetched Route 53 record sets"
            );
            record_sets.extend(response.resource_record_sets.items);

            match (response.is_truncated, response.next_record_name) {
                (true, Some(next_name)) => {
                    query.insert("name".to_string(), next_name);
                    match response.next_record_type {
                        Some(next_type) => query.insert("type".to_string(), next_type),
                        None => query.remove("type"),
                    };
                }
                _ => break,
            }
        }

        info!(zone = %self.zone, zone_id = %zone_id, record_sets = record_sets.len(), "Listed Route 53 zone");
        Ok(record_sets)
    }
}

#[async_trait]
impl DnsProvider for Route53 {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn get_records(&self) -> Result<RawRecordSet, ProviderError> {
        Ok(a_records(self.record_sets().await?))
    }

    async fn get_registry(&self) -> Result<RawRecordSet, ProviderError> {
        Ok(txt_records(self.record_sets().await?))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListHostedZonesByNameResponse {
    #[serde(default)]
    pub hosted_zones: HostedZones,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    pub items: Vec<HostedZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct HostedZone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListResourceRecordSetsResponse {
    #[serde(default)]
    pub resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    pub is_truncated: bool,
    pub next_record_name: Option<String>,
    pub next_record_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    pub items: Vec<ResourceRecordSet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(default)]
    pub resource_records: ResourceRecords,
    pub alias_target: Option<AliasTarget>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    pub items: Vec<ResourceRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ResourceRecord {
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AliasTarget {
    #[serde(rename = "DNSName")]
    pub dns_name: String,
}

fn parse_xml<T: serde::de::DeserializeOwned>(body: &str, operation: &str) -> Result<T, ProviderError> {
    quick_xml::de::from_str(body).map_err(|e| ProviderError::Decode {
        provider: PROVIDER.to_string(),
        url: operation.to_string(),
        reason: e.to_string(),
    })
}

/// Id (without the `/hostedzone/` prefix) of the zone named exactly `zone.`.
pub(crate) fn find_hosted_zone_id(response: &ListHostedZonesByNameResponse, zone: &str) -> Option<String> {
    let wanted = format!("{zone}.");
    response
        .hosted_zones
        .items
        .iter()
        .find(|hz| hz.name.eq_ignore_ascii_case(&wanted))
        .map(|hz| {
            hz.id
                .strip_prefix(HOSTED_ZONE_ID_PREFIX)
                .unwrap_or(&hz.id)
                .to_string()
        })
}

/// A record sets as raw field maps.
pub(crate) fn a_records(record_sets: &[ResourceRecordSet]) -> RawRecordSet {
    let mut raw = RawRecordSet::new();
    for rs in record_sets.iter().filter(|rs| rs.record_type == RECORD_TYPE_A) {
        let alias = rs
            .alias_target
            .as_ref()
            .map(|a| strip_trailing_dot(&a.dns_name))
            .filter(|a| !a.is_empty());
        let single_value = match rs.resource_records.items.as_slice() {
            [only] => Some(only.value.as_str()),
            _ => None,
        };
        let target = single_value.or(alias).unwrap_or_default();
        insert_record(&mut raw, &rs.name, target);
    }
    raw
}

/// Single-value TXT record sets as raw field maps.
pub(crate) fn txt_records(record_sets: &[ResourceRecordSet]) -> RawRecordSet {
    let mut raw = RawRecordSet::new();
    for rs in record_sets.iter().filter(|rs| rs.record_type == RECORD_TYPE_TXT) {
        if let [only] = rs.resource_records.items.as_slice() {
            insert_registry_value(&mut raw, &rs.name, &only.value);
        }
    }
    raw
}

fn host_of(url: &str) -> Result<String, ProviderError> {
    let parsed = url::Url::parse(url).map_err(|e| ProviderError::Signing {
        provider: PROVIDER.to_string(),
        reason: format!("invalid URL {url}: {e}"),
    })?;
    let host = parsed.host_str().unwrap_or_default();
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Headers that authenticate a GET request with AWS Signature Version 4.
///
/// `path` must already be URI-encoded and `canonical_query` built with
/// [`canonical_query_string`]. The request carries no body.
///
/// # Errors
///
/// Returns [`ProviderError::Signing`] if the HMAC key is rejected.
pub(crate) fn sign_request(
    credentials: &AwsCredentials,
    host: &str,
    path: &str,
    canonical_query: &str,
    now: DateTime<Utc>,
) -> Result<Vec<(&'static str, String)>, ProviderError> {
    let date = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let scope = format!("{date}/{ROUTE53_SIGNING_REGION}/{ROUTE53_SIGNING_SERVICE}/aws4_request");

    let mut canonical_headers = format!("host:{host}\nx-amz-date:{amz_date}\n");
    let mut signed_headers = "host;x-amz-date".to_string();
    if let Some(token) = &credentials.session_token {
        canonical_headers.push_str(&format!("x-amz-security-token:{token}\n"));
        signed_headers.push_str(";x-amz-security-token");
    }

    let canonical_request = format!(
        "GET\n{path}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{}",
        hex_sha256(b"")
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex_sha256(canonical_request.as_bytes())
    );
    let signature = calculate_signature(&credentials.secret_access_key, &date, &string_to_sign)?;

    let mut headers = vec![
        ("x-amz-date", amz_date),
        (
            "authorization",
            format!(
                "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                credentials.access_key_id
            ),
        ),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }
    Ok(headers)
}

/// Query string with keys sorted and RFC 3986 encoding, as SigV4 expects.
pub(crate) fn canonical_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(value: &str) -> String {
    use std::fmt::Write;
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(char::from(byte));
            }
            _ => {
                let _ = write!(encoded, "%{byte:02X}");
            }
        }
    }
    encoded
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| ProviderError::Signing {
        provider: PROVIDER.to_string(),
        reason: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn calculate_signature(secret: &str, date: &str, string_to_sign: &str) -> Result<String, ProviderError> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, ROUTE53_SIGNING_REGION.as_bytes())?;
    let k_service = hmac_sha256(&k_region, ROUTE53_SIGNING_SERVICE.as_bytes())?;
    let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
    Ok(hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?))
}

#[cfg(test)]
#[path = "route53_tests.rs"]
mod route53_tests;
