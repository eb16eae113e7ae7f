// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare adapter (API v4).
//!
//! The zone id is resolved with `GET /zones?name=<zone>`, then A and TXT records are
//! listed with `GET /zones/<id>/dns_records?type=<type>`, page by page until
//! `result_info.total_pages` is reached.
//!
//! Authentication uses `CF_API_TOKEN` (bearer token) when set, otherwise the legacy
//! `CF_API_KEY` + `CF_API_EMAIL` pair.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use super::http::{get_json, http_client};
use super::{
    insert_record, insert_registry_value, process_env, required_env, DnsProvider, ProviderKind,
};
use crate::constants::{CLOUDFLARE_API_URL, CLOUDFLARE_PAGE_SIZE, RECORD_TYPE_A, RECORD_TYPE_TXT};
use crate::errors::ProviderError;
use crate::normalize::{strip_trailing_dot, RawRecordSet};

const PROVIDER: &str = "cloudflare";

/// How requests authenticate against the Cloudflare API.
#[derive(Clone)]
pub enum CloudflareAuth {
    /// Scoped API token
    Token(String),
    /// Global API key and account email
    KeyAndEmail { key: String, email: String },
}

impl std::fmt::Debug for CloudflareAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::KeyAndEmail { email, .. } => write!(f, "KeyAndEmail({email}, <redacted>)"),
        }
    }
}

impl CloudflareAuth {
    /// Read credentials through `lookup`, preferring `CF_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredentials`] if neither a token nor a
    /// complete key/email pair is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProviderError> {
        if let Some(token) = lookup("CF_API_TOKEN").filter(|t| !t.is_empty()) {
            return Ok(Self::Token(token));
        }
        match (
            required_env(&lookup, ProviderKind::Cloudflare, "CF_API_KEY"),
            required_env(&lookup, ProviderKind::Cloudflare, "CF_API_EMAIL"),
        ) {
            (Ok(key), Ok(email)) => Ok(Self::KeyAndEmail { key, email }),
            _ => Err(ProviderError::MissingCredentials {
                provider: PROVIDER.to_string(),
                variables: "CF_API_TOKEN, or CF_API_KEY and CF_API_EMAIL".to_string(),
            }),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Token(token) => request.bearer_auth(token),
            Self::KeyAndEmail { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }
}

/// Cloudflare backend for one zone.
#[derive(Debug)]
pub struct Cloudflare {
    client: HttpClient,
    base_url: String,
    zone: String,
    auth: CloudflareAuth,
    zone_id: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<Vec<T>>,
    pub result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DnsRecordEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
}

impl Cloudflare {
    pub fn new(zone: &str, auth: CloudflareAuth) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(PROVIDER)?,
            base_url: CLOUDFLARE_API_URL.to_string(),
            zone: strip_trailing_dot(zone).to_string(),
            auth,
            zone_id: OnceCell::new(),
        })
    }

    /// Build the adapter with credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing.
    pub fn from_env(zone: &str) -> Result<Self, ProviderError> {
        Self::new(zone, CloudflareAuth::from_lookup(process_env)?)
    }

    /// Point the adapter at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url)).map_err(|e| ProviderError::Transport {
            provider: PROVIDER.to_string(),
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url.to_string())
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<ApiResponse<T>, ProviderError> {
        let response: ApiResponse<T> =
            get_json(PROVIDER, url, || Ok(self.auth.apply(self.client.get(url)))).await?;
        if !response.success {
            return Err(ProviderError::Decode {
                provider: PROVIDER.to_string(),
                url: url.to_string(),
                reason: "API reported success=false".to_string(),
            });
        }
        Ok(response)
    }

    /// Zone id, looked up once per adapter.
    async fn zone_id(&self) -> Result<&str, ProviderError> {
        self.zone_id
            .get_or_try_init(|| self.lookup_zone_id())
            .await
            .map(String::as_str)
    }

    async fn lookup_zone_id(&self) -> Result<String, ProviderError> {
        let url = self.url("/zones", &[("name", self.zone.as_str())])?;
        let response: ApiResponse<Zone> = self.get(&url).await?;

        response
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(&self.zone))
            .map(|z| z.id)
            .ok_or_else(|| ProviderError::ZoneNotFound {
                provider: PROVIDER.to_string(),
                zone: self.zone.clone(),
            })
    }

    /// Every record of `record_type` in the zone, across all pages.
    async fn list_records(&self, record_type: &str) -> Result<Vec<DnsRecordEntry>, ProviderError> {
        let zone_id = self.zone_id().await?;
        let path = format!("/zones/{zone_id}/dns_records");
        let per_page = CLOUDFLARE_PAGE_SIZE.to_string();

        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_param = page.to_string();
            let url = self.url(
                &path,
                &[
                    ("type", record_type),
                    ("page", page_param.as_str()),
                    ("per_page", per_page.as_str()),
                ],
            )?;
            let response: ApiResponse<DnsRecordEntry> = self.get(&url).await?;
            let total_pages = response.result_info.map_or(1, |info| info.total_pages);
            let items = response.result.unwrap_or_default();

            debug!(
                zone = %self.zone,
                record_type = record_type,
                page = page,
                total_pages = total_pages,
                records = items.len(),
                "Fetched Cloudflare DNS records"
            );
            records.extend(items);

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        info!(zone = %self.zone, record_type = record_type, records = records.len(), "Listed Cloudflare zone");
        Ok(records)
    }
}

#[async_trait]
impl DnsProvider for Cloudflare {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn get_records(&self) -> Result<RawRecordSet, ProviderError> {
        let mut raw = RawRecordSet::new();
        for record in self
            .list_records(RECORD_TYPE_A)
            .await?
            .iter()
            .filter(|r| r.record_type == RECORD_TYPE_A)
        {
            insert_record(&mut raw, &record.name, &record.content);
        }
        Ok(raw)
    }

    async fn get_registry(&self) -> Result<RawRecordSet, ProviderError> {
        let mut raw = RawRecordSet::new();
        for record in self
            .list_records(RECORD_TYPE_TXT)
            .await?
            .iter()
            .filter(|r| r.record_type == RECORD_TYPE_TXT)
        {
            insert_registry_value(&mut raw, &record.name, &record.content);
        }
        Ok(raw)
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
