// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Google Cloud DNS adapter.
//!
//! Lists `GET /dns/v1/projects/<project>/managedZones/<zone>/rrsets`, following
//! `nextPageToken`, once per adapter. An A record set yields its first `rrdatas`
//! entry; a TXT record set yields its registry value when one of its `rrdatas`
//! decodes, otherwise its first entry. Requests authenticate with the OAuth access token in
//! `GOOGLE_OAUTH_ACCESS_TOKEN` (for example from `gcloud auth print-access-token`).

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use super::http::{get_json, http_client};
use super::{
    insert_record, insert_registry_value, process_env, required_env, DnsProvider, ProviderKind,
};
use crate::constants::{CLOUDDNS_API_URL, RECORD_TYPE_A, RECORD_TYPE_TXT};
use crate::errors::ProviderError;
use crate::normalize::RawRecordSet;

const PROVIDER: &str = "clouddns";

/// Cloud DNS backend for one managed zone.
pub struct CloudDns {
    client: HttpClient,
    base_url: String,
    project: String,
    managed_zone: String,
    access_token: String,
    record_sets: OnceCell<Vec<ResourceRecordSet>>,
}

impl std::fmt::Debug for CloudDns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDns")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("managed_zone", &self.managed_zone)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RrsetsListResponse {
    #[serde(default)]
    pub rrsets: Vec<ResourceRecordSet>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

impl CloudDns {
    pub fn new(
        project: &str,
        managed_zone: &str,
        access_token: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(PROVIDER)?,
            base_url: CLOUDDNS_API_URL.to_string(),
            project: project.to_string(),
            managed_zone: managed_zone.to_string(),
            access_token: access_token.into(),
            record_sets: OnceCell::new(),
        })
    }

    /// Build the adapter with the access token from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `GOOGLE_OAUTH_ACCESS_TOKEN` is not set.
    pub fn from_env(project: &str, managed_zone: &str) -> Result<Self, ProviderError> {
        let token = required_env(&process_env, ProviderKind::CloudDns, "GOOGLE_OAUTH_ACCESS_TOKEN")?;
        Self::new(project, managed_zone, token)
    }

    /// Point the adapter at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn rrsets_url(&self, page_token: Option<&str>) -> Result<String, ProviderError> {
        let raw = format!("{}/projects/{}/managedZones/{}/rrsets", self.base_url, self.project, self.managed_zone);
        let mut url = Url::parse(&raw).map_err(|e| ProviderError::Transport {
            provider: PROVIDER.to_string(),
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }
        Ok(url.to_string())
    }

    async fn record_sets(&self) -> Result<&[ResourceRecordSet], ProviderError> {
        self.record_sets
            .get_or_try_init(|| self.list_record_sets())
            .await
            .map(Vec::as_slice)
    }

    /// Every record set of the managed zone, across all pages.
    async fn list_record_sets(&self) -> Result<Vec<ResourceRecordSet>, ProviderError> {
        let mut record_sets = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page = 0;

        loop {
            page += 1;
            let url = self.rrsets_url(page_token.as_deref())?;
            let response: RrsetsListResponse = get_json(PROVIDER, &url, || {
                Ok(self.client.get(&url).bearer_auth(&self.access_token))
            })
            .await?;

            debug!(
                managed_zone = %self.managed_zone,
                page = page,
                record_sets = response.rrsets.len(),
                "Fetched Cloud DNS record sets"
            );
            record_sets.extend(response.rrsets);

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(
            project = %self.project,
            managed_zone = %self.managed_zone,
            record_sets = record_sets.len(),
            "Listed Cloud DNS zone"
        );
        Ok(record_sets)
    }
}

/// A record sets as raw field maps, first `rrdatas` entry only.
pub(crate) fn a_records(record_sets: &[ResourceRecordSet]) -> RawRecordSet {
    let mut raw = RawRecordSet::new();
    for rs in record_sets.iter().filter(|rs| rs.record_type == RECORD_TYPE_A) {
        if let Some(target) = rs.rrdatas.first() {
            insert_record(&mut raw, &rs.name, target);
        }
    }
    raw
}

/// TXT record sets as raw field maps.
pub(crate) fn txt_records(record_sets: &[ResourceRecordSet]) -> RawRecordSet {
    let mut raw = RawRecordSet::new();
    for rs in record_sets.iter().filter(|rs| rs.record_type == RECORD_TYPE_TXT) {
        for value in &rs.rrdatas {
            insert_registry_value(&mut raw, &rs.name, value);
        }
    }
    raw
}

#[async_trait]
impl DnsProvider for CloudDns {
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

#[cfg(test)]
#[path = "clouddns_tests.rs"]
mod clouddns_tests;
