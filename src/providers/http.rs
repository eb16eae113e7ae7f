// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::constants::HTTP_REQUEST_TIMEOUT_SECS;
use crate::errors::ProviderError;
use crate::retry::{http_backoff, retry_with_backoff};

/// Build the HTTP client used by every adapter.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client(provider: &str) -> Result<HttpClient, ProviderError> {
    HttpClient::builder()
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("ednsctl/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::Transport {
            provider: provider.to_string(),
            url: String::new(),
            reason: e.to_string(),
        })
}

/// Send a request, retrying transient failures, and return the response body.
///
/// `build` is called once per attempt so that signed requests carry a fresh
/// timestamp. HTTP 429, 5xx and connection errors are retried with
/// [`http_backoff`]; any other non-success status fails immediately.
///
/// # Errors
///
/// Returns the last [`ProviderError`] once the error is permanent or retries are exhausted.
pub async fn send_with_retry<F>(provider: &str, url: &str, build: F) -> Result<String, ProviderError>
where
    F: Fn() -> Result<RequestBuilder, ProviderError>,
{
    let operation = format!("{provider} GET {url}");
    retry_with_backoff(http_backoff(), &operation, ProviderError::is_transient, || {
        let request = build();
        async move { send_once(provider, url, request?).await }
    })
    .await
}

/// Send a request with retry and decode the JSON body.
///
/// # Errors
///
/// Returns an error if the request fails or the body is not the expected JSON.
pub async fn get_json<T, F>(provider: &str, url: &str, build: F) -> Result<T, ProviderError>
where
    T: DeserializeOwned,
    F: Fn() -> Result<RequestBuilder, ProviderError>,
{
    let body = send_with_retry(provider, url, build).await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Decode {
        provider: provider.to_string(),
        url: url.to_string(),
        reason: e.to_string(),
    })
}

async fn send_once(provider: &str, url: &str, request: RequestBuilder) -> Result<String, ProviderError> {
    debug!(provider = provider, url = %url, "HTTP API request");

    let response = request.send().await.map_err(|e| ProviderError::Transport {
        provider: provider.to_string(),
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| ProviderError::Transport {
        provider: provider.to_string(),
        url: url.to_string(),
        reason: format!("failed to read response body: {e}"),
    })?;

    debug!(
        provider = provider,
        url = %url,
        status = %status,
        body_len = body.len(),
        "HTTP API response"
    );

    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            provider: provider.to_string(),
            url: url.to_string(),
            status_code: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
