// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for ednsctl.
//!
//! This module provides specialized error types for:
//! - TXT registry value decoding
//! - Configuration validation (before any reconciliation starts)
//! - DNS provider API calls (Route 53, Cloudflare, Cloud DNS)
//! - Kubernetes inventory listing
//!
//! Registry decode failures are local and recoverable: the offending TXT entry is
//! skipped. Every other error fails the run before classification.

use thiserror::Error;

/// Errors that can occur while decoding a TXT registry value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The TXT value does not encode external-dns ownership metadata
    ///
    /// Returned when a field has an unknown key, a field is not a `key=value` pair,
    /// or the value is too short to carry its surrounding quotes.
    #[error("This record does not appear to be a TXT registry record. Content: {content}")]
    NotARegistryRecord {
        /// The raw TXT content that failed to decode
        content: String,
    },
}

/// Errors raised while turning command line flags and environment into a `Config`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting required by the selected provider is unset or empty
    #[error("Missing required setting '{setting}' for provider {provider}")]
    MissingSetting {
        /// Flag or environment variable name
        setting: String,
        /// Provider that requires it
        provider: String,
    },

    /// The provider name is not one of the supported backends
    #[error("This DNS provider is not supported: {provider}")]
    UnsupportedProvider {
        /// The provider name as given
        provider: String,
    },

    /// A setting is present but unusable
    #[error("Invalid value for setting '{setting}': {reason}")]
    InvalidSetting {
        /// Flag or environment variable name
        setting: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors returned by DNS provider adapters.
///
/// Any of these aborts the run: reconciliation never proceeds on a partial snapshot.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The configured zone does not exist in the provider account
    #[error("Zone '{zone}' not found in {provider}")]
    ZoneNotFound {
        /// Provider name
        provider: String,
        /// The zone that was looked up
        zone: String,
    },

    /// The provider API answered with a non-success HTTP status
    #[error("{provider} API request to {url} failed with HTTP {status_code}: {body}")]
    HttpStatus {
        /// Provider name
        provider: String,
        /// Request URL
        url: String,
        /// HTTP status code
        status_code: u16,
        /// Response body
        body: String,
    },

    /// The request could not be sent or the response could not be read
    #[error("{provider} API request to {url} failed: {reason}")]
    Transport {
        /// Provider name
        provider: String,
        /// Request URL
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// The provider response body could not be decoded
    #[error("Failed to decode {provider} API response from {url}: {reason}")]
    Decode {
        /// Provider name
        provider: String,
        /// Request URL
        url: String,
        /// Decoder error
        reason: String,
    },

    /// A request could not be signed with the configured credentials
    #[error("Failed to sign {provider} API request: {reason}")]
    Signing {
        /// Provider name
        provider: String,
        /// Signer error
        reason: String,
    },

    /// Credentials for the provider are missing from the environment
    #[error("Missing credentials for {provider}: set {variables}")]
    MissingCredentials {
        /// Provider name
        provider: String,
        /// Environment variables that must be set
        variables: String,
    },
}

impl ProviderError {
    /// Returns true if this error is transient and the request should be retried.
    ///
    /// Rate limiting (429), server errors (5xx) and transport failures are transient.
    /// Client errors, decode failures and missing zones or credentials are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpStatus { status_code, .. } => {
                *status_code == 429 || (500..600).contains(status_code)
            }
            Self::Transport { .. } => true,
            Self::ZoneNotFound { .. }
            | Self::Decode { .. }
            | Self::Signing { .. }
            | Self::MissingCredentials { .. } => false,
        }
    }
}

/// Errors raised while enumerating cluster resources.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Listing a resource type failed
    #[error("Failed to list {resource} in {scope}: {source}")]
    ListFailed {
        /// Resource type (e.g. "ingresses")
        resource: String,
        /// Namespace or "cluster"
        scope: String,
        /// Underlying error
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
