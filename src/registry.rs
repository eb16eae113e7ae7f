// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TXT registry value codec.
//!
//! external-dns records ownership of every A/ALIAS record it manages in a sibling
//! TXT record whose value looks like:
//!
//! ```text
//! "heritage=external-dns,external-dns/owner=default,external-dns/resource=ingress/web/frontend"
//! ```
//!
//! [`decode`] is strict: a value with any unknown key, or any field that is not a
//! single `key=value` pair, is rejected as a whole. Arbitrary TXT data living in the
//! same zone (SPF, domain verification tokens, ...) therefore never leaks into the
//! registry map. [`encode`] produces the exact vocabulary [`decode`] accepts.
//!
//! # Example
//!
//! ```rust
//! use ednsctl::registry::{decode, encode};
//!
//! let value = encode("team1", "ingress", "ns1", "svc1");
//! let record = decode(&format!("\"{value}\"")).unwrap();
//! assert_eq!(record.owner, "team1");
//! assert_eq!(record.resource, "ingress/ns1/svc1");
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_REGISTRY_OWNER, REGISTRY_HERITAGE, REGISTRY_KEY_HERITAGE, REGISTRY_KEY_OWNER,
    REGISTRY_KEY_RESOURCE,
};
use crate::errors::RegistryError;

/// Registry settings external-dns was deployed with.
///
/// Built once per run from configuration and passed by reference to the
/// classifier and report builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Owner id (`--txt-owner-id` in external-dns)
    pub owner: String,
    /// Prefix prepended to registry record names (`--txt-prefix`); may be empty
    pub prefix: String,
}

impl RegistrySettings {
    /// Create registry settings from an owner id and prefix.
    ///
    /// The prefix is lowercased to match the lowercased record names it is compared with.
    pub fn new(owner: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            prefix: prefix.into().to_ascii_lowercase(),
        }
    }

    /// Whether a registry record name falls under this registry's prefix.
    ///
    /// The prefix is matched literally at the start of the name, never as a
    /// regular expression. An empty prefix owns every name.
    #[must_use]
    pub fn owns(&self, name_with_prefix: &str) -> bool {
        name_with_prefix.starts_with(&self.prefix)
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_OWNER, "")
    }
}

/// A single decoded TXT registry record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Tool marker, normally `external-dns`
    pub heritage: String,
    /// Owner id that wrote the record
    pub owner: String,
    /// `kind/namespace/name` of the Kubernetes object the record was created for
    pub resource: String,
    /// Record name as it appears on the wire (prefix included)
    pub name_with_prefix: String,
    /// Record name with the configured prefix removed; the lookup key against A records
    pub name_without_prefix: String,
}

impl RegistryRecord {
    /// Attach the on-the-wire and prefix-stripped names to a decoded record.
    #[must_use]
    pub fn with_names(
        mut self,
        name_with_prefix: impl Into<String>,
        name_without_prefix: impl Into<String>,
    ) -> Self {
        self.name_with_prefix = name_with_prefix.into();
        self.name_without_prefix = name_without_prefix.into();
        self
    }
}

/// Decode a raw TXT registry value.
///
/// The first and last characters (the surrounding quotes) are dropped, the rest is
/// split on `,` and every field must be exactly one `key=value` pair with a known key.
/// The returned record has empty names; the normalizer fills them in.
///
/// # Errors
///
/// Returns [`RegistryError::NotARegistryRecord`] if the value is not an external-dns
/// registry value.
pub fn decode(content: &str) -> Result<RegistryRecord, RegistryError> {
    let not_registry = || RegistryError::NotARegistryRecord {
        content: content.to_string(),
    };

    let mut chars = content.chars();
    if chars.next().is_none() || chars.next_back().is_none() {
        return Err(not_registry());
    }
    let inner = chars.as_str();

    let mut record = RegistryRecord::default();
    for field in inner.split(',') {
        let mut parts = field.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(not_registry());
        };

        match key {
            REGISTRY_KEY_HERITAGE => record.heritage = value.to_string(),
            REGISTRY_KEY_OWNER => record.owner = value.to_string(),
            REGISTRY_KEY_RESOURCE => record.resource = value.to_string(),
            _ => return Err(not_registry()),
        }
    }

    Ok(record)
}

/// Encode the registry value external-dns would write for a resource.
///
/// The result carries no surrounding quotes; providers add them on the wire.
#[must_use]
pub fn encode(owner: &str, kind: &str, namespace: &str, name: &str) -> String {
    format!(
        "{REGISTRY_KEY_HERITAGE}={REGISTRY_HERITAGE},{REGISTRY_KEY_OWNER}={owner},{REGISTRY_KEY_RESOURCE}={kind}/{namespace}/{name}"
    )
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
