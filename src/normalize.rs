// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record normalization.
//!
//! Provider adapters hand over raw snapshots keyed by on-the-wire record name, each
//! entry a loose map of string fields. This module turns them into the canonical
//! [`DnsRecord`] list and the registry map keyed by prefix-stripped name.
//!
//! Unlike the registry codec this path is lenient: unknown field keys are ignored and
//! field keys are matched case-insensitively. A TXT value that fails to decode is
//! logged and left out of the registry; it never fails the run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{FIELD_TARGET, FIELD_TYPE, FIELD_VALUE, RECORD_TYPE_A};
use crate::registry::{decode, RegistryRecord, RegistrySettings};

/// Loose field map for one provider record (`name`, `type`, `target`, `value`, ...).
pub type FieldMap = BTreeMap<String, String>;

/// Raw provider snapshot keyed by on-the-wire record name.
pub type RawRecordSet = BTreeMap<String, FieldMap>;

/// Decoded registry records keyed by prefix-stripped name.
pub type Registry = BTreeMap<String, RegistryRecord>;

/// One A record from a provider zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record name without trailing dot
    pub name: String,
    /// Record type (always `A` for the records ednsctl reconciles)
    #[serde(rename = "type")]
    pub record_type: String,
    /// IP address or alias hostname the record points at
    pub target: String,
    /// Set once a registry record owned by this registry matches the name
    pub registered: bool,
}

impl DnsRecord {
    /// Create an unregistered A record.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: RECORD_TYPE_A.to_string(),
            target: target.into(),
            registered: false,
        }
    }
}

/// Remove the trailing dot of a fully qualified name.
///
/// Every trailing dot is removed, not only the last one, so that
/// `strip_trailing_dot(strip_trailing_dot(n)) == strip_trailing_dot(n)` holds for
/// malformed names such as `"a.b.."` too. Names that are already relative are
/// returned unchanged.
#[must_use]
pub fn strip_trailing_dot(name: &str) -> &str {
    name.trim_end_matches('.')
}

/// Canonical form of a DNS name: no trailing dot, ASCII lowercase.
///
/// DNS names compare case-insensitively; every name entering the comparison is
/// passed through here so zone and cluster spellings agree.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    strip_trailing_dot(name).to_ascii_lowercase()
}

/// Remove the first occurrence of `prefix` from a registry record name.
///
/// An empty prefix leaves the name untouched.
#[must_use]
pub fn remove_prefix(name: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        name.replacen(prefix, "", 1)
    }
}

/// Case-insensitive field lookup.
fn field<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Build canonical A records from a raw provider snapshot.
///
/// The snapshot key is authoritative for the record name. Records come back in
/// name order.
#[must_use]
pub fn parse_records(raw: &RawRecordSet) -> Vec<DnsRecord> {
    raw.iter()
        .map(|(wire_name, fields)| DnsRecord {
            name: canonical_name(wire_name),
            record_type: field(fields, FIELD_TYPE)
                .unwrap_or(RECORD_TYPE_A)
                .to_string(),
            target: field(fields, FIELD_TARGET).unwrap_or_default().to_string(),
            registered: false,
        })
        .collect()
}

/// Build the registry map from a raw TXT snapshot.
///
/// Each entry's `value` field is decoded with the registry codec. Entries without a
/// value, or whose value is not a registry value, are skipped. The resulting map is
/// keyed by `name_without_prefix`.
///
/// When two TXT records collapse onto the same key, a record under the configured
/// prefix wins over one that is not; otherwise the later name in order wins.
#[must_use]
pub fn parse_registry(raw: &RawRecordSet, settings: &RegistrySettings) -> Registry {
    let mut registry = Registry::new();

    for (wire_name, fields) in raw {
        let canonical = canonical_name(wire_name);
        let name_with_prefix = canonical.as_str();

        let Some(value) = field(fields, FIELD_VALUE) else {
            debug!(name = %name_with_prefix, "TXT entry has no value, skipping");
            continue;
        };

        let record = match decode(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(name = %name_with_prefix, error = %e, "Skipping TXT record that is not a registry record");
                continue;
            }
        };

        let name_without_prefix = remove_prefix(name_with_prefix, &settings.prefix);
        let record = record.with_names(name_with_prefix, name_without_prefix.clone());

        if let Some(existing) = registry.get(&name_without_prefix) {
            if settings.owns(&existing.name_with_prefix) && !settings.owns(name_with_prefix) {
                debug!(
                    name = %name_without_prefix,
                    kept = %existing.name_with_prefix,
                    dropped = %name_with_prefix,
                    "Registry name collision, keeping record under local prefix"
                );
                continue;
            }
        }

        registry.insert(name_without_prefix, record);
    }

    debug!(
        txt_records = raw.len(),
        registry_records = registry.len(),
        "Parsed TXT registry"
    );

    registry
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod normalize_tests;
