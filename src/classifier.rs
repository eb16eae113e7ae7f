// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Three-way reconciliation of A records against the TXT registry.
//!
//! # Ownership policy
//!
//! A registry record belongs to this registry only when its on-the-wire name starts
//! with the configured prefix (taken literally). Records that do not are moved to
//! [`ReconciliationResult::external_registry`] and are never used to mark an A record
//! as registered. Every provider goes through this single check, so an A record is
//! only ever counted as registered when its TXT record is under our own prefix.
//!
//! The classifier is a pure function of its inputs: no I/O, no shared state, and
//! deterministic output ordering (records keep input order, registries are sorted maps).

use serde::Serialize;
use tracing::debug;

use crate::normalize::{DnsRecord, Registry};
use crate::registry::RegistrySettings;

/// Outcome of one classification run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Registry records under a different prefix, keyed by prefix-stripped name
    pub external_registry: Registry,
    /// A records with no registry record owned by this registry
    pub missing_registry: Vec<DnsRecord>,
    /// A records with a matching registry record owned by this registry
    pub registered: Vec<DnsRecord>,
    /// Registry records owned by this registry, keyed by prefix-stripped name
    pub registry: Registry,
}

/// Classify A records and registry records.
///
/// 1. Registry records whose `name_with_prefix` is not under `settings.prefix` move to
///    `external_registry`; the rest stay in `registry`. The two maps never share a key.
/// 2. Each A record whose name is a key of the remaining `registry` is marked
///    registered; every other A record lands in `missing_registry`.
///
/// With an empty prefix every registry record is local and `external_registry` is empty.
#[must_use]
pub fn classify(
    registry: Registry,
    records: Vec<DnsRecord>,
    settings: &RegistrySettings,
) -> ReconciliationResult {
    let (local, external): (Registry, Registry) = registry
        .into_iter()
        .partition(|(_, record)| settings.owns(&record.name_with_prefix));

    let mut registered = Vec::new();
    let mut missing_registry = Vec::new();

    for mut record in records {
        if local.contains_key(&record.name) {
            record.registered = true;
            registered.push(record);
        } else {
            if external.contains_key(&record.name) {
                debug!(
                    name = %record.name,
                    "A record is only covered by a registry record outside the local prefix"
                );
            }
            missing_registry.push(record);
        }
    }

    debug!(
        registered = registered.len(),
        missing_registry = missing_registry.len(),
        registry = local.len(),
        external_registry = external.len(),
        "Classified DNS records"
    );

    ReconciliationResult {
        external_registry: external,
        missing_registry,
        registered,
        registry: local,
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod classifier_tests;
