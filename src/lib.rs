// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ednsctl - external-dns TXT registry verification
//!
//! external-dns records which cluster resource owns each DNS record by writing a
//! companion TXT record (the *registry*). ednsctl reads a zone's A and TXT records,
//! lists every service and ingress of the cluster, and reports where the three
//! disagree.
//!
//! ## Modules
//!
//! - [`registry`] - TXT registry value codec and ownership settings
//! - [`normalize`] - Provider field maps to canonical records and registry entries
//! - [`classifier`] - Partition A records by registry coverage
//! - [`inventory`] - Expected hostnames and live targets from the cluster
//! - [`report`] - Deletable, wrong-registry and needs-registration buckets
//! - [`providers`] - Route 53, Cloudflare and Cloud DNS adapters
//! - [`config`] - Command line flags and validation
//!
//! ## Example
//!
//! ```rust
//! use ednsctl::inventory::Inventory;
//! use ednsctl::normalize::RawRecordSet;
//! use ednsctl::registry::RegistrySettings;
//!
//! let settings = RegistrySettings::new("default", "");
//! let (result, report) = ednsctl::reconcile(
//!     &RawRecordSet::new(),
//!     &RawRecordSet::new(),
//!     &Inventory::default(),
//!     &settings,
//! );
//! assert!(result.registered.is_empty());
//! assert!(report.deletable.is_empty());
//! ```

use anyhow::{Context as _, Result};
use kube::Client;
use tracing::{debug, info};

use crate::classifier::{classify, ReconciliationResult};
use crate::config::Config;
use crate::errors::ProviderError;
use crate::inventory::{scan_cluster, Inventory};
use crate::normalize::{parse_records, parse_registry, RawRecordSet};
use crate::providers::{build_provider, DnsProvider};
use crate::registry::RegistrySettings;
use crate::report::{build_report, Report};

pub mod classifier;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inventory;
pub mod normalize;
pub mod pagination;
pub mod providers;
pub mod registry;
pub mod report;
pub mod retry;

/// Install `ring` as the process-wide rustls crypto provider.
///
/// kube and reqwest enable different rustls backends; one must be installed before
/// any client is built. Calling it again is a no-op.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Classify a zone snapshot against the cluster inventory and build the report.
///
/// Pure: no I/O, same inputs give the same output.
#[must_use]
pub fn reconcile(
    raw_records: &RawRecordSet,
    raw_registry: &RawRecordSet,
    inventory: &Inventory,
    settings: &RegistrySettings,
) -> (ReconciliationResult, Report) {
    let records = parse_records(raw_records);
    let registry = parse_registry(raw_registry, settings);
    debug!(
        records = records.len(),
        registry = registry.len(),
        "Normalized zone snapshot"
    );

    let result = classify(registry, records, settings);
    let report = build_report(
        &result,
        &inventory.expected_hosts,
        &inventory.valid_targets,
        settings,
    );
    (result, report)
}

/// Fetch the A records and TXT registry of the zone concurrently.
///
/// # Errors
///
/// Returns the first provider error; no partial snapshot is returned.
pub async fn fetch_zone(
    provider: &dyn DnsProvider,
) -> Result<(RawRecordSet, RawRecordSet), ProviderError> {
    let (records, registry) = tokio::try_join!(provider.get_records(), provider.get_registry())?;
    info!(
        provider = provider.name(),
        records = records.len(),
        registry = registry.len(),
        "Fetched zone snapshot"
    );
    Ok((records, registry))
}

/// Run one full verification: zone snapshot, cluster inventory, report.
///
/// # Errors
///
/// Returns an error if the provider cannot be built, or if the zone snapshot or the
/// cluster inventory cannot be collected.
pub async fn run(config: &Config, client: Client) -> Result<Report> {
    let provider = build_provider(config)?;
    let filter = config.host_filter();

    info!(
        provider = provider.name(),
        zone = %config.zone,
        owner = %config.registry.owner,
        prefix = %config.registry.prefix,
        "Starting registry verification"
    );

    let (snapshot, inventory) = tokio::try_join!(
        async {
            fetch_zone(provider.as_ref())
                .await
                .with_context(|| format!("Failed to read zone {}", config.zone))
        },
        scan_cluster(client, &filter),
    )?;
    let (raw_records, raw_registry) = snapshot;

    let (result, report) = reconcile(&raw_records, &raw_registry, &inventory, &config.registry);
    info!(
        registered = result.registered.len(),
        missing_registry = result.missing_registry.len(),
        external_registry = result.external_registry.len(),
        "Classified zone records"
    );

    Ok(report)
}
