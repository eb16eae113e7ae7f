// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Report Builder.
//!
//! Combines a [`ReconciliationResult`] with the cluster inventory into three buckets:
//!
//! - **deletable**: A records without a registry record, not wanted by any cluster
//!   resource, yet still pointing at a live load-balancer target. These are leftovers
//!   of renamed or removed hostnames.
//! - **wrong registry**: hostnames the cluster wants that are already claimed by a
//!   registry record under another prefix.
//! - **needs registration**: hostnames the cluster wants that have no registry record
//!   at all, with the TXT record to create.
//!
//! Every bucket is sorted by name so that output is reproducible.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::ReconciliationResult;
use crate::constants::{ARTIFACT_FILE_PREFIX, ARTIFACT_TIMESTAMP_FORMAT, DEFAULT_TXT_RECORD_TTL_SECS};
use crate::inventory::{ExpectedHosts, ValidTargets};
use crate::registry::{encode, RegistrySettings};

/// A hostname the cluster expects that is owned by another registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongRegistry {
    pub hostname: String,
    /// On-the-wire name of the conflicting registry record
    pub external_name: String,
}

/// A TXT registry record to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtRecord {
    pub name: String,
    pub value: String,
    pub ttl: u32,
}

/// The three reconciliation buckets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub deletable: Vec<String>,
    pub wrong_registry: Vec<WrongRegistry>,
    pub needs_registration: Vec<TxtRecord>,
}

/// Persisted artifact: the TXT records that need to be created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtRecordSet {
    pub records: Vec<TxtRecord>,
}

/// Artifact encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

/// Build the report.
///
/// - A record in `missing_registry` is deletable when its name is not an expected
///   host and its target is a key of `valid_targets`.
/// - An expected host that is a key of `external_registry` is a wrong-registry
///   conflict, reported with the external record's prefixed name.
/// - Any other expected host missing from `registry` needs a TXT record named
///   `prefix + host`, encoded from the first resource that claims the host.
#[must_use]
pub fn build_report(
    result: &ReconciliationResult,
    expected: &ExpectedHosts,
    valid_targets: &ValidTargets,
    settings: &RegistrySettings,
) -> Report {
    let mut deletable: Vec<String> = result
        .missing_registry
        .iter()
        .filter(|record| !expected.contains_key(&record.name))
        .filter(|record| valid_targets.contains_key(&record.target))
        .map(|record| record.name.clone())
        .collect();
    deletable.sort();
    deletable.dedup();

    let mut wrong_registry = Vec::new();
    let mut needs_registration = Vec::new();

    for (hostname, resources) in expected {
        if let Some(external) = result.external_registry.get(hostname) {
            wrong_registry.push(WrongRegistry {
                hostname: hostname.clone(),
                external_name: external.name_with_prefix.clone(),
            });
            continue;
        }

        if result.registry.contains_key(hostname) {
            continue;
        }

        let Some(first) = resources.first() else {
            continue;
        };
        if resources.len() > 1 {
            debug!(
                hostname = %hostname,
                claimants = resources.len(),
                kind = %first.kind,
                namespace = %first.namespace,
                name = %first.name,
                "Several resources claim hostname, using the first"
            );
        }

        needs_registration.push(TxtRecord {
            name: format!("{}{hostname}", settings.prefix),
            value: encode(&settings.owner, &first.kind, &first.namespace, &first.name),
            ttl: DEFAULT_TXT_RECORD_TTL_SECS,
        });
    }

    wrong_registry.sort_by(|a, b| a.hostname.cmp(&b.hostname));
    needs_registration.sort_by(|a, b| a.name.cmp(&b.name));

    info!(
        deletable = deletable.len(),
        wrong_registry = wrong_registry.len(),
        needs_registration = needs_registration.len(),
        "Built reconciliation report"
    );

    Report {
        deletable,
        wrong_registry,
        needs_registration,
    }
}

/// Human-readable summary. Every bucket prints its count, including zero.
#[must_use]
pub fn render_summary(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "The following records can be deleted ({} items)",
        report.deletable.len()
    );
    for name in &report.deletable {
        let _ = writeln!(out, "{name}");
    }

    let _ = writeln!(
        out,
        "\nThe following records belong to the incorrect TXT registry ({} items)",
        report.wrong_registry.len()
    );
    for conflict in &report.wrong_registry {
        let _ = writeln!(out, "Record: {}", conflict.hostname);
        let _ = writeln!(out, "External TXT Record: {}", conflict.external_name);
    }

    let _ = writeln!(
        out,
        "\nThe following records need TXT registry records added ({} items)",
        report.needs_registration.len()
    );
    for record in &report.needs_registration {
        let _ = writeln!(out, "Record: {}", record.name);
        let _ = writeln!(out, "TXT Record Value: {}", record.value);
    }

    out
}

/// Path of the artifact written at `timestamp`.
#[must_use]
pub fn artifact_path(dir: &Path, format: OutputFormat, timestamp: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "{ARTIFACT_FILE_PREFIX}-{}.{}",
        timestamp.format(ARTIFACT_TIMESTAMP_FORMAT),
        format.extension()
    ))
}

/// Serialize the needs-registration records.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_artifact(report: &Report, format: OutputFormat) -> Result<String> {
    let artifact = TxtRecordSet {
        records: report.needs_registration.clone(),
    };
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&artifact).context("Failed to encode artifact as JSON")
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(&artifact).context("Failed to encode artifact as YAML")
        }
    }
}

/// Write the needs-registration records to `<dir>/ednsctl-<timestamp>.<ext>`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be written.
pub fn write_artifact(
    report: &Report,
    dir: &Path,
    format: OutputFormat,
    timestamp: DateTime<Utc>,
) -> Result<PathBuf> {
    let path = artifact_path(dir, format, timestamp);
    let contents = render_artifact(report, format)?;

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write artifact {}", path.display()))?;

    info!(path = %path.display(), records = report.needs_registration.len(), "Wrote artifact");
    Ok(path)
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
