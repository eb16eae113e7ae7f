// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration.
//!
//! Every flag can also be set through an `EDNSCTL_*` environment variable. Provider
//! credentials are read from the environment only (see [`crate::providers`]).
//! [`Cli::validate`] turns the parsed flags into an immutable [`Config`]; anything
//! missing for the selected provider is reported before any network call is made.

use std::path::PathBuf;

use clap::Parser;

use crate::constants::DEFAULT_REGISTRY_OWNER;
use crate::errors::ConfigError;
use crate::inventory::HostFilter;
use crate::normalize::strip_trailing_dot;
use crate::providers::ProviderKind;
use crate::registry::RegistrySettings;
use crate::report::OutputFormat;

/// Verify that the external-dns TXT registry, the DNS zone and the cluster agree.
///
/// ednsctl lists every ingress and service of the current Kubernetes cluster,
/// compares them with the A and TXT records of a DNS zone, and reports orphaned
/// records, records owned by another registry, and missing registry records.
#[derive(Parser, Debug, Clone)]
#[command(name = "ednsctl", version)]
pub struct Cli {
    /// DNS provider: route53, cloudflare or clouddns
    #[arg(long, env = "EDNSCTL_PROVIDER")]
    pub provider: ProviderKind,

    /// DNS zone name, e.g. example.com
    #[arg(short = 'z', long, env = "EDNSCTL_DNS_ZONE")]
    pub dns_zone: String,

    /// TXT registry owner id external-dns runs with (--txt-owner-id)
    #[arg(short = 'o', long, env = "EDNSCTL_OWNER", default_value = DEFAULT_REGISTRY_OWNER)]
    pub owner: String,

    /// TXT registry prefix external-dns runs with (--txt-prefix); empty for none
    #[arg(short = 'p', long, env = "EDNSCTL_PREFIX", default_value = "")]
    pub prefix: String,

    /// Subdomains to ignore (comma separated)
    #[arg(
        short = 'i',
        long,
        env = "EDNSCTL_IGNORED_SUBDOMAINS",
        value_delimiter = ','
    )]
    pub ignored_subdomains: Vec<String>,

    /// Cloud DNS managed zone name (clouddns only)
    #[arg(short = 'm', long, env = "EDNSCTL_MANAGED_ZONE")]
    pub managed_zone: Option<String>,

    /// GCP project of the managed zone (clouddns only)
    #[arg(long, env = "EDNSCTL_PROJECT")]
    pub project: Option<String>,

    /// Directory the artifact is written to
    #[arg(long, env = "EDNSCTL_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Artifact encoding
    #[arg(long, env = "EDNSCTL_OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Json)]
    pub output_format: OutputFormat,

    /// Only print the summary, do not write an artifact
    #[arg(long, env = "EDNSCTL_NO_ARTIFACT")]
    pub no_artifact: bool,
}

/// Cloud DNS location of the zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudDnsTarget {
    pub project: String,
    pub managed_zone: String,
}

/// Where and how the artifact is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

/// Validated, immutable run configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub provider: ProviderKind,
    /// Zone name without trailing dot
    pub zone: String,
    pub registry: RegistrySettings,
    pub ignored_subdomains: Vec<String>,
    /// Set only for the clouddns provider
    pub clouddns: Option<CloudDnsTarget>,
    /// `None` when no artifact should be written
    pub output: Option<OutputSettings>,
}

impl Config {
    /// Hostname filter for the cluster inventory.
    #[must_use]
    pub fn host_filter(&self) -> HostFilter {
        HostFilter::new(self.zone.clone(), self.ignored_subdomains.clone())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Cli {
    /// Check the flags and build the run configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the zone or owner is empty, or if the selected
    /// provider is missing a setting it requires.
    pub fn validate(self) -> Result<Config, ConfigError> {
        let zone = strip_trailing_dot(self.dns_zone.trim()).to_string();
        if zone.is_empty() {
            return Err(ConfigError::MissingSetting {
                setting: "--dns-zone".to_string(),
                provider: self.provider.to_string(),
            });
        }

        let owner = self.owner.trim().to_string();
        if owner.is_empty() {
            return Err(ConfigError::InvalidSetting {
                setting: "--owner".to_string(),
                reason: "owner id must not be empty".to_string(),
            });
        }
        if self.prefix.contains(',') || self.prefix.contains('=') {
            return Err(ConfigError::InvalidSetting {
                setting: "--prefix".to_string(),
                reason: "prefix must not contain ',' or '='".to_string(),
            });
        }

        let clouddns = match self.provider {
            ProviderKind::CloudDns => {
                let missing = |setting: &str| ConfigError::MissingSetting {
                    setting: setting.to_string(),
                    provider: ProviderKind::CloudDns.to_string(),
                };
                Some(CloudDnsTarget {
                    project: non_empty(self.project).ok_or_else(|| missing("--project"))?,
                    managed_zone: non_empty(self.managed_zone)
                        .ok_or_else(|| missing("--managed-zone"))?,
                })
            }
            ProviderKind::Route53 | ProviderKind::Cloudflare => None,
        };

        let ignored_subdomains = self
            .ignored_subdomains
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let output = (!self.no_artifact).then_some(OutputSettings {
            dir: self.output_dir,
            format: self.output_format,
        });

        Ok(Config {
            provider: self.provider,
            zone,
            registry: RegistrySettings::new(owner, self.prefix),
            ignored_subdomains,
            clouddns,
            output,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
