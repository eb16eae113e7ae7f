// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster inventory: which hostnames the cluster expects, and which load-balancer
//! targets are still live.
//!
//! Every namespace is scanned for `Service` and `Ingress` objects. Each object's
//! load-balancer address becomes its target. Hostnames come from the
//! `external-dns.alpha.kubernetes.io/hostname` annotation or, for ingresses without
//! that annotation, from the ingress rules. Only hostnames inside the configured zone
//! and outside every ignored subdomain are kept.
//!
//! The scan always completes (every page, every namespace) before the inventory is
//! handed over; a failed list call fails the whole scan.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::{Namespace, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::constants::{ANNOTATION_HOSTNAME, KIND_INGRESS, KIND_SERVICE, NAMESPACE_SCAN_CONCURRENCY};
use crate::errors::InventoryError;
use crate::normalize::{canonical_name, strip_trailing_dot};
use crate::pagination::list_all_paginated;

/// One Kubernetes object believed to expose a hostname.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClusterResource {
    pub name: String,
    pub namespace: String,
    /// `service` or `ingress`
    pub kind: String,
    /// Load-balancer hostname or IP, empty when the object has none
    pub target: String,
}

/// Hostname -> resources claiming it, in discovery order.
pub type ExpectedHosts = BTreeMap<String, Vec<ClusterResource>>;

/// Load-balancer target -> `kind/name` of every object it backs.
pub type ValidTargets = BTreeMap<String, Vec<String>>;

/// Domain and ignored-subdomain filter applied to every derived hostname.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostFilter {
    /// Zone the hostnames must belong to
    pub domain: String,
    /// Hostnames containing any of these are dropped
    pub ignored_subdomains: Vec<String>,
}

impl HostFilter {
    pub fn new(domain: impl Into<String>, ignored_subdomains: Vec<String>) -> Self {
        Self {
            domain: strip_trailing_dot(&domain.into()).to_string(),
            ignored_subdomains,
        }
    }

    /// Whether `host` is inside the zone and not under an ignored subdomain.
    ///
    /// The zone match is a case-insensitive suffix match on a label boundary: the
    /// host equals the zone or ends with `"." + zone`.
    #[must_use]
    pub fn accepts(&self, host: &str) -> bool {
        let host = canonical_name(host);
        let domain = self.domain.to_ascii_lowercase();

        let in_zone = !domain.is_empty()
            && (host == domain || host.ends_with(&format!(".{domain}")));
        if !in_zone {
            return false;
        }

        !self
            .ignored_subdomains
            .iter()
            .filter(|sub| !sub.is_empty())
            .any(|sub| host.contains(&sub.to_ascii_lowercase()))
    }
}

/// Expected hostnames and live targets collected from the cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub expected_hosts: ExpectedHosts,
    pub valid_targets: ValidTargets,
}

impl Inventory {
    /// Record a service.
    ///
    /// Services only expose hostnames through the hostname annotation.
    pub fn add_service(&mut self, service: &Service, filter: &HostFilter) {
        let target = service
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_deref())
            .map(|entries| {
                single_target(entries.iter().map(|e| (e.hostname.as_deref(), e.ip.as_deref())))
            })
            .unwrap_or_default();

        let hosts = annotation_hosts(service.annotations(), filter);
        self.add(service, KIND_SERVICE, target, hosts);
    }

    /// Record an ingress.
    ///
    /// The hostname annotation wins; without it every rule host is used.
    pub fn add_ingress(&mut self, ingress: &Ingress, filter: &HostFilter) {
        let target = ingress
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_deref())
            .map(|entries| {
                single_target(entries.iter().map(|e| (e.hostname.as_deref(), e.ip.as_deref())))
            })
            .unwrap_or_default();

        let hosts = if ingress.annotations().contains_key(ANNOTATION_HOSTNAME) {
            annotation_hosts(ingress.annotations(), filter)
        } else {
            ingress
                .spec
                .as_ref()
                .and_then(|spec| spec.rules.as_deref())
                .unwrap_or_default()
                .iter()
                .filter_map(|rule| rule.host.as_deref())
                .filter(|host| !host.is_empty() && filter.accepts(host))
                .map(canonical_name)
                .collect()
        };

        self.add(ingress, KIND_INGRESS, target, hosts);
    }

    fn add<K: ResourceExt>(&mut self, object: &K, kind: &str, target: String, hosts: Vec<String>) {
        let name = object.name_any();

        if !target.is_empty() {
            self.valid_targets
                .entry(target.clone())
                .or_default()
                .push(format!("{kind}/{name}"));
        }

        for host in hosts {
            debug!(host = %host, kind = kind, name = %name, target = %target, "Cluster expects hostname");
            self.expected_hosts
                .entry(host)
                .or_default()
                .push(ClusterResource {
                    name: name.clone(),
                    namespace: object.namespace().unwrap_or_default(),
                    kind: kind.to_string(),
                    target: target.clone(),
                });
        }
    }

    /// Fold another inventory in, appending after the entries already present.
    pub fn merge(&mut self, other: Inventory) {
        for (host, resources) in other.expected_hosts {
            self.expected_hosts.entry(host).or_default().extend(resources);
        }
        for (target, owners) in other.valid_targets {
            self.valid_targets.entry(target).or_default().extend(owners);
        }
    }
}

/// Target of an object with exactly one load-balancer entry: hostname if set, else IP.
fn single_target<'a>(mut entries: impl Iterator<Item = (Option<&'a str>, Option<&'a str>)>) -> String {
    match (entries.next(), entries.next()) {
        (Some((hostname, ip)), None) => hostname
            .filter(|h| !h.is_empty())
            .or(ip)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Hostnames listed in the hostname annotation that pass the filter.
fn annotation_hosts(annotations: &BTreeMap<String, String>, filter: &HostFilter) -> Vec<String> {
    annotations
        .get(ANNOTATION_HOSTNAME)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty() && filter.accepts(host))
                .map(canonical_name)
                .collect()
        })
        .unwrap_or_default()
}

/// Scan one namespace: services first, then ingresses.
async fn scan_namespace(client: Client, namespace: String, filter: &HostFilter) -> Result<Inventory> {
    let services: Api<Service> = Api::namespaced(client.clone(), &namespace);
    let ingresses: Api<Ingress> = Api::namespaced(client, &namespace);

    let services = list_all_paginated(&services, ListParams::default())
        .await
        .map_err(|source| InventoryError::ListFailed {
            resource: "services".to_string(),
            scope: namespace.clone(),
            source,
        })?;
    let ingresses = list_all_paginated(&ingresses, ListParams::default())
        .await
        .map_err(|source| InventoryError::ListFailed {
            resource: "ingresses".to_string(),
            scope: namespace.clone(),
            source,
        })?;

    let mut inventory = Inventory::default();
    for service in &services {
        inventory.add_service(service, filter);
    }
    for ingress in &ingresses {
        inventory.add_ingress(ingress, filter);
    }

    debug!(
        namespace = %namespace,
        services = services.len(),
        ingresses = ingresses.len(),
        hosts = inventory.expected_hosts.len(),
        "Scanned namespace"
    );

    Ok(inventory)
}

/// Scan every namespace of the cluster.
///
/// Namespaces are scanned concurrently but merged in API order, so the resulting
/// inventory (and the "first resource" per hostname) is deterministic.
///
/// # Errors
///
/// Returns an error if any namespace, service or ingress list call fails after retries.
pub async fn scan_cluster(client: Client, filter: &HostFilter) -> Result<Inventory> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let namespaces = list_all_paginated(&namespaces, ListParams::default())
        .await
        .map_err(|source| InventoryError::ListFailed {
            resource: "namespaces".to_string(),
            scope: "cluster".to_string(),
            source,
        })?;

    let names: Vec<String> = namespaces.iter().map(ResourceExt::name_any).collect();
    info!(namespaces = names.len(), domain = %filter.domain, "Scanning cluster for expected hostnames");

    let inventories: Vec<Inventory> = stream::iter(names)
        .map(|namespace| scan_namespace(client.clone(), namespace, filter))
        .buffered(NAMESPACE_SCAN_CONCURRENCY)
        .try_collect()
        .await
        .context("Failed to scan cluster inventory")?;

    let mut inventory = Inventory::default();
    for part in inventories {
        inventory.merge(part);
    }

    info!(
        expected_hosts = inventory.expected_hosts.len(),
        valid_targets = inventory.valid_targets.len(),
        "Cluster inventory complete"
    );

    Ok(inventory)
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod inventory_tests;
