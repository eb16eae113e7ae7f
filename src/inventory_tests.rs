// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `inventory.rs`

use crate::constants::ANNOTATION_HOSTNAME;
use crate::inventory::{ClusterResource, HostFilter, Inventory};
use k8s_openapi::api::core::v1::{LoadBalancerIngress, LoadBalancerStatus, Service, ServiceStatus};
use k8s_openapi::api::networking::v1::{
    Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressRule, IngressSpec,
    IngressStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

fn metadata(name: &str, namespace: &str, hostname: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        annotations: hostname.map(|h| {
            BTreeMap::from([(ANNOTATION_HOSTNAME.to_string(), h.to_string())])
        }),
        ..Default::default()
    }
}

fn create_test_service(
    name: &str,
    namespace: &str,
    hostname: Option<&str>,
    lb: Vec<(Option<&str>, Option<&str>)>,
) -> Service {
    Service {
        metadata: metadata(name, namespace, hostname),
        spec: None,
        status: Some(ServiceStatus {
            load_balancer: Some(LoadBalancerStatus {
                ingress: Some(
                    lb.into_iter()
                        .map(|(hostname, ip)| LoadBalancerIngress {
                            hostname: hostname.map(str::to_string),
                            ip: ip.map(str::to_string),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }),
    }
}

fn create_test_ingress(
    name: &str,
    namespace: &str,
    hostname: Option<&str>,
    rules: &[&str],
    ip: &str,
) -> Ingress {
    Ingress {
        metadata: metadata(name, namespace, hostname),
        spec: Some(IngressSpec {
            rules: Some(
                rules
                    .iter()
                    .map(|host| IngressRule {
                        host: Some((*host).to_string()),
                        http: None,
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: Some(IngressStatus {
            load_balancer: Some(IngressLoadBalancerStatus {
                ingress: Some(vec![IngressLoadBalancerIngress {
                    ip: Some(ip.to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }),
    }
}

fn filter() -> HostFilter {
    HostFilter::new("example.com", vec!["internal".to_string()])
}

#[test]
fn test_host_filter_suffix_match() {
    let filter = filter();

    assert!(filter.accepts("example.com"));
    assert!(filter.accepts("www.example.com"));
    assert!(filter.accepts("WWW.Example.COM."));
    assert!(!filter.accepts("www.notexample.com"));
    assert!(!filter.accepts("example.com.evil.org"));
}

#[test]
fn test_host_filter_ignored_subdomains() {
    let filter = filter();

    assert!(!filter.accepts("app.internal.example.com"));
    assert!(!filter.accepts("internal-api.example.com"));
    assert!(filter.accepts("app.public.example.com"));
}

#[test]
fn test_host_filter_empty_domain_accepts_nothing() {
    let filter = HostFilter::new("", Vec::new());

    assert!(!filter.accepts("www.example.com"));
}

#[test]
fn test_service_with_annotation() {
    let mut inventory = Inventory::default();
    let service = create_test_service(
        "web",
        "shop",
        Some("shop.example.com"),
        vec![(None, Some("1.2.3.4"))],
    );

    inventory.add_service(&service, &filter());

    assert_eq!(
        inventory.expected_hosts["shop.example.com"],
        vec![ClusterResource {
            name: "web".to_string(),
            namespace: "shop".to_string(),
            kind: "service".to_string(),
            target: "1.2.3.4".to_string(),
        }]
    );
    assert_eq!(inventory.valid_targets["1.2.3.4"], vec!["service/web"]);
}

#[test]
fn test_hostnames_are_lowercased() {
    let mut inventory = Inventory::default();
    let service = create_test_service(
        "web",
        "shop",
        Some("WWW.Example.com."),
        vec![(None, Some("1.2.3.4"))],
    );
    let ingress = create_test_ingress("api", "shop", None, &["API.Example.COM"], "5.6.7.8");

    inventory.add_service(&service, &filter());
    inventory.add_ingress(&ingress, &filter());

    let hosts: Vec<&str> = inventory.expected_hosts.keys().map(String::as_str).collect();
    assert_eq!(hosts, vec!["api.example.com", "www.example.com"]);
}

#[test]
fn test_service_without_annotation_only_records_target() {
    let mut inventory = Inventory::default();
    let service = create_test_service("db", "data", None, vec![(None, Some("10.0.0.9"))]);

    inventory.add_service(&service, &filter());

    assert!(inventory.expected_hosts.is_empty());
    assert_eq!(inventory.valid_targets["10.0.0.9"], vec!["service/db"]);
}

#[test]
fn test_load_balancer_hostname_preferred_over_ip() {
    let mut inventory = Inventory::default();
    let service = create_test_service(
        "web",
        "shop",
        Some("shop.example.com"),
        vec![(Some("lb-123.elb.amazonaws.com"), Some("1.2.3.4"))],
    );

    inventory.add_service(&service, &filter());

    assert_eq!(
        inventory.expected_hosts["shop.example.com"][0].target,
        "lb-123.elb.amazonaws.com"
    );
    assert!(inventory
        .valid_targets
        .contains_key("lb-123.elb.amazonaws.com"));
    assert!(!inventory.valid_targets.contains_key("1.2.3.4"));
}

#[test]
fn test_multiple_load_balancer_entries_have_no_target() {
    let mut inventory = Inventory::default();
    let service = create_test_service(
        "web",
        "shop",
        Some("shop.example.com"),
        vec![(None, Some("1.2.3.4")), (None, Some("1.2.3.5"))],
    );

    inventory.add_service(&service, &filter());

    assert_eq!(inventory.expected_hosts["shop.example.com"][0].target, "");
    assert!(inventory.valid_targets.is_empty());
}

#[test]
fn test_annotation_accepts_comma_separated_hosts() {
    let mut inventory = Inventory::default();
    let service = create_test_service(
        "web",
        "shop",
        Some("a.example.com, b.example.com.,c.other.org"),
        vec![(None, Some("1.2.3.4"))],
    );

    inventory.add_service(&service, &filter());

    let hosts: Vec<&str> = inventory.expected_hosts.keys().map(String::as_str).collect();
    assert_eq!(hosts, vec!["a.example.com", "b.example.com"]);
}

#[test]
fn test_ingress_hosts_from_rules() {
    let mut inventory = Inventory::default();
    let ingress = create_test_ingress(
        "frontend",
        "web",
        None,
        &["www.example.com", "api.internal.example.com", "www.other.org", ""],
        "5.6.7.8",
    );

    inventory.add_ingress(&ingress, &filter());

    assert_eq!(inventory.expected_hosts.len(), 1);
    let resources = &inventory.expected_hosts["www.example.com"];
    assert_eq!(resources[0].kind, "ingress");
    assert_eq!(resources[0].namespace, "web");
    assert_eq!(inventory.valid_targets["5.6.7.8"], vec!["ingress/frontend"]);
}

#[test]
fn test_ingress_annotation_overrides_rules() {
    let mut inventory = Inventory::default();
    let ingress = create_test_ingress(
        "frontend",
        "web",
        Some("shop.example.com"),
        &["www.example.com"],
        "5.6.7.8",
    );

    inventory.add_ingress(&ingress, &filter());

    assert!(inventory.expected_hosts.contains_key("shop.example.com"));
    assert!(!inventory.expected_hosts.contains_key("www.example.com"));
}

#[test]
fn test_shared_hostname_keeps_discovery_order() {
    let mut inventory = Inventory::default();
    let service = create_test_service(
        "web",
        "shop",
        Some("shop.example.com"),
        vec![(None, Some("1.2.3.4"))],
    );
    let ingress = create_test_ingress("frontend", "shop", None, &["shop.example.com"], "1.2.3.4");

    inventory.add_service(&service, &filter());
    inventory.add_ingress(&ingress, &filter());

    let kinds: Vec<&str> = inventory.expected_hosts["shop.example.com"]
        .iter()
        .map(|r| r.kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["service", "ingress"]);
    assert_eq!(
        inventory.valid_targets["1.2.3.4"],
        vec!["service/web", "ingress/frontend"]
    );
}

#[test]
fn test_merge_appends_in_order() {
    let mut first = Inventory::default();
    first.add_service(
        &create_test_service("a", "ns1", Some("x.example.com"), vec![(None, Some("1.1.1.1"))]),
        &filter(),
    );
    let mut second = Inventory::default();
    second.add_service(
        &create_test_service("b", "ns2", Some("x.example.com"), vec![(None, Some("1.1.1.1"))]),
        &filter(),
    );

    first.merge(second);

    let namespaces: Vec<&str> = first.expected_hosts["x.example.com"]
        .iter()
        .map(|r| r.namespace.as_str())
        .collect();
    assert_eq!(namespaces, vec!["ns1", "ns2"]);
    assert_eq!(first.valid_targets["1.1.1.1"], vec!["service/a", "service/b"]);
}
