// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `registry.rs`

use super::*;

#[test]
fn test_decode_full_registry_value() {
    let record = decode(
        "\"heritage=external-dns,external-dns/owner=team1,external-dns/resource=ingress/ns1/svc1\"",
    )
    .unwrap();

    assert_eq!(record.heritage, "external-dns");
    assert_eq!(record.owner, "team1");
    assert_eq!(record.resource, "ingress/ns1/svc1");
    assert!(record.name_with_prefix.is_empty());
    assert!(record.name_without_prefix.is_empty());
}

#[test]
fn test_decode_partial_value_is_accepted() {
    // Older external-dns versions only wrote heritage and owner
    let record = decode("\"heritage=external-dns,external-dns/owner=default\"").unwrap();

    assert_eq!(record.owner, "default");
    assert_eq!(record.resource, "");
}

#[test]
fn test_decode_rejects_arbitrary_txt() {
    let err = decode("\"not-a-registry-record\"").unwrap_err();

    assert_eq!(
        err,
        RegistryError::NotARegistryRecord {
            content: "\"not-a-registry-record\"".to_string()
        }
    );
}

#[test]
fn test_decode_rejects_unknown_key() {
    assert!(decode("\"heritage=external-dns,v=spf1\"").is_err());
    assert!(decode("\"google-site-verification=abc123\"").is_err());
}

#[test]
fn test_decode_rejects_field_with_two_equals() {
    assert!(decode("\"heritage=external-dns=extra\"").is_err());
}

#[test]
fn test_decode_rejects_field_without_equals() {
    assert!(decode("\"heritage=external-dns,owner\"").is_err());
}

#[test]
fn test_decode_rejects_empty_and_short_values() {
    assert!(decode("").is_err());
    assert!(decode("\"").is_err());
    assert!(decode("\"\"").is_err());
}

#[test]
fn test_decode_strips_first_and_last_character_unconditionally() {
    // Cloudflare returns TXT content without quotes; the first and last characters
    // are still dropped, which breaks the key and value at the edges
    assert!(decode("heritage=external-dns").is_err());
}

#[test]
fn test_encode_format() {
    assert_eq!(
        encode("default", "service", "web", "frontend"),
        "heritage=external-dns,external-dns/owner=default,external-dns/resource=service/web/frontend"
    );
}

#[test]
fn test_encode_then_decode_preserves_owner_and_resource() {
    let cases = [
        ("team1", "ingress", "ns1", "svc1"),
        ("default", "service", "kube-system", "nginx-ingress"),
        ("prod-cluster", "ingress", "a", "b"),
    ];

    for (owner, kind, namespace, name) in cases {
        let value = format!("\"{}\"", encode(owner, kind, namespace, name));
        let record = decode(&value).unwrap();

        assert_eq!(record.heritage, REGISTRY_HERITAGE);
        assert_eq!(record.owner, owner);
        assert_eq!(record.resource, format!("{kind}/{namespace}/{name}"));
    }
}

#[test]
fn test_with_names_sets_both_names() {
    let record = RegistryRecord::default().with_names("reg-www.example.com", "www.example.com");

    assert_eq!(record.name_with_prefix, "reg-www.example.com");
    assert_eq!(record.name_without_prefix, "www.example.com");
}

#[test]
fn test_registry_settings_default() {
    let settings = RegistrySettings::default();

    assert_eq!(settings.owner, "default");
    assert_eq!(settings.prefix, "");
}

#[test]
fn test_registry_settings_prefix_is_lowercased() {
    let settings = RegistrySettings::new("Team-A", "REG-");

    assert_eq!(settings.owner, "Team-A");
    assert_eq!(settings.prefix, "reg-");
    assert!(settings.owns("reg-www.example.com"));
}
