// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `providers/route53.rs`

#[cfg(test)]
mod tests {
    use crate::providers::route53::{
        a_records, canonical_query_string, find_hosted_zone_id, sign_request, txt_records,
        AwsCredentials, ListHostedZonesByNameResponse, ListResourceRecordSetsResponse, Route53,
    };
    use crate::providers::DnsProvider;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOSTED_ZONES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListHostedZonesByNameResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <HostedZones>
    <HostedZone>
      <Id>/hostedzone/Z0EXAMPLEORG</Id>
      <Name>example.com.org.</Name>
      <CallerReference>a</CallerReference>
    </HostedZone>
    <HostedZone>
      <Id>/hostedzone/Z1EXAMPLE</Id>
      <Name>example.com.</Name>
      <CallerReference>b</CallerReference>
    </HostedZone>
  </HostedZones>
  <DNSName>example.com</DNSName>
  <IsTruncated>false</IsTruncated>
  <MaxItems>100</MaxItems>
</ListHostedZonesByNameResponse>"#;

    const PAGE_ONE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ResourceRecordSets>
    <ResourceRecordSet>
      <Name>www.example.com.</Name>
      <Type>A</Type>
      <TTL>300</TTL>
      <ResourceRecords>
        <ResourceRecord><Value>1.2.3.4</Value></ResourceRecord>
      </ResourceRecords>
    </ResourceRecordSet>
    <ResourceRecordSet>
      <Name>www.example.com.</Name>
      <Type>TXT</Type>
      <TTL>300</TTL>
      <ResourceRecords>
        <ResourceRecord><Value>"heritage=external-dns,external-dns/owner=default,external-dns/resource=ingress/web/www"</Value></ResourceRecord>
      </ResourceRecords>
    </ResourceRecordSet>
  </ResourceRecordSets>
  <IsTruncated>true</IsTruncated>
  <NextRecordName>shop.example.com.</NextRecordName>
  <NextRecordType>A</NextRecordType>
  <MaxItems>2</MaxItems>
</ListResourceRecordSetsResponse>"#;

    const PAGE_TWO_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ResourceRecordSets>
    <ResourceRecordSet>
      <Name>shop.example.com.</Name>
      <Type>A</Type>
      <AliasTarget>
        <HostedZoneId>Z35SXDOTRQ7X7K</HostedZoneId>
        <DNSName>lb-123.us-east-1.elb.amazonaws.com.</DNSName>
        <EvaluateTargetHealth>false</EvaluateTargetHealth>
      </AliasTarget>
    </ResourceRecordSet>
    <ResourceRecordSet>
      <Name>example.com.</Name>
      <Type>TXT</Type>
      <TTL>300</TTL>
      <ResourceRecords>
        <ResourceRecord><Value>"v=spf1 -all"</Value></ResourceRecord>
        <ResourceRecord><Value>"google-site-verification=abc"</Value></ResourceRecord>
      </ResourceRecords>
    </ResourceRecordSet>
    <ResourceRecordSet>
      <Name>example.com.</Name>
      <Type>NS</Type>
      <TTL>172800</TTL>
      <ResourceRecords>
        <ResourceRecord><Value>ns-1.awsdns-00.com.</Value></ResourceRecord>
      </ResourceRecords>
    </ResourceRecordSet>
  </ResourceRecordSets>
  <IsTruncated>false</IsTruncated>
  <MaxItems>2</MaxItems>
</ListResourceRecordSetsResponse>"#;

    fn credentials(session_token: Option<&str>) -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: session_token.map(str::to_string),
        }
    }

    fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<&str, &str> = vars.iter().copied().collect();
        move |key| vars.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn test_find_hosted_zone_requires_exact_name() {
        let response: ListHostedZonesByNameResponse =
            quick_xml::de::from_str(HOSTED_ZONES_XML).unwrap();

        assert_eq!(
            find_hosted_zone_id(&response, "example.com"),
            Some("Z1EXAMPLE".to_string())
        );
        assert_eq!(find_hosted_zone_id(&response, "example.org"), None);
    }

    #[test]
    fn test_record_sets_page_parsing() {
        let response: ListResourceRecordSetsResponse =
            quick_xml::de::from_str(PAGE_ONE_XML).unwrap();

        assert!(response.is_truncated);
        assert_eq!(response.next_record_name.as_deref(), Some("shop.example.com."));
        assert_eq!(response.next_record_type.as_deref(), Some("A"));
        assert_eq!(response.resource_record_sets.items.len(), 2);
    }

    #[test]
    fn test_a_records_use_alias_or_single_value() {
        let mut record_sets = Vec::new();
        for xml in [PAGE_ONE_XML, PAGE_TWO_XML] {
            let page: ListResourceRecordSetsResponse = quick_xml::de::from_str(xml).unwrap();
            record_sets.extend(page.resource_record_sets.items);
        }

        let records = a_records(&record_sets);

        assert_eq!(records.len(), 2);
        assert_eq!(records["www.example.com."]["target"], "1.2.3.4");
        assert_eq!(
            records["shop.example.com."]["target"],
            "lb-123.us-east-1.elb.amazonaws.com"
        );
        assert_eq!(records["shop.example.com."]["type"], "A");
    }

    #[test]
    fn test_txt_records_keep_single_value_sets_only() {
        let mut record_sets = Vec::new();
        for xml in [PAGE_ONE_XML, PAGE_TWO_XML] {
            let page: ListResourceRecordSetsResponse = quick_xml::de::from_str(xml).unwrap();
            record_sets.extend(page.resource_record_sets.items);
        }

        let registry = txt_records(&record_sets);

        assert_eq!(registry.len(), 1);
        assert!(registry["www.example.com."]["value"].starts_with("\"heritage=external-dns"));
    }

    #[test]
    fn test_canonical_query_string_sorts_and_encodes() {
        let params = BTreeMap::from([
            ("type".to_string(), "A".to_string()),
            ("name".to_string(), "*.example.com.".to_string()),
        ]);

        assert_eq!(
            canonical_query_string(&params),
            "name=%2A.example.com.&type=A"
        );
        assert_eq!(canonical_query_string(&BTreeMap::new()), "");
    }

    #[test]
    fn test_sign_request_headers() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        let headers = sign_request(
            &credentials(None),
            "route53.amazonaws.com",
            "/2013-04-01/hostedzonesbyname",
            "dnsname=example.com",
            now,
        )
        .unwrap();
        let headers: BTreeMap<&str, String> = headers.into_iter().collect();

        assert_eq!(headers["x-amz-date"], "20240115T120000Z");
        let auth = &headers["authorization"];
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240115/us-east-1/route53/aws4_request, "
        ));
        assert!(auth.contains("SignedHeaders=host;x-amz-date, "));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!headers.contains_key("x-amz-security-token"));
    }

    #[test]
    fn test_sign_request_is_deterministic_and_covers_session_token() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let sign = |creds: &AwsCredentials| {
            sign_request(creds, "route53.amazonaws.com", "/", "", now).unwrap()
        };

        assert_eq!(sign(&credentials(None)), sign(&credentials(None)));

        let with_token: BTreeMap<&str, String> =
            sign(&credentials(Some("token"))).into_iter().collect();
        assert_eq!(with_token["x-amz-security-token"], "token");
        assert!(with_token["authorization"]
            .contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = AwsCredentials::from_lookup(lookup(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI"),
            ("AWS_SESSION_TOKEN", ""),
        ]))
        .unwrap();

        assert_eq!(creds.access_key_id, "AKID");
        assert_eq!(creds.secret_access_key, "wJalrXUtnFEMI");
        assert_eq!(creds.session_token, None);
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn test_credentials_missing_secret() {
        let err = AwsCredentials::from_lookup(lookup(&[("AWS_ACCESS_KEY_ID", "AKID")])).unwrap_err();

        assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));
    }

    #[tokio::test]
    async fn test_route53_lists_zone_once_across_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2013-04-01/hostedzonesbyname"))
            .and(query_param("dnsname", "example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HOSTED_ZONES_XML))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2013-04-01/hostedzone/Z1EXAMPLE/rrset"))
            .and(query_param_is_missing("name"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_ONE_XML))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2013-04-01/hostedzone/Z1EXAMPLE/rrset"))
            .and(query_param("name", "shop.example.com."))
            .and(query_param("type", "A"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_TWO_XML))
            .expect(1)
            .mount(&server)
            .await;

        let provider = Route53::new("example.com.", credentials(None))
            .unwrap()
            .with_base_url(server.uri());

        let (records, registry) = crate::fetch_zone(&provider).await.unwrap();
        let again = provider.get_records().await.unwrap();

        assert_eq!(provider.name(), "route53");
        assert_eq!(records.len(), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(again, records);
    }

    #[tokio::test]
    async fn test_route53_missing_zone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2013-04-01/hostedzonesbyname"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HOSTED_ZONES_XML))
            .mount(&server)
            .await;

        let provider = Route53::new("example.net", credentials(None))
            .unwrap()
            .with_base_url(server.uri());

        let err = provider.get_records().await.unwrap_err();

        assert!(matches!(err, crate::errors::ProviderError::ZoneNotFound { .. }));
    }
}
