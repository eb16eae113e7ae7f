// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for ednsctl.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// TXT Registry Constants
// ============================================================================

/// Heritage value written by external-dns into every registry record
pub const REGISTRY_HERITAGE: &str = "external-dns";

/// Registry TXT key carrying the heritage marker
pub const REGISTRY_KEY_HERITAGE: &str = "heritage";

/// Registry TXT key carrying the owner id
pub const REGISTRY_KEY_OWNER: &str = "external-dns/owner";

/// Registry TXT key carrying the `kind/namespace/name` of the owning resource
pub const REGISTRY_KEY_RESOURCE: &str = "external-dns/resource";

/// Owner id used when none is configured (matches the external-dns default)
pub const DEFAULT_REGISTRY_OWNER: &str = "default";

/// TTL for TXT registry records proposed by the report (5 minutes)
pub const DEFAULT_TXT_RECORD_TTL_SECS: u32 = 300;

// ============================================================================
// DNS Record Types
// ============================================================================

/// Record type of the managed address records
pub const RECORD_TYPE_A: &str = "A";

/// Record type of the ownership registry records
pub const RECORD_TYPE_TXT: &str = "TXT";

// ============================================================================
// Raw Field Map Keys
// ============================================================================

/// Field map key for the on-the-wire record name
pub const FIELD_NAME: &str = "name";

/// Field map key for the record type
pub const FIELD_TYPE: &str = "type";

/// Field map key for the A record target
pub const FIELD_TARGET: &str = "target";

/// Field map key for the raw TXT value
pub const FIELD_VALUE: &str = "value";

// ============================================================================
// Kubernetes Constants
// ============================================================================

/// Annotation external-dns reads a hostname (or comma separated hostnames) from
pub const ANNOTATION_HOSTNAME: &str = "external-dns.alpha.kubernetes.io/hostname";

/// Resource kind recorded for `Service` objects
pub const KIND_SERVICE: &str = "service";

/// Resource kind recorded for `Ingress` objects
pub const KIND_INGRESS: &str = "ingress";

/// Page size for paginated Kubernetes list calls
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

/// Number of namespaces scanned concurrently
pub const NAMESPACE_SCAN_CONCURRENCY: usize = 4;

// ============================================================================
// Provider API Constants
// ============================================================================

/// Route 53 API endpoint (global service)
pub const ROUTE53_API_URL: &str = "https://route53.amazonaws.com";

/// Route 53 API version path segment
pub const ROUTE53_API_VERSION: &str = "2013-04-01";

/// Region used to sign Route 53 requests
pub const ROUTE53_SIGNING_REGION: &str = "us-east-1";

/// Service name used to sign Route 53 requests
pub const ROUTE53_SIGNING_SERVICE: &str = "route53";

/// Cloudflare v4 API endpoint
pub const CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Page size for Cloudflare DNS record listing
pub const CLOUDFLARE_PAGE_SIZE: u32 = 100;

/// Google Cloud DNS v1 API endpoint
pub const CLOUDDNS_API_URL: &str = "https://dns.googleapis.com/dns/v1";

/// Timeout for a single provider HTTP request
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Output Constants
// ============================================================================

/// File name prefix of the persisted registry artifact
pub const ARTIFACT_FILE_PREFIX: &str = "ednsctl";

/// Timestamp format embedded in artifact file names
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;
