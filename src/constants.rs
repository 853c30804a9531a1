// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for kube2clouddns.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Record Constants
// ============================================================================

/// The only record type this controller manages
pub const RECORD_TYPE_A: &str = "A";

/// Default TTL for published service records (1 minute)
pub const DEFAULT_DNS_RECORD_TTL_SECS: u32 = 60;

// ============================================================================
// Cloud DNS API Constants
// ============================================================================

/// Base URL of the Cloud DNS v1 REST API
pub const DEFAULT_CLOUD_DNS_ENDPOINT: &str = "https://dns.googleapis.com/dns/v1";

/// Default OAuth2 token endpoint used when the service account key does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth2 scope granting read/write access to Cloud DNS
pub const CLOUD_DNS_SCOPE: &str = "https://www.googleapis.com/auth/ndev.clouddns.readwrite";

/// Grant type for the service account JWT bearer flow
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for signed service account assertions (1 hour, the maximum allowed)
pub const JWT_ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh cached access tokens this long before they expire
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Change status reported while a change is still being applied
pub const CHANGE_STATUS_PENDING: &str = "pending";

/// Change status reported once a change has been applied
pub const CHANGE_STATUS_DONE: &str = "done";

// ============================================================================
// HTTP Transport Constants
// ============================================================================

/// Default timeout for a single HTTP request to the DNS backend
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every DNS backend request
pub const USER_AGENT: &str = concat!("kube2clouddns/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Change Polling Constants
// ============================================================================

/// Delay before the first status poll of a submitted change
pub const DEFAULT_CHANGE_POLL_INTERVAL_MILLIS: u64 = 1000;

/// Upper bound for the delay between two status polls
pub const MAX_CHANGE_POLL_INTERVAL_SECS: u64 = 10;

/// Growth factor applied to the poll delay after each pending status
pub const CHANGE_POLL_MULTIPLIER: f64 = 1.5;

/// Give up waiting for a pending change after this long (5 minutes)
pub const DEFAULT_CHANGE_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Event Source Constants
// ============================================================================

/// Namespace watched when no namespace is configured
pub const DEFAULT_WATCH_NAMESPACE: &str = "default";

/// Interval at which every known service is re-delivered (30 minutes)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 1800;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;

/// Thread name prefix for Tokio worker threads
pub const TOKIO_THREAD_NAME: &str = "kube2clouddns";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint served next to the metrics
pub const HEALTH_SERVER_PATH: &str = "/healthz";
