// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for DNS backend and reconciliation operations.
//!
//! This module provides specialized error types for:
//! - Zone resolution (no zone or several equally specific zones for the domain)
//! - Record input that can never be applied (zero TTL)
//! - Submitted changes that fail or never leave the pending state
//! - Cloud DNS HTTP API failures
//! - Service account authentication failures
//!
//! All of them compose into [`DnsError`], which is what the reconciler returns
//! and what the dispatcher logs and counts.

use thiserror::Error;

/// Errors that can occur while resolving the managed zone for the configured domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// No managed zone in the project is authoritative for the domain
    ///
    /// Needs operator intervention: either the domain flag is wrong or the zone
    /// was never created in the project.
    #[error("No managed zone in project '{project}' matches domain '{domain}'")]
    ZoneNotFound {
        /// The configured domain (without trailing dot)
        domain: String,
        /// The provider project that was searched
        project: String,
    },

    /// More than one zone shares the most specific matching DNS suffix
    ///
    /// Happens with split-horizon setups where a public and a private zone carry
    /// the same DNS name.
    #[error("Managed zones {zones:?} are equally specific for domain '{domain}'")]
    AmbiguousZone {
        /// The configured domain (without trailing dot)
        domain: String,
        /// Names of the zones that tied
        zones: Vec<String>,
    },
}

/// Errors caused by record input that the backend would never accept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// TTL must be a positive number of seconds
    #[error("Invalid TTL {ttl} for record '{fqdn}': TTL must be positive")]
    InvalidTtl {
        /// Fully qualified record name
        fqdn: String,
        /// The rejected TTL
        ttl: u32,
    },
}

/// Errors raised while waiting for a submitted change to be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeError {
    /// The change left the pending state with a status other than `done`
    #[error("Change {change_id} in zone '{zone}' finished with unexpected status '{status}'")]
    ChangeFailed {
        /// Zone the change was submitted to
        zone: String,
        /// Backend-assigned change id
        change_id: String,
        /// Terminal status reported by the backend
        status: String,
    },

    /// The change was still pending when the poll deadline passed
    #[error("Change {change_id} in zone '{zone}' still pending after {waited_secs}s")]
    ChangeTimeout {
        /// Zone the change was submitted to
        zone: String,
        /// Backend-assigned change id
        change_id: String,
        /// Time spent waiting, in seconds
        waited_secs: u64,
    },
}

/// Errors returned by the Cloud DNS HTTP API or the transport underneath it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response (DNS, TCP, TLS failure)
    #[error("HTTP connection to {endpoint} failed: {reason}")]
    HttpConnectionFailed {
        /// URL that could not be reached
        endpoint: String,
        /// Transport error message
        reason: String,
    },

    /// The request exceeded the configured transport timeout
    #[error("HTTP request to {endpoint} timed out")]
    HttpRequestTimeout {
        /// URL that timed out
        endpoint: String,
    },

    /// The API answered with a non-success status code
    #[error("Unexpected HTTP response from {endpoint}: {status_code} {reason}")]
    UnexpectedHttpResponse {
        /// URL that returned the error
        endpoint: String,
        /// HTTP status code
        status_code: u16,
        /// Response body or error message
        reason: String,
    },

    /// The API answered with a body that could not be decoded
    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse {
        /// URL that returned the body
        endpoint: String,
        /// Decoding error message
        reason: String,
    },
}

/// Errors related to service account authentication against the OAuth2 token endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The service account key file is not a usable service account key
    #[error("Invalid service account key: {reason}")]
    InvalidServiceAccountKey {
        /// What is wrong with the key
        reason: String,
    },

    /// The JWT assertion could not be signed with the private key
    #[error("Failed to sign token assertion for {client_email}: {reason}")]
    TokenSigningFailed {
        /// Service account identity
        client_email: String,
        /// Signing error message
        reason: String,
    },

    /// The token endpoint refused the assertion or could not be reached
    #[error("Token exchange with {token_uri} failed: {reason}")]
    TokenExchangeFailed {
        /// Token endpoint URL
        token_uri: String,
        /// Response body or transport error
        reason: String,
        /// HTTP status code, if a response was received
        status_code: Option<u16>,
    },
}

/// Composite error type that encompasses all DNS operation errors.
///
/// This is the error type returned by the zone resolver, the record reconciler,
/// and every [`crate::backend::DnsBackend`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// Zone resolution error
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// Invalid record input
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Submitted change failed or timed out
    #[error(transparent)]
    Change(#[from] ChangeError),

    /// Cloud DNS API or transport failure
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Service account authentication failure
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl DnsError {
    /// Returns true if this error is transient and a later attempt may succeed.
    ///
    /// Nothing retries automatically; the classification only drives log severity.
    /// A later event for the same Service (organic or resync) is the retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend(
                BackendError::HttpConnectionFailed { .. } | BackendError::HttpRequestTimeout { .. },
            )
            | Self::Change(ChangeError::ChangeTimeout { .. }) => true,

            Self::Backend(BackendError::UnexpectedHttpResponse { status_code, .. })
            | Self::Auth(AuthError::TokenExchangeFailed {
                status_code: Some(status_code),
                ..
            }) => crate::retry::is_retryable_status_code(*status_code),

            Self::Auth(AuthError::TokenExchangeFailed {
                status_code: None, ..
            }) => true,

            Self::Zone(_)
            | Self::Record(_)
            | Self::Change(ChangeError::ChangeFailed { .. })
            | Self::Backend(BackendError::InvalidResponse { .. })
            | Self::Auth(
                AuthError::InvalidServiceAccountKey { .. } | AuthError::TokenSigningFailed { .. },
            ) => false,
        }
    }

    /// Returns a short, stable reason code for this error.
    ///
    /// Used as a structured log field and as a metrics label.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Zone(ZoneError::ZoneNotFound { .. }) => "ZoneNotFound",
            Self::Zone(ZoneError::AmbiguousZone { .. }) => "AmbiguousZone",

            Self::Record(RecordError::InvalidTtl { .. }) => "InvalidTtl",

            Self::Change(ChangeError::ChangeFailed { .. }) => "ChangeFailed",
            Self::Change(ChangeError::ChangeTimeout { .. }) => "ChangeTimeout",

            Self::Backend(BackendError::HttpConnectionFailed { .. }) => "HttpConnectionFailed",
            Self::Backend(BackendError::HttpRequestTimeout { .. }) => "HttpRequestTimeout",
            Self::Backend(BackendError::UnexpectedHttpResponse { .. }) => "UnexpectedHttpResponse",
            Self::Backend(BackendError::InvalidResponse { .. }) => "InvalidResponse",

            Self::Auth(AuthError::InvalidServiceAccountKey { .. }) => "InvalidServiceAccountKey",
            Self::Auth(AuthError::TokenSigningFailed { .. }) => "TokenSigningFailed",
            Self::Auth(AuthError::TokenExchangeFailed { .. }) => "TokenExchangeFailed",
        }
    }
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
