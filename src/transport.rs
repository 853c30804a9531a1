// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared HTTP transport settings.
//!
//! One [`Transport`] is built at startup and handed to both the Kubernetes client and
//! the Cloud DNS client, so they share the request timeout and, when configured, a
//! pinned CA bundle.

use std::io::BufReader;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, USER_AGENT};

/// Errors building HTTP clients from a [`Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The CA bundle is not a usable PEM certificate bundle
    #[error("Invalid CA bundle: {reason}")]
    InvalidCaBundle { reason: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },
}

/// Timeout and trust store shared by every outbound client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    timeout: Duration,
    ca_bundle: Option<Vec<u8>>,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }
}

impl Transport {
    /// Transport using the platform trust store.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ca_bundle: None,
        }
    }

    /// Pin trust to the certificates of a PEM bundle.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCaBundle`] if the bundle holds no certificate
    /// or a malformed PEM block.
    pub fn with_ca_bundle(mut self, pem: Vec<u8>) -> Result<Self, TransportError> {
        pem_to_der(&pem)?;
        self.ca_bundle = Some(pem);
        Ok(self)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn has_ca_bundle(&self) -> bool {
        self.ca_bundle.is_some()
    }

    /// Build the reqwest client used for the DNS backend and token endpoint.
    ///
    /// With a CA bundle, only the bundle's certificates are trusted.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if a certificate is rejected or the client fails to build.
    pub fn http_client(&self) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(USER_AGENT);

        if let Some(pem) = &self.ca_bundle {
            let certificates = reqwest::Certificate::from_pem_bundle(pem).map_err(|e| {
                TransportError::InvalidCaBundle {
                    reason: e.to_string(),
                }
            })?;
            builder = builder.tls_certs_only(certificates);
        }

        builder.build().map_err(|e| TransportError::ClientBuild {
            reason: e.to_string(),
        })
    }

    /// Apply the timeout and CA bundle to a Kubernetes client configuration.
    ///
    /// Bundle certificates are added next to the cluster CA already in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCaBundle`] if the bundle cannot be decoded.
    pub fn configure_kube(&self, config: &mut kube::Config) -> Result<(), TransportError> {
        config.connect_timeout = Some(self.timeout);
        config.read_timeout = Some(self.timeout);

        if let Some(pem) = &self.ca_bundle {
            let mut roots = config.root_cert.take().unwrap_or_default();
            roots.extend(pem_to_der(pem)?);
            config.root_cert = Some(roots);
        }
        Ok(())
    }
}

/// DER bytes of every certificate in a PEM bundle.
///
/// # Errors
///
/// Returns [`TransportError::InvalidCaBundle`] for a bundle without certificates or
/// with a malformed certificate block.
pub fn pem_to_der(pem: &[u8]) -> Result<Vec<Vec<u8>>, TransportError> {
    let mut reader = BufReader::new(pem);
    let certificates: Vec<Vec<u8>> = rustls_pemfile::certs(&mut reader)
        .map(|certificate| certificate.map(|der| der.as_ref().to_vec()))
        .collect::<Result<_, _>>()
        .map_err(|e| TransportError::InvalidCaBundle {
            reason: e.to_string(),
        })?;

    if certificates.is_empty() {
        return Err(TransportError::InvalidCaBundle {
            reason: "no certificate found".to_string(),
        });
    }
    Ok(certificates)
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod transport_tests;
