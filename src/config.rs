// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process configuration.
//!
//! Flags are parsed with clap; every flag can also be set through a
//! `KUBE2CLOUDDNS_*` environment variable. [`Cli::into_settings`] validates the
//! flags, loads the credential and CA bundle files, and produces the immutable
//! [`Settings`] the controller runs with. Any [`ConfigError`] is fatal at startup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

use crate::cloud_dns::auth::ServiceAccountKey;
use crate::constants::{
    DEFAULT_CHANGE_POLL_INTERVAL_MILLIS, DEFAULT_CHANGE_TIMEOUT_SECS, DEFAULT_CLOUD_DNS_ENDPOINT,
    DEFAULT_DNS_RECORD_TTL_SECS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
    DEFAULT_WATCH_NAMESPACE,
};
use crate::dns_errors::AuthError;
use crate::retry::PollPolicy;
use crate::transport::{Transport, TransportError};

/// Errors in the process configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required value is empty
    #[error("--{flag} must not be empty")]
    MissingValue { flag: &'static str },

    /// A value is present but unusable
    #[error("Invalid value for --{flag}: {reason}")]
    InvalidValue { flag: &'static str, reason: String },

    /// A referenced file could not be read
    #[error("Failed to read {path}: {reason}")]
    ReadFile { path: String, reason: String },

    /// The service account key is unusable
    #[error(transparent)]
    ServiceAccount(#[from] AuthError),

    /// The CA bundle is unusable
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Keeps a Cloud DNS zone in sync with externally addressable Kubernetes Services.
#[derive(Parser, Debug, Clone)]
#[command(name = "kube2clouddns", version, about)]
pub struct Cli {
    /// Path to a kubeconfig file; in-cluster or default configuration when unset
    #[arg(long, env = "KUBE2CLOUDDNS_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Path to the Google service account JSON key
    #[arg(long = "serviceaccount", env = "KUBE2CLOUDDNS_SERVICEACCOUNT")]
    pub service_account: PathBuf,

    /// Google Cloud project owning the managed zone
    #[arg(long, env = "KUBE2CLOUDDNS_PROJECT")]
    pub project: String,

    /// Domain records are published under (e.g. svc.example.com)
    #[arg(long, env = "KUBE2CLOUDDNS_DOMAIN")]
    pub domain: String,

    /// Namespace to watch
    #[arg(long, env = "KUBE2CLOUDDNS_NAMESPACE", default_value = DEFAULT_WATCH_NAMESPACE)]
    pub namespace: String,

    /// Watch Services in every namespace
    #[arg(long, env = "KUBE2CLOUDDNS_ALL_NAMESPACES", conflicts_with = "namespace")]
    pub all_namespaces: bool,

    /// Seconds between re-deliveries of every known Service
    #[arg(long, env = "KUBE2CLOUDDNS_RESYNC_INTERVAL_SECS", default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    pub resync_interval_secs: u64,

    /// TTL of published records
    #[arg(long, env = "KUBE2CLOUDDNS_TTL_SECS", default_value_t = DEFAULT_DNS_RECORD_TTL_SECS)]
    pub ttl_secs: u32,

    /// PEM bundle replacing the platform trust store
    #[arg(long, env = "KUBE2CLOUDDNS_CA_BUNDLE")]
    pub ca_bundle: Option<PathBuf>,

    /// Timeout of a single HTTP request
    #[arg(long, env = "KUBE2CLOUDDNS_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Delay before the first status poll of a submitted change
    #[arg(long, env = "KUBE2CLOUDDNS_CHANGE_POLL_INTERVAL_MS", default_value_t = DEFAULT_CHANGE_POLL_INTERVAL_MILLIS)]
    pub change_poll_interval_ms: u64,

    /// Give up waiting on a pending change after this many seconds
    #[arg(long, env = "KUBE2CLOUDDNS_CHANGE_TIMEOUT_SECS", default_value_t = DEFAULT_CHANGE_TIMEOUT_SECS)]
    pub change_timeout_secs: u64,

    /// Serve /metrics and /healthz on this address
    #[arg(long, env = "KUBE2CLOUDDNS_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Cloud DNS API base URL
    #[arg(long, env = "KUBE2CLOUDDNS_API_ENDPOINT", default_value = DEFAULT_CLOUD_DNS_ENDPOINT)]
    pub api_endpoint: String,

    /// OAuth2 token endpoint; defaults to the one named in the key file
    #[arg(long, env = "KUBE2CLOUDDNS_TOKEN_URI")]
    pub token_uri: Option<String>,
}

/// Validated configuration, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub kubeconfig: Option<PathBuf>,
    pub service_account_key: ServiceAccountKey,
    pub project: String,
    /// Lowercase, without trailing dot
    pub domain: String,
    /// `None` watches every namespace
    pub namespace: Option<String>,
    pub resync_interval: Duration,
    pub ttl_seconds: u32,
    pub transport: Transport,
    pub poll_policy: PollPolicy,
    pub metrics_addr: Option<SocketAddr>,
    pub api_endpoint: Url,
    pub token_uri: Option<String>,
}

impl Cli {
    /// Validate the flags and load the files they reference.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for empty or out-of-range values, unreadable files,
    /// a malformed service account key, or an unusable CA bundle.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let project = self.project.trim().to_string();
        if project.is_empty() {
            return Err(ConfigError::MissingValue { flag: "project" });
        }

        let domain = self
            .domain
            .trim()
            .trim_end_matches('.')
            .to_ascii_lowercase();
        if domain.is_empty() {
            return Err(ConfigError::MissingValue { flag: "domain" });
        }

        let namespace = if self.all_namespaces {
            None
        } else {
            let namespace = self.namespace.trim().to_string();
            if namespace.is_empty() {
                return Err(ConfigError::MissingValue { flag: "namespace" });
            }
            Some(namespace)
        };

        if self.ttl_secs == 0 {
            return Err(positive("ttl-secs"));
        }
        if self.resync_interval_secs == 0 {
            return Err(positive("resync-interval-secs"));
        }
        if self.http_timeout_secs == 0 {
            return Err(positive("http-timeout-secs"));
        }
        if self.change_poll_interval_ms == 0 {
            return Err(positive("change-poll-interval-ms"));
        }
        if self.change_timeout_secs == 0 {
            return Err(positive("change-timeout-secs"));
        }

        let api_endpoint = parse_http_url("api-endpoint", &self.api_endpoint)?;
        if let Some(token_uri) = &self.token_uri {
            parse_http_url("token-uri", token_uri)?;
        }

        let service_account_key =
            ServiceAccountKey::from_json(&read_file(&self.service_account)?)?;

        let mut transport = Transport::new(Duration::from_secs(self.http_timeout_secs));
        if let Some(path) = &self.ca_bundle {
            transport = transport.with_ca_bundle(read_file(path)?)?;
        }

        Ok(Settings {
            kubeconfig: self.kubeconfig,
            service_account_key,
            project,
            domain,
            namespace,
            resync_interval: Duration::from_secs(self.resync_interval_secs),
            ttl_seconds: self.ttl_secs,
            transport,
            poll_policy: PollPolicy::new(
                Duration::from_millis(self.change_poll_interval_ms),
                Duration::from_secs(self.change_timeout_secs),
            ),
            metrics_addr: self.metrics_addr,
            api_endpoint,
            token_uri: self.token_uri,
        })
    }
}

fn positive(flag: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        flag,
        reason: "must be greater than zero".to_string(),
    }
}

fn parse_http_url(flag: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        flag,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            flag,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Log output format selected by `RUST_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else is text.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or `text`).
/// Output carries file and line numbers.
pub fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match LogFormat::parse(&log_format) {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
