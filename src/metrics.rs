// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for kube2clouddns.
//!
//! All metrics use the namespace prefix `kube2clouddns_`.
//!
//! # Metrics Categories
//!
//! - **Event Metrics** - Service lifecycle events received from the cluster
//! - **DNS Action Metrics** - Upserts and deletes issued by the dispatcher and their outcome
//! - **Change Metrics** - Time spent waiting for submitted changes to leave `pending`
//!
//! The registry is served on `/metrics` by [`serve`] when a metrics address is configured.
//!
//! # Example
//!
//! ```rust,no_run
//! use kube2clouddns::metrics::record_dns_action_success;
//!
//! record_dns_action_success("upsert", std::time::Duration::from_secs(2));
//! ```

use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use tracing::{error, info};

use crate::constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "kube2clouddns";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Event Metrics
// ============================================================================

/// Total number of Service lifecycle events dispatched
///
/// Labels:
/// - `event`: `created`, `updated`, `deleted`
pub static EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_events_total"),
        "Total number of Service lifecycle events dispatched by type",
    );
    let counter = CounterVec::new(opts, &["event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// DNS Action Metrics
// ============================================================================

/// Total number of DNS actions by action and outcome
///
/// Labels:
/// - `action`: `upsert` or `delete`
/// - `status`: `success` or `error`
pub static DNS_ACTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_actions_total"),
        "Total number of DNS actions by action and status",
    );
    let counter = CounterVec::new(opts, &["action", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of DNS actions in seconds, including the wait for the change
///
/// Labels:
/// - `action`: `upsert` or `delete`
pub static DNS_ACTION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_dns_action_duration_seconds"),
        "Duration of DNS actions in seconds by action",
    )
    .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]);
    let histogram = HistogramVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of failed DNS actions by action and error reason
///
/// Labels:
/// - `action`: `upsert` or `delete`
/// - `reason`: reason code of the error (e.g. `ZoneNotFound`, `ChangeTimeout`)
pub static DNS_ACTION_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_action_errors_total"),
        "Total number of failed DNS actions by action and error reason",
    );
    let counter = CounterVec::new(opts, &["action", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Change Metrics
// ============================================================================

/// Time spent waiting for submitted changes, by outcome
///
/// Labels:
/// - `outcome`: `done`, `failed`, `timeout`
pub static CHANGE_WAIT_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_change_wait_seconds"),
        "Time spent waiting for submitted changes to leave pending",
    )
    .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]);
    let histogram = HistogramVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a dispatched Service event
pub fn record_event(event: &str) {
    EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Record a successful DNS action
///
/// # Arguments
/// * `action` - `upsert` or `delete`
/// * `duration` - Duration of the action
pub fn record_dns_action_success(action: &str, duration: Duration) {
    DNS_ACTIONS_TOTAL
        .with_label_values(&[action, "success"])
        .inc();
    DNS_ACTION_DURATION_SECONDS
        .with_label_values(&[action])
        .observe(duration.as_secs_f64());
}

/// Record a failed DNS action
///
/// # Arguments
/// * `action` - `upsert` or `delete`
/// * `reason` - Reason code of the error
/// * `duration` - Duration of the action before failure
pub fn record_dns_action_error(action: &str, reason: &str, duration: Duration) {
    DNS_ACTIONS_TOTAL
        .with_label_values(&[action, "error"])
        .inc();
    DNS_ACTION_ERRORS_TOTAL
        .with_label_values(&[action, reason])
        .inc();
    DNS_ACTION_DURATION_SECONDS
        .with_label_values(&[action])
        .observe(duration.as_secs_f64());
}

/// Record the time spent waiting on a submitted change
pub fn record_change_wait(duration: Duration, outcome: &str) {
    CHANGE_WAIT_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        ),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                e.to_string(),
            )
        }
    }
}

/// Routes served by the metrics server.
pub fn router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(|| async { "ok" }))
}

/// Serve `/metrics` and `/healthz` on `addr` until the task is dropped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Serving metrics");
    axum::serve(listener, router()).await?;
    Ok(())
}
