// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Service, ServiceSpec};
use kube::api::ObjectMeta;
use kube::client::Client;

use kube2clouddns::backend::memory::InMemoryBackend;
use kube2clouddns::dispatcher::Dispatcher;
use kube2clouddns::reconciler::RecordReconciler;
use kube2clouddns::retry::PollPolicy;

pub const DOMAIN: &str = "svc.example.com";
pub const ZONE: &str = "svc-example-com";

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {}", e);
            None
        }
    }
}

/// Poll policy with millisecond timings so pending changes resolve quickly
pub fn fast_poll_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(1), Duration::from_millis(200))
}

/// Build a Service in the default namespace
pub fn service(
    name: &str,
    cluster_ip: &str,
    labels: &[(&str, &str)],
    annotations: &[(&str, &str)],
) -> Service {
    let to_map = |pairs: &[(&str, &str)]| -> Option<BTreeMap<String, String>> {
        if pairs.is_empty() {
            None
        } else {
            Some(
                pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            )
        }
    };

    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: to_map(labels),
            annotations: to_map(annotations),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: Some(cluster_ip.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// In-memory backend with a root zone and the zone for [`DOMAIN`], plus a dispatcher
/// publishing under [`DOMAIN`] with TTL 60
pub fn in_memory_dispatcher() -> (Arc<InMemoryBackend>, Dispatcher<InMemoryBackend>) {
    let backend = Arc::new(
        InMemoryBackend::new("test-project")
            .with_zone("example-com", "example.com.")
            .with_zone(ZONE, "svc.example.com."),
    );
    let reconciler = RecordReconciler::new(backend.clone(), DOMAIN, fast_poll_policy());
    (backend, Dispatcher::new(reconciler, 60))
}
