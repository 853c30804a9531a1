// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed projection of a Kubernetes `Service`.
//!
//! Events carry [`ServiceView`]s rather than full `Service` objects: the view is
//! extracted once at the event-source boundary and holds only what DNS publication
//! depends on.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Service;

use crate::labels::{
    EXTERNAL_DNS_ANNOTATION, EXTERNAL_DNS_HOSTNAME_ANNOTATION, EXTERNAL_DNS_LABEL, MARKER_ENABLED,
};

/// The parts of a Service that drive DNS publication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceView {
    /// Service name
    pub name: String,
    /// Service namespace
    pub namespace: String,
    /// Cluster-internal address (`spec.clusterIP`), empty when unset
    pub address: String,
    /// Service labels
    pub labels: BTreeMap<String, String>,
    /// Service annotations
    pub annotations: BTreeMap<String, String>,
}

impl ServiceView {
    /// Project a Kubernetes `Service`.
    #[must_use]
    pub fn from_service(service: &Service) -> Self {
        let metadata = &service.metadata;
        Self {
            name: metadata.name.clone().unwrap_or_default(),
            namespace: metadata.namespace.clone().unwrap_or_default(),
            address: service
                .spec
                .as_ref()
                .and_then(|spec| spec.cluster_ip.clone())
                .unwrap_or_default(),
            labels: metadata.labels.clone().unwrap_or_default(),
            annotations: metadata.annotations.clone().unwrap_or_default(),
        }
    }

    /// Cache key, `namespace/name`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Whether the label or the annotation marker is set to `"true"`.
    ///
    /// Either channel is enough.
    #[must_use]
    pub fn is_externally_addressable(&self) -> bool {
        let marked = |map: &BTreeMap<String, String>, key: &str| {
            map.get(key).is_some_and(|value| value == MARKER_ENABLED)
        };
        marked(&self.labels, EXTERNAL_DNS_LABEL)
            || marked(&self.annotations, EXTERNAL_DNS_ANNOTATION)
    }

    /// Published hostname: the override annotation when present and non-empty,
    /// otherwise the Service name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        self.annotations
            .get(EXTERNAL_DNS_HOSTNAME_ANNOTATION)
            .map(String::as_str)
            .filter(|hostname| !hostname.is_empty())
            .unwrap_or(&self.name)
    }

    /// Derive the publication intent of this Service.
    #[must_use]
    pub fn intent(&self, ttl_seconds: u32) -> ServiceIntent {
        ServiceIntent {
            hostname: self.hostname().to_string(),
            address: self.address.clone(),
            ttl_seconds,
            externally_addressable: self.is_externally_addressable(),
        }
    }
}

impl From<&Service> for ServiceView {
    fn from(service: &Service) -> Self {
        Self::from_service(service)
    }
}

/// What DNS state a Service asks for, derived fresh from each event.
///
/// When `externally_addressable` is false no DNS mutation may be made for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIntent {
    pub hostname: String,
    pub address: String,
    pub ttl_seconds: u32,
    pub externally_addressable: bool,
}

#[cfg(test)]
#[path = "service_view_tests.rs"]
mod service_view_tests;
