// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # kube2clouddns - Kubernetes Service records in Google Cloud DNS
//!
//! kube2clouddns watches Kubernetes Services and keeps one `A` record per externally
//! addressable Service in a Cloud DNS managed zone: `hostname.domain.` resolves to the
//! Service's cluster IP, and the record goes away with the Service (or its marker).
//!
//! ## Overview
//!
//! A Service opts in with the label or annotation `external_dns: "true"`. Its hostname
//! is the `external_dns_hostname` annotation when set, otherwise the Service name.
//!
//! Service events flow through three layers:
//!
//! 1. [`events`] turns the Kubernetes watch into `Created` / `Updated(old, new)` /
//!    `Deleted` events with periodic resync.
//! 2. [`dispatcher`] decides which upserts and deletes an event calls for and runs
//!    them one at a time, logging failures without stopping.
//! 3. [`reconciler`] converges the zone: it resolves the zone ([`zone_resolver`]),
//!    replaces every `A` record at the name in one atomic change, and waits for the
//!    change to be applied.
//!
//! ## Modules
//!
//! - [`backend`] - DNS backend trait and an in-memory implementation
//! - [`cloud_dns`] - Cloud DNS REST backend and service account authentication
//! - [`config`] - Command line flags, validation and logging setup
//! - [`transport`] - HTTP timeout and CA bundle shared by all clients
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kube2clouddns::backend::memory::InMemoryBackend;
//! use kube2clouddns::reconciler::RecordReconciler;
//! use kube2clouddns::retry::PollPolicy;
//!
//! # async fn example() -> Result<(), kube2clouddns::dns_errors::DnsError> {
//! let backend = Arc::new(InMemoryBackend::new("my-project").with_zone("svc", "svc.example.com."));
//! let reconciler = RecordReconciler::new(backend, "svc.example.com", PollPolicy::default());
//!
//! reconciler.upsert("api", "10.0.0.5", 60).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cloud_dns;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod dns_errors;
pub mod events;
pub mod labels;
pub mod metrics;
pub mod reconciler;
pub mod retry;
pub mod service_view;
pub mod transport;
pub mod zone_resolver;
