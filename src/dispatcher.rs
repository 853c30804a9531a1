// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Event dispatch.
//!
//! [`plan`] decides which DNS actions a [`ServiceEvent`] calls for; the
//! [`Dispatcher`] executes them one at a time through a [`RecordReconciler`].
//!
//! | Event | Addressable | Actions |
//! |---|---|---|
//! | `Created(new)` | new | upsert(new) |
//! | `Deleted(old)` | old | delete(old) |
//! | `Updated(old, new)` | new | upsert(new), then delete(old) if the record name changed |
//! | `Updated(old, new)` | old only | delete(old) |
//! | any | neither | none |
//!
//! Failures are logged and counted, never returned: one failed mutation does not
//! stop later events from being processed.

use std::fmt;
use std::time::Instant;

use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::backend::DnsBackend;
use crate::dns_errors::DnsError;
use crate::events::ServiceEvent;
use crate::metrics;
use crate::reconciler::{ReconcileOutcome, RecordReconciler};
use crate::service_view::ServiceView;
use crate::zone_resolver::fully_qualified;

/// A single DNS mutation requested by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsAction {
    Upsert {
        hostname: String,
        address: String,
        ttl_seconds: u32,
    },
    Delete {
        hostname: String,
    },
}

impl DnsAction {
    /// `upsert` or `delete`
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upsert { .. } => "upsert",
            Self::Delete { .. } => "delete",
        }
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        match self {
            Self::Upsert { hostname, .. } | Self::Delete { hostname } => hostname,
        }
    }

    fn upsert(view: &ServiceView, ttl_seconds: u32) -> Self {
        let intent = view.intent(ttl_seconds);
        Self::Upsert {
            hostname: intent.hostname,
            address: intent.address,
            ttl_seconds: intent.ttl_seconds,
        }
    }

    fn delete(view: &ServiceView) -> Self {
        Self::Delete {
            hostname: view.hostname().to_string(),
        }
    }
}

impl fmt::Display for DnsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.hostname())
    }
}

/// DNS actions for `event`, in execution order.
///
/// An upsert always comes before the delete of a renamed hostname.
#[must_use]
pub fn plan(event: &ServiceEvent, ttl_seconds: u32) -> Vec<DnsAction> {
    match event {
        ServiceEvent::Created(new) if new.is_externally_addressable() => {
            vec![DnsAction::upsert(new, ttl_seconds)]
        }
        ServiceEvent::Deleted(old) if old.is_externally_addressable() => {
            vec![DnsAction::delete(old)]
        }
        ServiceEvent::Updated(old, new) if new.is_externally_addressable() => {
            let mut actions = vec![DnsAction::upsert(new, ttl_seconds)];
            if !same_record_name(old.hostname(), new.hostname()) {
                actions.push(DnsAction::delete(old));
            }
            actions
        }
        ServiceEvent::Updated(old, _) if old.is_externally_addressable() => {
            vec![DnsAction::delete(old)]
        }
        _ => Vec::new(),
    }
}

/// Whether two hostnames map to the same record, as [`RecordReconciler::record_name`]
/// normalizes them.
fn same_record_name(a: &str, b: &str) -> bool {
    fully_qualified(a) == fully_qualified(b)
}

/// Counts of what happened while dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Actions not attempted because an earlier action of the same event failed
    pub skipped: usize,
}

/// Executes planned DNS actions for Service events.
pub struct Dispatcher<B: DnsBackend + ?Sized> {
    reconciler: RecordReconciler<B>,
    ttl_seconds: u32,
}

impl<B: DnsBackend + ?Sized> Dispatcher<B> {
    #[must_use]
    pub fn new(reconciler: RecordReconciler<B>, ttl_seconds: u32) -> Self {
        Self {
            reconciler,
            ttl_seconds,
        }
    }

    /// Handle a single event. Never fails.
    ///
    /// When the upsert of a renamed Service fails, the delete of its old hostname is
    /// skipped so the Service keeps resolving under the old name.
    pub async fn dispatch(&self, event: &ServiceEvent) -> DispatchReport {
        metrics::record_event(event.kind());
        let object = event.object();

        let actions = plan(event, self.ttl_seconds);
        if actions.is_empty() {
            debug!(
                event = event.kind(),
                namespace = %object.namespace,
                name = %object.name,
                "Service is not externally addressable, nothing to do"
            );
            return DispatchReport::default();
        }

        let mut report = DispatchReport::default();
        for action in &actions {
            if report.failed > 0 {
                warn!(
                    event = event.kind(),
                    namespace = %object.namespace,
                    name = %object.name,
                    action = %action,
                    "Skipping action after earlier failure"
                );
                report.skipped += 1;
                continue;
            }

            match self.execute(action).await {
                Ok(outcome) => {
                    info!(
                        event = event.kind(),
                        namespace = %object.namespace,
                        name = %object.name,
                        action = %action,
                        outcome = ?outcome,
                        "DNS action completed"
                    );
                    report.succeeded += 1;
                }
                Err(e) => {
                    log_failure(event, object, action, &e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Dispatch every event of `events` in order until the stream ends.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = ServiceEvent>,
    {
        info!(domain = %self.reconciler.domain(), "Dispatching Service events");
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            self.dispatch(&event).await;
        }
        info!("Service event stream ended");
    }

    async fn execute(&self, action: &DnsAction) -> Result<ReconcileOutcome, DnsError> {
        let started = Instant::now();
        let result = match action {
            DnsAction::Upsert {
                hostname,
                address,
                ttl_seconds,
            } => self.reconciler.upsert(hostname, address, *ttl_seconds).await,
            DnsAction::Delete { hostname } => self.reconciler.delete(hostname).await,
        };

        match &result {
            Ok(_) => metrics::record_dns_action_success(action.name(), started.elapsed()),
            Err(e) => metrics::record_dns_action_error(action.name(), e.reason(), started.elapsed()),
        }
        result
    }
}

fn log_failure(event: &ServiceEvent, object: &ServiceView, action: &DnsAction, e: &DnsError) {
    if e.is_transient() {
        warn!(
            event = event.kind(),
            namespace = %object.namespace,
            name = %object.name,
            action = %action,
            reason = e.reason(),
            error = %e,
            "DNS action failed, will retry on a later event"
        );
    } else {
        error!(
            event = event.kind(),
            namespace = %object.namespace,
            name = %object.name,
            action = %action,
            reason = e.reason(),
            error = %e,
            "DNS action failed"
        );
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod dispatcher_tests;
