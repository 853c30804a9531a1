// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record reconciliation against the managed zone.
//!
//! Both operations follow the same shape:
//!
//! 1. Build `hostname.domain.` and resolve the zone (fresh, no cache).
//! 2. List the `A` record sets at exactly that name.
//! 3. Submit one atomic change deleting every match and, for an upsert, adding the
//!    desired record.
//! 4. Poll the change until it leaves `pending`.
//!
//! Deleting and re-adding in a single change makes upserts idempotent: the same input
//! nets out to no difference, and a new address replaces the old one without ever
//! producing a second record set for the name.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::backend::{AddressRecord, ChangeHandle, ChangeStatus, DnsBackend, ZoneChange};
use crate::dns_errors::{ChangeError, DnsError, RecordError};
use crate::metrics;
use crate::retry::PollPolicy;
use crate::zone_resolver::{fully_qualified, resolve_zone};

/// Outcome of a successful reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A change was submitted and applied
    Applied {
        /// Zone the change went to
        zone: String,
        /// Backend change id
        change_id: String,
        /// Record sets removed by the change
        deleted: usize,
        /// Record sets added by the change
        added: usize,
    },
    /// Nothing to change; no request was submitted
    Unchanged,
}

/// Converges `A` records for service hostnames under one domain.
pub struct RecordReconciler<B: DnsBackend + ?Sized> {
    backend: Arc<B>,
    domain: String,
    poll_policy: PollPolicy,
}

impl<B: DnsBackend + ?Sized> RecordReconciler<B> {
    /// Create a reconciler publishing names under `domain` (without trailing dot).
    #[must_use]
    pub fn new(backend: Arc<B>, domain: impl Into<String>, poll_policy: PollPolicy) -> Self {
        let domain = domain.into();
        Self {
            backend,
            domain: domain.trim_end_matches('.').to_ascii_lowercase(),
            poll_policy,
        }
    }

    /// The domain names are published under.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Fully qualified record name for a hostname: `hostname.domain.`
    ///
    /// Case and trailing dots of the hostname are ignored; it must not already carry
    /// the domain.
    #[must_use]
    pub fn record_name(&self, hostname: &str) -> String {
        fully_qualified(&format!("{}.{}", hostname.trim_end_matches('.'), self.domain))
    }

    /// Make `hostname` resolve to exactly `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidTtl`] for a zero TTL, zone resolution errors,
    /// backend errors from any call, and [`ChangeError`]s from waiting on the change.
    pub async fn upsert(
        &self,
        hostname: &str,
        address: &str,
        ttl_seconds: u32,
    ) -> Result<ReconcileOutcome, DnsError> {
        let fqdn = self.record_name(hostname);
        if ttl_seconds == 0 {
            return Err(RecordError::InvalidTtl {
                fqdn,
                ttl: ttl_seconds,
            }
            .into());
        }

        info!(
            hostname = %hostname,
            fqdn = %fqdn,
            address = %address,
            ttl = ttl_seconds,
            "Upserting A record"
        );

        let zone = resolve_zone(self.backend.as_ref(), &self.domain).await?;
        let existing = self.existing_records(&zone.name, &fqdn).await?;

        let change = ZoneChange {
            additions: vec![AddressRecord::a(fqdn.clone(), address, ttl_seconds)],
            deletions: existing,
        };

        let outcome = self.apply(&zone.name, change).await?;
        info!(fqdn = %fqdn, address = %address, zone = %zone.name, "Upsert completed");
        Ok(outcome)
    }

    /// Remove every `A` record at `hostname`.
    ///
    /// Deleting a name that has no record succeeds without submitting anything.
    ///
    /// # Errors
    ///
    /// Returns zone resolution errors, backend errors from any call, and
    /// [`ChangeError`]s from waiting on the change.
    pub async fn delete(&self, hostname: &str) -> Result<ReconcileOutcome, DnsError> {
        let fqdn = self.record_name(hostname);
        info!(hostname = %hostname, fqdn = %fqdn, "Deleting A record");

        let zone = resolve_zone(self.backend.as_ref(), &self.domain).await?;
        let existing = self.existing_records(&zone.name, &fqdn).await?;

        if existing.is_empty() {
            info!(fqdn = %fqdn, zone = %zone.name, "No A record to delete");
            return Ok(ReconcileOutcome::Unchanged);
        }

        let change = ZoneChange {
            additions: Vec::new(),
            deletions: existing,
        };

        let outcome = self.apply(&zone.name, change).await?;
        info!(fqdn = %fqdn, zone = %zone.name, "Record deleted");
        Ok(outcome)
    }

    /// `A` record sets named exactly `fqdn` in `zone`.
    async fn existing_records(
        &self,
        zone: &str,
        fqdn: &str,
    ) -> Result<Vec<AddressRecord>, DnsError> {
        let records = self.backend.list_records(zone, fqdn).await?;
        let existing: Vec<AddressRecord> = records
            .into_iter()
            .filter(|record| record.is_a_record_named(fqdn))
            .collect();
        debug!(zone = %zone, fqdn = %fqdn, existing = existing.len(), "Found existing A records");
        Ok(existing)
    }

    async fn apply(&self, zone: &str, change: ZoneChange) -> Result<ReconcileOutcome, DnsError> {
        let added = change.additions.len();
        let deleted = change.deletions.len();

        let handle = self.backend.submit_change(zone, &change).await?;
        debug!(
            zone = %zone,
            change_id = %handle.id,
            status = %handle.status,
            added,
            deleted,
            "Submitted change"
        );

        let handle = self.wait_for_change(zone, handle).await?;

        Ok(ReconcileOutcome::Applied {
            zone: zone.to_string(),
            change_id: handle.id,
            deleted,
            added,
        })
    }

    /// Poll a change until it leaves `pending`.
    ///
    /// `done` is success; any other terminal status is a [`ChangeError::ChangeFailed`].
    /// A poll error aborts the wait without retrying.
    async fn wait_for_change(
        &self,
        zone: &str,
        mut handle: ChangeHandle,
    ) -> Result<ChangeHandle, DnsError> {
        let started = Instant::now();
        let mut backoff = self.poll_policy.backoff();
        let mut waited = Duration::ZERO;

        while !handle.status.is_terminal() {
            let Some(delay) = backoff.next_backoff() else {
                warn!(
                    zone = %zone,
                    change_id = %handle.id,
                    waited = ?waited,
                    "Change still pending, giving up"
                );
                metrics::record_change_wait(started.elapsed(), "timeout");
                return Err(ChangeError::ChangeTimeout {
                    zone: zone.to_string(),
                    change_id: handle.id,
                    waited_secs: waited.as_secs(),
                }
                .into());
            };

            tokio::time::sleep(delay).await;
            waited += delay;

            handle = self.backend.get_change(zone, &handle.id).await?;
            debug!(zone = %zone, change_id = %handle.id, status = %handle.status, "Polled change");
        }

        if handle.status == ChangeStatus::Done {
            metrics::record_change_wait(started.elapsed(), "done");
            return Ok(handle);
        }

        metrics::record_change_wait(started.elapsed(), "failed");
        Err(ChangeError::ChangeFailed {
            zone: zone.to_string(),
            status: handle.status.to_string(),
            change_id: handle.id,
        }
        .into())
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
