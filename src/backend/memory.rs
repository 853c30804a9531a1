// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory DNS backend.
//!
//! Mirrors the Cloud DNS change semantics closely enough to exercise the reconciler
//! and dispatcher without network access:
//!
//! - changes apply atomically: deletions first, then additions
//! - a deletion must match an existing record set exactly (HTTP 404 otherwise)
//! - an addition must not collide with a remaining set of the same name and type
//!   (HTTP 409 otherwise)
//! - a change reports `pending` for a configurable number of status reads
//!
//! Every call is recorded, and the record state after every applied change is kept
//! as a snapshot so tests can assert on intermediate zone states.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{AddressRecord, ChangeHandle, ChangeStatus, DnsBackend, ManagedZone, ZoneChange};
use crate::dns_errors::{BackendError, DnsError};

/// A call made against the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `list_zones`
    ListZones,
    /// `list_records(zone, fqdn)`
    ListRecords { zone: String, fqdn: String },
    /// `submit_change(zone, change)`
    SubmitChange { zone: String, change: ZoneChange },
    /// `get_change(zone, id)`
    GetChange { zone: String, change_id: String },
}

#[derive(Debug, Clone)]
struct TrackedChange {
    zone: String,
    polls_until_terminal: u32,
    terminal_status: ChangeStatus,
}

#[derive(Debug, Default)]
struct State {
    zones: Vec<ManagedZone>,
    records: BTreeMap<String, Vec<AddressRecord>>,
    changes: BTreeMap<String, TrackedChange>,
    next_change_id: u64,
    pending_polls: u32,
    terminal_status: Option<ChangeStatus>,
    injected_failures: VecDeque<DnsError>,
    calls: Vec<BackendCall>,
    snapshots: Vec<Vec<AddressRecord>>,
}

/// Thread-safe in-memory implementation of [`DnsBackend`].
#[derive(Debug)]
pub struct InMemoryBackend {
    account: String,
    state: Mutex<State>,
}

impl InMemoryBackend {
    /// Create a backend for `account` with no zones.
    #[must_use]
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Add a managed zone. Zones are listed in the order they were added.
    #[must_use]
    pub fn with_zone(self, name: impl Into<String>, dns_suffix: impl Into<String>) -> Self {
        {
            let mut state = self.lock();
            let name = name.into();
            state.records.entry(name.clone()).or_default();
            state.zones.push(ManagedZone {
                name,
                dns_suffix: dns_suffix.into(),
            });
        }
        self
    }

    /// Seed a record directly into a zone, bypassing change semantics.
    pub fn insert_record(&self, zone: &str, record: AddressRecord) {
        self.lock()
            .records
            .entry(zone.to_string())
            .or_default()
            .push(record);
    }

    /// Number of status reads, counting the submit response, that report `pending`
    /// before a change turns terminal.
    pub fn set_pending_polls(&self, polls: u32) {
        self.lock().pending_polls = polls;
    }

    /// Terminal status reported by changes submitted from now on (default `done`).
    pub fn set_terminal_status(&self, status: ChangeStatus) {
        self.lock().terminal_status = Some(status);
    }

    /// Make the next call (of any kind) fail with `error`.
    pub fn fail_next(&self, error: DnsError) {
        self.lock().injected_failures.push_back(error);
    }

    /// Current record sets of `zone`.
    #[must_use]
    pub fn records(&self, zone: &str) -> Vec<AddressRecord> {
        self.lock().records.get(zone).cloned().unwrap_or_default()
    }

    /// All calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Every change submitted so far, accepted or not.
    #[must_use]
    pub fn submitted_changes(&self) -> Vec<ZoneChange> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::SubmitChange { change, .. } => Some(change.clone()),
                _ => None,
            })
            .collect()
    }

    /// Record state of the mutated zone after each applied change, in order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<Vec<AddressRecord>> {
        self.lock().snapshots.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn begin(&self, call: BackendCall) -> Result<MutexGuard<'_, State>, DnsError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.injected_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

fn conflict(zone: &str, status_code: u16, reason: String) -> DnsError {
    BackendError::UnexpectedHttpResponse {
        endpoint: format!("memory://{zone}/changes"),
        status_code,
        reason,
    }
    .into()
}

fn zone_not_found(zone: &str) -> DnsError {
    conflict(zone, 404, format!("managed zone '{zone}' does not exist"))
}

#[async_trait]
impl DnsBackend for InMemoryBackend {
    fn account(&self) -> &str {
        &self.account
    }

    async fn list_zones(&self) -> Result<Vec<ManagedZone>, DnsError> {
        let state = self.begin(BackendCall::ListZones)?;
        Ok(state.zones.clone())
    }

    async fn list_records(&self, zone: &str, fqdn: &str) -> Result<Vec<AddressRecord>, DnsError> {
        let state = self.begin(BackendCall::ListRecords {
            zone: zone.to_string(),
            fqdn: fqdn.to_string(),
        })?;
        let records = state.records.get(zone).ok_or_else(|| zone_not_found(zone))?;
        Ok(records
            .iter()
            .filter(|record| record.fqdn == fqdn)
            .cloned()
            .collect())
    }

    async fn submit_change(
        &self,
        zone: &str,
        change: &ZoneChange,
    ) -> Result<ChangeHandle, DnsError> {
        let mut state = self.begin(BackendCall::SubmitChange {
            zone: zone.to_string(),
            change: change.clone(),
        })?;

        if change.is_empty() {
            return Err(conflict(
                zone,
                400,
                "change must contain at least one addition or deletion".to_string(),
            ));
        }

        let mut records = state
            .records
            .get(zone)
            .cloned()
            .ok_or_else(|| zone_not_found(zone))?;

        for deletion in &change.deletions {
            let position = records
                .iter()
                .position(|record| record == deletion)
                .ok_or_else(|| {
                    conflict(
                        zone,
                        404,
                        format!("record set '{}' does not exist", deletion.fqdn),
                    )
                })?;
            records.remove(position);
        }

        for addition in &change.additions {
            if records.iter().any(|record| {
                record.fqdn == addition.fqdn && record.record_type == addition.record_type
            }) {
                return Err(conflict(
                    zone,
                    409,
                    format!("record set '{}' already exists", addition.fqdn),
                ));
            }
            records.push(addition.clone());
        }

        state.records.insert(zone.to_string(), records.clone());
        state.snapshots.push(records);

        state.next_change_id += 1;
        let id = state.next_change_id.to_string();
        let polls_until_terminal = state.pending_polls;
        let terminal_status = state.terminal_status.clone().unwrap_or(ChangeStatus::Done);
        let status = if polls_until_terminal == 0 {
            terminal_status.clone()
        } else {
            ChangeStatus::Pending
        };
        state.changes.insert(
            id.clone(),
            TrackedChange {
                zone: zone.to_string(),
                polls_until_terminal,
                terminal_status,
            },
        );

        Ok(ChangeHandle { id, status })
    }

    async fn get_change(&self, zone: &str, change_id: &str) -> Result<ChangeHandle, DnsError> {
        let mut state = self.begin(BackendCall::GetChange {
            zone: zone.to_string(),
            change_id: change_id.to_string(),
        })?;

        let tracked = state
            .changes
            .get_mut(change_id)
            .filter(|tracked| tracked.zone == zone)
            .ok_or_else(|| conflict(zone, 404, format!("change '{change_id}' not found")))?;

        let status = if tracked.polls_until_terminal > 1 {
            tracked.polls_until_terminal -= 1;
            ChangeStatus::Pending
        } else {
            tracked.polls_until_terminal = 0;
            tracked.terminal_status.clone()
        };

        Ok(ChangeHandle {
            id: change_id.to_string(),
            status,
        })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
