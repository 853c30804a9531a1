// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS backend abstraction.
//!
//! The reconciler only needs four calls from a DNS provider: list the managed zones
//! of the account, list the record sets at a name, submit an atomic batch change, and
//! read back the status of a submitted change. [`DnsBackend`] captures exactly that,
//! so the reconciliation logic can run against Cloud DNS in production and against
//! [`memory::InMemoryBackend`] in tests.

pub mod memory;

use std::fmt;

use async_trait::async_trait;

use crate::constants::{CHANGE_STATUS_DONE, CHANGE_STATUS_PENDING, RECORD_TYPE_A};
use crate::dns_errors::DnsError;

/// A managed zone as reported by the backend.
///
/// Fetched fresh for every reconciliation; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedZone {
    /// Provider identifier of the zone
    pub name: String,
    /// Fully qualified DNS suffix the zone is authoritative for, with trailing dot
    pub dns_suffix: String,
}

/// An address record set.
///
/// Identity for matching and replacement is `(zone, fqdn, record_type)`; the
/// addresses are payload, so re-publishing a name with a new address replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Fully qualified record name, with trailing dot
    pub fqdn: String,
    /// Record data; this controller always writes exactly one address
    pub addresses: Vec<String>,
    /// Time to live in seconds
    pub ttl_seconds: u32,
    /// Record type, always `A` for records written by this controller
    pub record_type: String,
}

impl AddressRecord {
    /// Build a single-address `A` record.
    #[must_use]
    pub fn a(fqdn: impl Into<String>, address: impl Into<String>, ttl_seconds: u32) -> Self {
        Self {
            fqdn: fqdn.into(),
            addresses: vec![address.into()],
            ttl_seconds,
            record_type: RECORD_TYPE_A.to_string(),
        }
    }

    /// Whether this record has the given name and is an `A` record.
    #[must_use]
    pub fn is_a_record_named(&self, fqdn: &str) -> bool {
        self.record_type == RECORD_TYPE_A && self.fqdn == fqdn
    }
}

/// A batch of additions and deletions applied atomically by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneChange {
    /// Record sets to create
    pub additions: Vec<AddressRecord>,
    /// Record sets to remove; must match the existing sets exactly
    pub deletions: Vec<AddressRecord>,
}

impl ZoneChange {
    /// A change that neither adds nor deletes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

/// Progress of a submitted change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Still being applied
    Pending,
    /// Applied and visible
    Done,
    /// Any other status string the backend reports
    Other(String),
}

impl ChangeStatus {
    /// Parse the status string used on the wire.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            CHANGE_STATUS_PENDING => Self::Pending,
            CHANGE_STATUS_DONE => Self::Done,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the change has left the pending state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str(CHANGE_STATUS_PENDING),
            Self::Done => f.write_str(CHANGE_STATUS_DONE),
            Self::Other(status) => f.write_str(status),
        }
    }
}

/// Backend-assigned handle for a submitted change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeHandle {
    /// Change id, unique within the zone
    pub id: String,
    /// Status at the time the handle was returned
    pub status: ChangeStatus,
}

/// Operations the reconciler needs from a DNS provider.
///
/// Implementations must be safe to share across tasks; the controller itself only
/// ever issues one call at a time.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// Provider account (project) the backend operates on, used in error messages.
    fn account(&self) -> &str;

    /// List every managed zone visible to the account, in listing order.
    async fn list_zones(&self) -> Result<Vec<ManagedZone>, DnsError>;

    /// List the record sets named `fqdn` in `zone`.
    ///
    /// Implementations may filter server-side and may also return unrelated record
    /// sets; callers match name and type themselves.
    async fn list_records(&self, zone: &str, fqdn: &str) -> Result<Vec<AddressRecord>, DnsError>;

    /// Submit an atomic batch change to `zone`.
    async fn submit_change(&self, zone: &str, change: &ZoneChange)
        -> Result<ChangeHandle, DnsError>;

    /// Fetch the current status of a submitted change.
    async fn get_change(&self, zone: &str, change_id: &str) -> Result<ChangeHandle, DnsError>;
}
