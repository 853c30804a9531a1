// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud DNS v1 wire types.

use serde::{Deserialize, Serialize};

use crate::backend::{AddressRecord, ChangeHandle, ChangeStatus, ManagedZone, ZoneChange};

/// `managedZones.list` response page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedZonesPage {
    #[serde(default)]
    pub managed_zones: Vec<ManagedZoneResource>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedZoneResource {
    pub name: String,
    pub dns_name: String,
}

impl From<ManagedZoneResource> for ManagedZone {
    fn from(zone: ManagedZoneResource) -> Self {
        Self {
            name: zone.name,
            dns_suffix: zone.dns_name,
        }
    }
}

/// `resourceRecordSets.list` response page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSetsPage {
    #[serde(default)]
    pub rrsets: Vec<ResourceRecordSet>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

impl From<&AddressRecord> for ResourceRecordSet {
    fn from(record: &AddressRecord) -> Self {
        Self {
            name: record.fqdn.clone(),
            record_type: record.record_type.clone(),
            ttl: record.ttl_seconds,
            rrdatas: record.addresses.clone(),
        }
    }
}

impl From<ResourceRecordSet> for AddressRecord {
    fn from(rrset: ResourceRecordSet) -> Self {
        Self {
            fqdn: rrset.name,
            addresses: rrset.rrdatas,
            ttl_seconds: rrset.ttl,
            record_type: rrset.record_type,
        }
    }
}

/// Body of `changes.create`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<ResourceRecordSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<ResourceRecordSet>,
}

impl From<&ZoneChange> for ChangeRequest {
    fn from(change: &ZoneChange) -> Self {
        Self {
            additions: change.additions.iter().map(Into::into).collect(),
            deletions: change.deletions.iter().map(Into::into).collect(),
        }
    }
}

/// `changes.create` / `changes.get` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResource {
    pub id: String,
    pub status: String,
}

impl From<ChangeResource> for ChangeHandle {
    fn from(change: ChangeResource) -> Self {
        Self {
            id: change.id,
            status: ChangeStatus::parse(&change.status),
        }
    }
}

/// Google API error envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}
