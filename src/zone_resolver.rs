// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Managed zone lookup for the configured domain.
//!
//! A zone matches when its DNS suffix equals `domain.` or is a parent of it on a label
//! boundary (`svc.example.com.` matches zones `svc.example.com.` and `example.com.`,
//! never `ample.com.`). Comparison is case-insensitive.
//!
//! When nested zones both match, the most specific one (longest suffix) wins, since
//! that is the zone that is actually authoritative for the domain. Two zones with the
//! same most specific suffix are ambiguous and reported as an error.

use tracing::debug;

use crate::backend::{DnsBackend, ManagedZone};
use crate::dns_errors::{DnsError, ZoneError};

/// Fully qualified, lowercase form of a domain (`Svc.Example.com` → `svc.example.com.`).
#[must_use]
pub fn fully_qualified(domain: &str) -> String {
    let trimmed = domain.trim_end_matches('.');
    format!("{}.", trimmed.to_ascii_lowercase())
}

/// Whether a zone with `dns_suffix` is authoritative for `fqdn`.
///
/// Both arguments are fully qualified names with a trailing dot.
#[must_use]
pub fn suffix_matches(fqdn: &str, dns_suffix: &str) -> bool {
    let fqdn = fqdn.to_ascii_lowercase();
    let suffix = dns_suffix.to_ascii_lowercase();
    if !suffix.ends_with('.') {
        return false;
    }
    if suffix == "." || fqdn == suffix {
        return true;
    }
    fqdn.strip_suffix(&suffix)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Pick the zone authoritative for `domain` out of `zones`.
///
/// # Errors
///
/// Returns [`ZoneError::ZoneNotFound`] if no zone matches and
/// [`ZoneError::AmbiguousZone`] if several zones tie for most specific.
pub fn select_zone(
    zones: &[ManagedZone],
    domain: &str,
    account: &str,
) -> Result<ManagedZone, ZoneError> {
    let fqdn = fully_qualified(domain);

    let matching: Vec<&ManagedZone> = zones
        .iter()
        .filter(|zone| suffix_matches(&fqdn, &zone.dns_suffix))
        .collect();

    let Some(longest) = matching.iter().map(|zone| zone.dns_suffix.len()).max() else {
        return Err(ZoneError::ZoneNotFound {
            domain: domain.to_string(),
            project: account.to_string(),
        });
    };

    let mut most_specific = matching
        .into_iter()
        .filter(|zone| zone.dns_suffix.len() == longest);

    match (most_specific.next(), most_specific.next()) {
        (Some(zone), None) => Ok(zone.clone()),
        (Some(first), Some(second)) => {
            let mut tied = vec![first.name.clone(), second.name.clone()];
            tied.extend(most_specific.map(|zone| zone.name.clone()));
            Err(ZoneError::AmbiguousZone {
                domain: domain.to_string(),
                zones: tied,
            })
        }
        (None, _) => Err(ZoneError::ZoneNotFound {
            domain: domain.to_string(),
            project: account.to_string(),
        }),
    }
}

/// Resolve the managed zone for `domain` by listing the account's zones.
///
/// Has no side effects and never caches: every call lists zones again.
///
/// # Errors
///
/// Returns backend errors from listing zones, or a [`ZoneError`] from selection.
pub async fn resolve_zone<B>(backend: &B, domain: &str) -> Result<ManagedZone, DnsError>
where
    B: DnsBackend + ?Sized,
{
    let zones = backend.list_zones().await?;
    debug!(domain = %domain, zones = zones.len(), "Listed managed zones");

    let zone = select_zone(&zones, domain, backend.account())?;
    debug!(
        domain = %domain,
        zone = %zone.name,
        dns_suffix = %zone.dns_suffix,
        "Resolved managed zone"
    );
    Ok(zone)
}

#[cfg(test)]
#[path = "zone_resolver_tests.rs"]
mod zone_resolver_tests;
