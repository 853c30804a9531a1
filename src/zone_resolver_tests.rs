// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `zone_resolver.rs`

#[cfg(test)]
mod tests {
    use crate::backend::memory::InMemoryBackend;
    use crate::backend::ManagedZone;
    use crate::dns_errors::{BackendError, DnsError, ZoneError};
    use crate::zone_resolver::{fully_qualified, resolve_zone, select_zone, suffix_matches};

    fn zone(name: &str, dns_suffix: &str) -> ManagedZone {
        ManagedZone {
            name: name.to_string(),
            dns_suffix: dns_suffix.to_string(),
        }
    }

    #[test]
    fn test_fully_qualified() {
        assert_eq!(fully_qualified("svc.example.com"), "svc.example.com.");
        assert_eq!(fully_qualified("svc.example.com."), "svc.example.com.");
        assert_eq!(fully_qualified("Svc.Example.COM"), "svc.example.com.");
    }

    #[test]
    fn test_suffix_matches_on_label_boundary() {
        assert!(suffix_matches("svc.example.com.", "example.com."));
        assert!(suffix_matches("svc.example.com.", "svc.example.com."));
        assert!(!suffix_matches("svc.example.com.", "ample.com."));
        assert!(!suffix_matches("example.com.", "svc.example.com."));
    }

    #[test]
    fn test_suffix_matches_is_case_insensitive() {
        assert!(suffix_matches("svc.example.com.", "Example.COM."));
    }

    #[test]
    fn test_suffix_without_trailing_dot_never_matches() {
        assert!(!suffix_matches("svc.example.com.", "example.com"));
    }

    #[test]
    fn test_most_specific_zone_wins() {
        let zones = vec![zone("sub", "b.example.com."), zone("root", "example.com.")];

        let selected = select_zone(&zones, "a.b.example.com", "p").unwrap();

        assert_eq!(selected.name, "sub");
    }

    #[test]
    fn test_most_specific_zone_wins_regardless_of_listing_order() {
        let zones = vec![zone("root", "example.com."), zone("sub", "b.example.com.")];

        let selected = select_zone(&zones, "a.b.example.com", "p").unwrap();

        assert_eq!(selected.name, "sub");
    }

    #[test]
    fn test_exact_zone_match() {
        let zones = vec![zone("svc", "svc.example.com.")];

        let selected = select_zone(&zones, "svc.example.com", "p").unwrap();

        assert_eq!(selected.name, "svc");
    }

    #[test]
    fn test_no_matching_zone() {
        let zones = vec![zone("other", "other.org.")];

        let error = select_zone(&zones, "svc.example.com", "my-project").unwrap_err();

        assert_eq!(
            error,
            ZoneError::ZoneNotFound {
                domain: "svc.example.com".to_string(),
                project: "my-project".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_zone_list() {
        let error = select_zone(&[], "svc.example.com", "p").unwrap_err();

        assert!(matches!(error, ZoneError::ZoneNotFound { .. }));
    }

    #[test]
    fn test_equally_specific_zones_are_ambiguous() {
        let zones = vec![
            zone("public", "example.com."),
            zone("private", "example.com."),
            zone("unrelated", "other.org."),
        ];

        let error = select_zone(&zones, "svc.example.com", "p").unwrap_err();

        assert_eq!(
            error,
            ZoneError::AmbiguousZone {
                domain: "svc.example.com".to_string(),
                zones: vec!["public".to_string(), "private".to_string()],
            }
        );
    }

    #[test]
    fn test_ambiguity_below_most_specific_is_ignored() {
        let zones = vec![
            zone("public", "example.com."),
            zone("private", "example.com."),
            zone("svc", "svc.example.com."),
        ];

        let selected = select_zone(&zones, "svc.example.com", "p").unwrap();

        assert_eq!(selected.name, "svc");
    }

    #[tokio::test]
    async fn test_resolve_zone_lists_zones_from_backend() {
        let backend = InMemoryBackend::new("p")
            .with_zone("root", "example.com.")
            .with_zone("svc", "svc.example.com.");

        let zone = resolve_zone(&backend, "svc.example.com").await.unwrap();

        assert_eq!(zone.name, "svc");
    }

    #[tokio::test]
    async fn test_resolve_zone_propagates_backend_errors() {
        let backend = InMemoryBackend::new("p").with_zone("root", "example.com.");
        backend.fail_next(
            BackendError::HttpRequestTimeout {
                endpoint: "memory://zones".to_string(),
            }
            .into(),
        );

        let error = resolve_zone(&backend, "svc.example.com").await.unwrap_err();

        assert!(matches!(
            error,
            DnsError::Backend(BackendError::HttpRequestTimeout { .. })
        ));
    }
}
