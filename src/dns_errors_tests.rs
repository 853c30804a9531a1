// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for DNS error types.

#[cfg(test)]
mod tests {
    use crate::dns_errors::*;

    #[test]
    fn test_zone_not_found_error() {
        let error = ZoneError::ZoneNotFound {
            domain: "svc.example.com".to_string(),
            project: "my-project".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "No managed zone in project 'my-project' matches domain 'svc.example.com'"
        );
    }

    #[test]
    fn test_change_failed_error() {
        let error = ChangeError::ChangeFailed {
            zone: "example-zone".to_string(),
            change_id: "42".to_string(),
            status: "rejected".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Change 42 in zone 'example-zone' finished with unexpected status 'rejected'"
        );
    }

    #[test]
    fn test_change_timeout_error() {
        let error = ChangeError::ChangeTimeout {
            zone: "example-zone".to_string(),
            change_id: "7".to_string(),
            waited_secs: 300,
        };

        assert_eq!(
            error.to_string(),
            "Change 7 in zone 'example-zone' still pending after 300s"
        );
    }

    #[test]
    fn test_unexpected_http_response_error() {
        let error = BackendError::UnexpectedHttpResponse {
            endpoint: "https://dns.googleapis.com/dns/v1/projects/p/managedZones".to_string(),
            status_code: 403,
            reason: "Forbidden".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Unexpected HTTP response from https://dns.googleapis.com/dns/v1/projects/p/managedZones: 403 Forbidden"
        );
    }

    #[test]
    fn test_composite_error_is_transparent() {
        let error: DnsError = RecordError::InvalidTtl {
            fqdn: "api.svc.example.com.".to_string(),
            ttl: 0,
        }
        .into();

        assert_eq!(
            error.to_string(),
            "Invalid TTL 0 for record 'api.svc.example.com.': TTL must be positive"
        );
    }

    #[test]
    fn test_transport_errors_are_transient() {
        let connection: DnsError = BackendError::HttpConnectionFailed {
            endpoint: "https://dns".to_string(),
            reason: "connection refused".to_string(),
        }
        .into();
        let timeout: DnsError = BackendError::HttpRequestTimeout {
            endpoint: "https://dns".to_string(),
        }
        .into();

        assert!(connection.is_transient());
        assert!(timeout.is_transient());
    }

    #[test]
    fn test_http_status_drives_transience() {
        let rate_limited: DnsError = BackendError::UnexpectedHttpResponse {
            endpoint: "https://dns".to_string(),
            status_code: 429,
            reason: "rateLimitExceeded".to_string(),
        }
        .into();
        let bad_request: DnsError = BackendError::UnexpectedHttpResponse {
            endpoint: "https://dns".to_string(),
            status_code: 400,
            reason: "invalid".to_string(),
        }
        .into();

        assert!(rate_limited.is_transient());
        assert!(!bad_request.is_transient());
    }

    #[test]
    fn test_zone_errors_are_permanent() {
        let not_found: DnsError = ZoneError::ZoneNotFound {
            domain: "svc.example.com".to_string(),
            project: "p".to_string(),
        }
        .into();
        let ambiguous: DnsError = ZoneError::AmbiguousZone {
            domain: "svc.example.com".to_string(),
            zones: vec!["public".to_string(), "private".to_string()],
        }
        .into();

        assert!(!not_found.is_transient());
        assert!(!ambiguous.is_transient());
    }

    #[test]
    fn test_token_exchange_without_response_is_transient() {
        let error: DnsError = AuthError::TokenExchangeFailed {
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            reason: "dns error".to_string(),
            status_code: None,
        }
        .into();

        assert!(error.is_transient());
    }

    #[test]
    fn test_reason_codes() {
        let cases: Vec<(DnsError, &str)> = vec![
            (
                ZoneError::ZoneNotFound {
                    domain: "d".to_string(),
                    project: "p".to_string(),
                }
                .into(),
                "ZoneNotFound",
            ),
            (
                ChangeError::ChangeTimeout {
                    zone: "z".to_string(),
                    change_id: "1".to_string(),
                    waited_secs: 1,
                }
                .into(),
                "ChangeTimeout",
            ),
            (
                BackendError::InvalidResponse {
                    endpoint: "e".to_string(),
                    reason: "r".to_string(),
                }
                .into(),
                "InvalidResponse",
            ),
            (
                AuthError::InvalidServiceAccountKey {
                    reason: "r".to_string(),
                }
                .into(),
                "InvalidServiceAccountKey",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.reason(), expected);
        }
    }
}
