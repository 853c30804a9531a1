// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `reconciler.rs`

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::backend::memory::{BackendCall, InMemoryBackend};
    use crate::backend::{AddressRecord, ChangeStatus};
    use crate::dns_errors::{BackendError, ChangeError, DnsError, RecordError, ZoneError};
    use crate::reconciler::{ReconcileOutcome, RecordReconciler};
    use crate::retry::PollPolicy;

    const ZONE: &str = "svc-zone";

    fn fast_policy() -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), Duration::from_millis(50))
    }

    fn setup() -> (Arc<InMemoryBackend>, RecordReconciler<InMemoryBackend>) {
        let backend = Arc::new(
            InMemoryBackend::new("test-project")
                .with_zone("root-zone", "example.com.")
                .with_zone(ZONE, "svc.example.com."),
        );
        let reconciler = RecordReconciler::new(backend.clone(), "svc.example.com", fast_policy());
        (backend, reconciler)
    }

    fn a_records_named(backend: &InMemoryBackend, fqdn: &str) -> Vec<AddressRecord> {
        backend
            .records(ZONE)
            .into_iter()
            .filter(|record| record.is_a_record_named(fqdn))
            .collect()
    }

    #[test]
    fn test_record_name() {
        let (_, reconciler) = setup();

        assert_eq!(reconciler.record_name("api"), "api.svc.example.com.");
        assert_eq!(reconciler.record_name("API"), "api.svc.example.com.");
        assert_eq!(reconciler.record_name("api."), "api.svc.example.com.");
    }

    #[test]
    fn test_domain_is_normalized() {
        let backend = Arc::new(InMemoryBackend::new("p"));
        let reconciler = RecordReconciler::new(backend, "Svc.Example.com.", fast_policy());

        assert_eq!(reconciler.domain(), "svc.example.com");
    }

    #[tokio::test]
    async fn test_upsert_creates_record() {
        let (backend, reconciler) = setup();

        let outcome = reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                zone: ZONE.to_string(),
                change_id: "1".to_string(),
                deleted: 0,
                added: 1,
            }
        );
        assert_eq!(
            a_records_named(&backend, "api.svc.example.com."),
            vec![AddressRecord::a("api.svc.example.com.", "10.0.0.5", 60)]
        );
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let (backend, reconciler) = setup();

        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();
        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        assert_eq!(
            a_records_named(&backend, "api.svc.example.com."),
            vec![AddressRecord::a("api.svc.example.com.", "10.0.0.5", 60)]
        );
    }

    #[tokio::test]
    async fn test_upsert_replaces_address() {
        let (backend, reconciler) = setup();

        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();
        reconciler.upsert("api", "10.0.0.9", 60).await.unwrap();

        assert_eq!(
            a_records_named(&backend, "api.svc.example.com."),
            vec![AddressRecord::a("api.svc.example.com.", "10.0.0.9", 60)]
        );
    }

    #[tokio::test]
    async fn test_upsert_removes_preexisting_duplicates() {
        let (backend, reconciler) = setup();
        backend.insert_record(ZONE, AddressRecord::a("api.svc.example.com.", "10.0.0.1", 300));
        backend.insert_record(ZONE, AddressRecord::a("api.svc.example.com.", "10.0.0.2", 300));

        let outcome = reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::Applied { deleted: 2, added: 1, .. }
        ));
        assert_eq!(
            a_records_named(&backend, "api.svc.example.com."),
            vec![AddressRecord::a("api.svc.example.com.", "10.0.0.5", 60)]
        );
    }

    #[tokio::test]
    async fn test_upsert_leaves_other_names_and_types_alone() {
        let (backend, reconciler) = setup();
        let sibling = AddressRecord::a("web.svc.example.com.", "10.0.0.7", 60);
        let txt = AddressRecord {
            record_type: "TXT".to_string(),
            ..AddressRecord::a("api.svc.example.com.", "\"owner=me\"", 60)
        };
        let nested = AddressRecord::a("x.api.svc.example.com.", "10.0.0.8", 60);
        backend.insert_record(ZONE, sibling.clone());
        backend.insert_record(ZONE, txt.clone());
        backend.insert_record(ZONE, nested.clone());

        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        let records = backend.records(ZONE);
        assert!(records.contains(&sibling));
        assert!(records.contains(&txt));
        assert!(records.contains(&nested));
        assert_eq!(records.len(), 4);
    }

    #[tokio::test]
    async fn test_upsert_rejects_zero_ttl_without_backend_calls() {
        let (backend, reconciler) = setup();

        let error = reconciler.upsert("api", "10.0.0.5", 0).await.unwrap_err();

        assert_eq!(
            error,
            DnsError::Record(RecordError::InvalidTtl {
                fqdn: "api.svc.example.com.".to_string(),
                ttl: 0,
            })
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let (backend, reconciler) = setup();
        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        let outcome = reconciler.delete("api").await.unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::Applied { deleted: 1, added: 0, .. }
        ));
        assert!(a_records_named(&backend, "api.svc.example.com.").is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_record_succeeds() {
        let (backend, reconciler) = setup();

        let outcome = reconciler.delete("api").await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert!(backend.submitted_changes().is_empty());
        assert!(a_records_named(&backend, "api.svc.example.com.").is_empty());
    }

    #[tokio::test]
    async fn test_delete_twice_is_idempotent() {
        let (backend, reconciler) = setup();
        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        reconciler.delete("api").await.unwrap();
        let second = reconciler.delete("api").await.unwrap();

        assert_eq!(second, ReconcileOutcome::Unchanged);
        assert!(a_records_named(&backend, "api.svc.example.com.").is_empty());
    }

    #[tokio::test]
    async fn test_operations_use_most_specific_zone() {
        let (backend, reconciler) = setup();

        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        assert!(backend.records("root-zone").is_empty());
        assert_eq!(backend.records(ZONE).len(), 1);
    }

    #[tokio::test]
    async fn test_zone_not_found() {
        let backend = Arc::new(InMemoryBackend::new("p").with_zone("other", "other.org."));
        let reconciler = RecordReconciler::new(backend.clone(), "svc.example.com", fast_policy());

        let error = reconciler.upsert("api", "10.0.0.5", 60).await.unwrap_err();

        assert!(matches!(error, DnsError::Zone(ZoneError::ZoneNotFound { .. })));
        assert!(backend.submitted_changes().is_empty());
    }

    #[tokio::test]
    async fn test_waits_for_pending_change() {
        let (backend, reconciler) = setup();
        backend.set_pending_polls(3);

        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        let polls = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::GetChange { .. }))
            .count();
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn test_done_on_submit_is_not_polled() {
        let (backend, reconciler) = setup();

        reconciler.upsert("api", "10.0.0.5", 60).await.unwrap();

        assert!(!backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::GetChange { .. })));
    }

    #[tokio::test]
    async fn test_change_that_never_completes_times_out() {
        let (backend, reconciler) = setup();
        backend.set_pending_polls(u32::MAX);

        let error = reconciler.upsert("api", "10.0.0.5", 60).await.unwrap_err();

        assert!(matches!(
            error,
            DnsError::Change(ChangeError::ChangeTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_unrecognized_terminal_status_is_an_error() {
        let (backend, reconciler) = setup();
        backend.set_pending_polls(1);
        backend.set_terminal_status(ChangeStatus::Other("failed".to_string()));

        let error = reconciler.upsert("api", "10.0.0.5", 60).await.unwrap_err();

        assert_eq!(
            error,
            DnsError::Change(ChangeError::ChangeFailed {
                zone: ZONE.to_string(),
                change_id: "1".to_string(),
                status: "failed".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_poll_error_aborts_without_retry() {
        let (backend, reconciler) = setup();
        backend.set_pending_polls(5);

        // list zones, list records and submit succeed; the first poll fails.
        let handle = tokio::spawn({
            let backend = backend.clone();
            async move {
                while backend.submitted_changes().is_empty() {
                    tokio::task::yield_now().await;
                }
                backend.fail_next(
                    BackendError::HttpConnectionFailed {
                        endpoint: "memory://changes".to_string(),
                        reason: "connection reset".to_string(),
                    }
                    .into(),
                );
            }
        });

        let result = reconciler.upsert("api", "10.0.0.5", 60).await;
        handle.await.unwrap();

        let error = result.unwrap_err();
        assert!(matches!(
            error,
            DnsError::Backend(BackendError::HttpConnectionFailed { .. })
        ));
        let polls = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::GetChange { .. }))
            .count();
        assert_eq!(polls, 1);
    }

    #[tokio::test]
    async fn test_list_failure_submits_nothing() {
        let (backend, reconciler) = setup();
        backend.fail_next(
            BackendError::UnexpectedHttpResponse {
                endpoint: "memory://zones".to_string(),
                status_code: 503,
                reason: "backendError".to_string(),
            }
            .into(),
        );

        let error = reconciler.delete("api").await.unwrap_err();

        assert!(error.is_transient());
        assert!(backend.submitted_changes().is_empty());
    }
}
