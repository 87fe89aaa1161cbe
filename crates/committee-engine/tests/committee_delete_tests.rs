// Integration tests for committee deletion

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use common::{committee_input, seeded_projects, test_config, Harness};
use committee_core::committee_core_types::RequestContext;
use committee_core::errors::{CommitteeError, ExErrorKind, Result};
use committee_core::messages::{subjects, IndexerMessage, MessageAction};
use committee_core::ports::{CommitteePublisher, CommitteeReader};
use committee_engine::WriteOrchestrator;
use committee_store::KvCommitteeRepository;
use mockall::mock;

mock! {
    pub Publisher {}

    #[async_trait]
    impl CommitteePublisher for Publisher {
        async fn indexer(&self, subject: &str, message: &[u8]) -> Result<()>;
        async fn access(&self, subject: &str, message: &[u8]) -> Result<()>;
    }
}

#[tokio::test]
async fn test_delete_releases_keys_for_reuse() {
    let h = Harness::new().await;
    let ctx = RequestContext::new();
    let (created, revision) = h
        .writes
        .create_committee(&ctx, committee_input("p1", "TSC", true), None)
        .await
        .unwrap();

    h.writes
        .delete_committee(&ctx, &created.uid, revision)
        .await
        .unwrap();

    assert!(matches!(
        h.store.get_base(&created.uid).await,
        Err(CommitteeError::CommitteeNotFound { .. })
    ));
    assert!(matches!(
        h.store.get_settings(&created.uid).await,
        Err(CommitteeError::SettingsNotFound { .. })
    ));
    assert!(h.committee_keys().await.is_empty());

    // Same name and same SSO group name are available again
    let (again, _) = h
        .writes
        .create_committee(&ctx, committee_input("p1", "TSC", true), None)
        .await
        .unwrap();
    assert_eq!(again.sso_group_name, "p1-tsc");
}

#[tokio::test]
async fn test_delete_publishes_deletions() {
    let h = Harness::new().await;
    let ctx = RequestContext::new();
    let (created, revision) = h
        .writes
        .create_committee(&ctx, committee_input("p1", "TSC", false), None)
        .await
        .unwrap();
    h.publisher.clear();

    h.writes
        .delete_committee(&ctx, &created.uid, revision)
        .await
        .unwrap();

    let mut sent = h.publisher.subjects();
    sent.sort();
    assert_eq!(
        sent,
        vec![
            subjects::ACCESS_COMMITTEE_DELETE_ALL.to_string(),
            subjects::INDEX_COMMITTEE.to_string(),
            subjects::INDEX_COMMITTEE_SETTINGS.to_string(),
        ]
    );
    let payload = &h.publisher.payloads_for(subjects::INDEX_COMMITTEE)[0];
    let message: IndexerMessage = serde_json::from_slice(payload).unwrap();
    assert_eq!(message.action, MessageAction::Deleted);
    assert_eq!(
        h.publisher.payloads_for(subjects::ACCESS_COMMITTEE_DELETE_ALL)[0],
        created.uid.as_bytes()
    );
}

#[tokio::test]
async fn test_delete_with_stale_revision_is_rejected() {
    let h = Harness::new().await;
    let ctx = RequestContext::new();
    let (created, revision) = h
        .writes
        .create_committee(&ctx, committee_input("p1", "TSC", true), None)
        .await
        .unwrap();
    let keys = h.committee_keys().await;

    let err = h
        .writes
        .delete_committee(&ctx, &created.uid, revision + 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Conflict);
    assert!(h.store.get_base(&created.uid).await.is_ok());
    assert_eq!(h.committee_keys().await, keys);
}

#[tokio::test]
async fn test_delete_of_unknown_committee() {
    let h = Harness::new().await;
    let err = h
        .writes
        .delete_committee(&RequestContext::new(), "missing", 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_surfaces_publish_failure_after_commit() {
    let h = Harness::new().await;
    let ctx = RequestContext::new();
    let (created, revision) = h
        .writes
        .create_committee(&ctx, committee_input("p1", "TSC", false), None)
        .await
        .unwrap();

    h.publisher.fail_access.store(true, Ordering::SeqCst);
    let err = h
        .writes
        .delete_committee(&ctx, &created.uid, revision)
        .await
        .unwrap_err();

    assert!(matches!(err, CommitteeError::Publish { .. }));
    // The delete itself stands
    assert!(h.store.get_base(&created.uid).await.is_err());
    assert!(h.committee_keys().await.is_empty());
}

#[tokio::test]
async fn test_delete_sends_each_message_once() {
    let store = KvCommitteeRepository::in_memory();
    let mut publisher = MockPublisher::new();
    publisher
        .expect_indexer()
        .times(4)
        .returning(|_, _| Ok(()));
    publisher
        .expect_access()
        .withf(|subject, _| subject.to_string() == subjects::ACCESS_COMMITTEE_UPDATE)
        .times(1)
        .returning(|_, _| Ok(()));
    publisher
        .expect_access()
        .withf(|subject, payload| {
            subject.to_string() == subjects::ACCESS_COMMITTEE_DELETE_ALL && !payload.is_empty()
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let writes = WriteOrchestrator::new(
        seeded_projects().await,
        Arc::new(store.clone()),
        Arc::new(publisher),
        test_config(),
    );
    let ctx = RequestContext::new();
    let (created, revision) = writes
        .create_committee(&ctx, committee_input("p1", "TSC", false), None)
        .await
        .unwrap();
    writes
        .delete_committee(&ctx, &created.uid, revision)
        .await
        .unwrap();
}
