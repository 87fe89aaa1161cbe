//! Shared harness for engine integration tests
//!
//! Every test builds its own harness; nothing is shared across tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use committee_core::config::OrchestratorConfig;
use committee_core::errors::{CommitteeError, Result};
use committee_core::keys::ReservationKey;
use committee_core::messages::Channel;
use committee_core::model::{Committee, CommitteeMember, CommitteeSettings};
use committee_core::ports::{CommitteePublisher, CommitteeReader, CommitteeWriter};
use committee_engine::{ReadOrchestrator, WriteOrchestrator};
use committee_store::{
    KeyValueStore, KvCommitteeRepository, KvProjectReader, MemoryKv, ProjectRecord, CREATE_ONLY,
};

/// Publisher that records every message and can be told to fail
#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: Mutex<Vec<(Channel, String, Vec<u8>)>>,
    pub fail_indexer: AtomicBool,
    pub fail_access: AtomicBool,
}

impl RecordingPublisher {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s, _)| s.clone())
            .collect()
    }

    pub fn payloads_for(&self, subject: &str) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s, _)| s == subject)
            .map(|(_, _, p)| p.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl CommitteePublisher for RecordingPublisher {
    async fn indexer(&self, subject: &str, message: &[u8]) -> Result<()> {
        if self.fail_indexer.load(Ordering::SeqCst) {
            return Err(CommitteeError::Publish {
                subject: subject.to_string(),
                message: "indexer unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((Channel::Indexer, subject.to_string(), message.to_vec()));
        Ok(())
    }

    async fn access(&self, subject: &str, message: &[u8]) -> Result<()> {
        if self.fail_access.load(Ordering::SeqCst) {
            return Err(CommitteeError::Publish {
                subject: subject.to_string(),
                message: "access service unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((Channel::Access, subject.to_string(), message.to_vec()));
        Ok(())
    }
}

/// Repository wrapper with switchable faults
pub struct FaultyRepo {
    pub inner: KvCommitteeRepository,
    pub sso_always_taken: AtomicBool,
    pub sso_attempts: AtomicU32,
    pub fail_create: AtomicBool,
    pub hang_create: AtomicBool,
    pub fail_update_base: AtomicBool,
    pub fail_delete_reservation: AtomicBool,
}

impl FaultyRepo {
    pub fn new(inner: KvCommitteeRepository) -> Self {
        Self {
            inner,
            sso_always_taken: AtomicBool::new(false),
            sso_attempts: AtomicU32::new(0),
            fail_create: AtomicBool::new(false),
            hang_create: AtomicBool::new(false),
            fail_update_base: AtomicBool::new(false),
            fail_delete_reservation: AtomicBool::new(false),
        }
    }

    fn injected(what: &str) -> CommitteeError {
        CommitteeError::Storage {
            message: format!("injected {} failure", what),
        }
    }
}

#[async_trait]
impl CommitteeReader for FaultyRepo {
    async fn get_base(&self, uid: &str) -> Result<(Committee, u64)> {
        self.inner.get_base(uid).await
    }

    async fn get_revision(&self, uid: &str) -> Result<u64> {
        self.inner.get_revision(uid).await
    }

    async fn get_settings(&self, uid: &str) -> Result<(CommitteeSettings, u64)> {
        self.inner.get_settings(uid).await
    }

    async fn get_member(&self, member_uid: &str) -> Result<(CommitteeMember, u64)> {
        self.inner.get_member(member_uid).await
    }

    async fn get_member_revision(&self, member_uid: &str) -> Result<u64> {
        self.inner.get_member_revision(member_uid).await
    }

    async fn list_members(&self, committee_uid: &str) -> Result<Vec<CommitteeMember>> {
        self.inner.list_members(committee_uid).await
    }
}

#[async_trait]
impl CommitteeWriter for FaultyRepo {
    async fn create(
        &self,
        committee: &Committee,
        settings: Option<&CommitteeSettings>,
    ) -> Result<u64> {
        if self.hang_create.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::injected("create"));
        }
        self.inner.create(committee, settings).await
    }

    async fn update_base(&self, committee: &Committee, revision: u64) -> Result<u64> {
        if self.fail_update_base.load(Ordering::SeqCst) {
            return Err(Self::injected("update_base"));
        }
        self.inner.update_base(committee, revision).await
    }

    async fn update_settings(&self, settings: &CommitteeSettings, revision: u64) -> Result<u64> {
        self.inner.update_settings(settings, revision).await
    }

    async fn delete(&self, uid: &str, revision: u64) -> Result<()> {
        self.inner.delete(uid, revision).await
    }

    async fn create_member(&self, member: &CommitteeMember) -> Result<u64> {
        self.inner.create_member(member).await
    }

    async fn update_member(&self, member: &CommitteeMember, revision: u64) -> Result<u64> {
        self.inner.update_member(member, revision).await
    }

    async fn delete_member(&self, member_uid: &str, revision: u64) -> Result<()> {
        self.inner.delete_member(member_uid, revision).await
    }

    async fn unique_name_project(&self, committee: &Committee) -> Result<ReservationKey> {
        self.inner.unique_name_project(committee).await
    }

    async fn unique_sso_group_name(
        &self,
        committee_uid: &str,
        sso_group_name: &str,
    ) -> Result<ReservationKey> {
        self.sso_attempts.fetch_add(1, Ordering::SeqCst);
        if self.sso_always_taken.load(Ordering::SeqCst) {
            return Err(CommitteeError::SsoGroupNameTaken {
                sso_group_name: sso_group_name.to_string(),
                owner_uid: Some("someone-else".to_string()),
            });
        }
        self.inner
            .unique_sso_group_name(committee_uid, sso_group_name)
            .await
    }

    async fn unique_member(&self, member: &CommitteeMember) -> Result<ReservationKey> {
        self.inner.unique_member(member).await
    }

    async fn reservation_revision(&self, key: &ReservationKey) -> Result<u64> {
        self.inner.reservation_revision(key).await
    }

    async fn delete_reservation(&self, key: &ReservationKey, revision: u64) -> Result<()> {
        if self.fail_delete_reservation.load(Ordering::SeqCst) {
            return Err(Self::injected("delete_reservation"));
        }
        self.inner.delete_reservation(key, revision).await
    }
}

pub struct Harness {
    pub store: KvCommitteeRepository,
    pub repo: Arc<FaultyRepo>,
    pub publisher: Arc<RecordingPublisher>,
    pub writes: WriteOrchestrator,
    pub reads: ReadOrchestrator,
}

impl Harness {
    pub async fn new() -> Self {
        let store = KvCommitteeRepository::in_memory();
        let repo = Arc::new(FaultyRepo::new(store.clone()));
        let publisher = Arc::new(RecordingPublisher::default());

        let writes = WriteOrchestrator::new(
            seeded_projects().await,
            repo.clone(),
            publisher.clone(),
            test_config(),
        );
        let reads = ReadOrchestrator::new(Arc::new(store.clone()));

        Self {
            store,
            repo,
            publisher,
            writes,
            reads,
        }
    }

    /// Whether a reservation key currently exists
    pub async fn key_exists(&self, key: &str) -> bool {
        let bucket = if key.starts_with("lookup/committee-members/") {
            self.store.members_bucket()
        } else {
            self.store.committees_bucket()
        };
        bucket.get(key).await.is_ok()
    }

    /// All keys of the committees bucket, including lookups
    pub async fn committee_keys(&self) -> Vec<String> {
        self.store.committees_bucket().keys("").await.unwrap()
    }

    pub async fn member_keys(&self) -> Vec<String> {
        self.store.members_bucket().keys("").await.unwrap()
    }
}

/// Project reader holding `p1` and `p2`
pub async fn seeded_projects() -> Arc<KvProjectReader> {
    let projects = Arc::new(MemoryKv::new());
    for (uid, slug, name) in [("p1", "p1", "Project One"), ("p2", "p2", "Project Two")] {
        let record = ProjectRecord {
            uid: uid.to_string(),
            slug: slug.to_string(),
            name: name.to_string(),
        };
        projects
            .put(uid, serde_json::to_vec(&record).unwrap(), CREATE_ONLY)
            .await
            .unwrap();
    }
    Arc::new(KvProjectReader::new(projects))
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        stale_cleanup_timeout: Duration::from_secs(2),
        ..OrchestratorConfig::default()
    }
}

pub fn committee_input(project_uid: &str, name: &str, sso_group_enabled: bool) -> Committee {
    let mut c = Committee::draft(project_uid, name);
    c.category = "Technical Steering Committee".to_string();
    c.sso_group_enabled = sso_group_enabled;
    c
}

pub fn gac_input(project_uid: &str) -> Committee {
    let mut c = Committee::draft(project_uid, "GAC");
    c.category = committee_core::model::GOVERNMENT_ADVISORY_COUNCIL.to_string();
    c
}

pub fn member_input(email: &str) -> CommitteeMember {
    let mut m = CommitteeMember::draft("", email);
    m.first_name = "Jane".to_string();
    m.last_name = "Doe".to_string();
    m
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
