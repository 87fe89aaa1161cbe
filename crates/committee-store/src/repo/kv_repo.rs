//! Key-value backed committee repository
//!
//! Three buckets: committees (base records plus name/SSO lookups), settings,
//! and members (member records plus member lookups). Every mutation is a
//! revision-gated write; reservation keys are create-only writes whose value
//! is the owning UID.

use std::sync::Arc;

use async_trait::async_trait;
use committee_core::errors::{CommitteeError, Result};
use committee_core::keys::{ReservationKey, ReservationKind, MEMBER_LOOKUP_PREFIX};
use committee_core::model::{Committee, CommitteeMember, CommitteeSettings};
use committee_core::ports::{CommitteeReader, CommitteeWriter};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{decode_error, owner_from_value};
use crate::kv::{KeyValueStore, MemoryKv, CREATE_ONLY};

#[derive(Clone)]
pub struct KvCommitteeRepository {
    committees: Arc<dyn KeyValueStore>,
    settings: Arc<dyn KeyValueStore>,
    members: Arc<dyn KeyValueStore>,
}

impl KvCommitteeRepository {
    pub fn new(
        committees: Arc<dyn KeyValueStore>,
        settings: Arc<dyn KeyValueStore>,
        members: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            committees,
            settings,
            members,
        }
    }

    /// Repository over three fresh in-memory buckets
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryKv::new()),
        )
    }

    pub fn committees_bucket(&self) -> &Arc<dyn KeyValueStore> {
        &self.committees
    }

    pub fn settings_bucket(&self) -> &Arc<dyn KeyValueStore> {
        &self.settings
    }

    pub fn members_bucket(&self) -> &Arc<dyn KeyValueStore> {
        &self.members
    }

    fn bucket_for(&self, kind: ReservationKind) -> &dyn KeyValueStore {
        match kind {
            ReservationKind::NameProject | ReservationKind::SsoGroupName => {
                self.committees.as_ref()
            }
            ReservationKind::MemberEmail => self.members.as_ref(),
        }
    }

    async fn read<T: DeserializeOwned>(bucket: &dyn KeyValueStore, key: &str) -> Result<(T, u64)> {
        let entry = bucket.get(key).await?;
        let value = serde_json::from_slice(&entry.value).map_err(|e| decode_error(key, e))?;
        Ok((value, entry.revision))
    }

    /// Create-only write of a reservation key
    async fn reserve(&self, key: &ReservationKey, owner_uid: &str) -> Result<Claim> {
        let bucket = self.bucket_for(key.kind());
        match bucket
            .put(key.as_str(), owner_uid.as_bytes().to_vec(), CREATE_ONLY)
            .await
        {
            Ok(_) => Ok(Claim::Acquired),
            Err(CommitteeError::KeyExists { .. }) => {
                let owner = bucket
                    .get(key.as_str())
                    .await
                    .ok()
                    .and_then(|e| owner_from_value(&e.value));
                tracing::debug!(key = %key, owner = ?owner, "reservation already held");
                Ok(Claim::Held { owner })
            }
            Err(e) => Err(e),
        }
    }
}

enum Claim {
    Acquired,
    Held { owner: Option<String> },
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Translate key-level errors of a record write into entity errors
async fn entity_error(
    bucket: &dyn KeyValueStore,
    entity: &'static str,
    uid: &str,
    expected: u64,
    err: CommitteeError,
) -> CommitteeError {
    match err {
        CommitteeError::KeyNotFound { .. } => match entity {
            "member" => CommitteeError::MemberNotFound {
                uid: uid.to_string(),
            },
            "committee settings" => CommitteeError::SettingsNotFound {
                uid: uid.to_string(),
            },
            _ => CommitteeError::CommitteeNotFound {
                uid: uid.to_string(),
            },
        },
        CommitteeError::KeyRevisionMismatch { .. } => {
            let actual = bucket.get(uid).await.map(|e| e.revision).unwrap_or(0);
            CommitteeError::RevisionMismatch {
                entity,
                uid: uid.to_string(),
                expected,
                actual,
            }
        }
        other => other,
    }
}

#[async_trait]
impl CommitteeReader for KvCommitteeRepository {
    async fn get_base(&self, uid: &str) -> Result<(Committee, u64)> {
        Self::read(self.committees.as_ref(), uid)
            .await
            .map_err(|e| match e {
                CommitteeError::KeyNotFound { .. } => CommitteeError::CommitteeNotFound {
                    uid: uid.to_string(),
                },
                other => other,
            })
    }

    async fn get_revision(&self, uid: &str) -> Result<u64> {
        self.get_base(uid).await.map(|(_, rev)| rev)
    }

    async fn get_settings(&self, uid: &str) -> Result<(CommitteeSettings, u64)> {
        Self::read(self.settings.as_ref(), uid)
            .await
            .map_err(|e| match e {
                CommitteeError::KeyNotFound { .. } => CommitteeError::SettingsNotFound {
                    uid: uid.to_string(),
                },
                other => other,
            })
    }

    async fn get_member(&self, member_uid: &str) -> Result<(CommitteeMember, u64)> {
        Self::read(self.members.as_ref(), member_uid)
            .await
            .map_err(|e| match e {
                CommitteeError::KeyNotFound { .. } => CommitteeError::MemberNotFound {
                    uid: member_uid.to_string(),
                },
                other => other,
            })
    }

    async fn get_member_revision(&self, member_uid: &str) -> Result<u64> {
        self.get_member(member_uid).await.map(|(_, rev)| rev)
    }

    async fn list_members(&self, committee_uid: &str) -> Result<Vec<CommitteeMember>> {
        let prefix = format!("{}/{}/", MEMBER_LOOKUP_PREFIX, committee_uid);
        let mut members = Vec::new();
        for key in self.members.keys(&prefix).await? {
            let owner = match self.members.get(&key).await {
                Ok(entry) => owner_from_value(&entry.value),
                Err(CommitteeError::KeyNotFound { .. }) => None,
                Err(e) => return Err(e),
            };
            let Some(member_uid) = owner else { continue };
            // A leaked lookup may point at a member that is gone or moved.
            match self.get_member(&member_uid).await {
                Ok((member, _)) if member.committee_uid == committee_uid => members.push(member),
                Ok(_) | Err(CommitteeError::MemberNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        members.sort_by(|a, b| a.uid.cmp(&b.uid));
        members.dedup_by(|a, b| a.uid == b.uid);
        Ok(members)
    }
}

#[async_trait]
impl CommitteeWriter for KvCommitteeRepository {
    async fn create(
        &self,
        committee: &Committee,
        settings: Option<&CommitteeSettings>,
    ) -> Result<u64> {
        let revision = self
            .committees
            .put(&committee.uid, encode(committee)?, CREATE_ONLY)
            .await?;

        let Some(settings) = settings else {
            return Ok(revision);
        };

        let written = match encode(settings) {
            Ok(bytes) => self.settings.put(&settings.uid, bytes, CREATE_ONLY).await,
            Err(e) => Err(e),
        };
        if let Err(err) = written {
            if let Err(cleanup) = self.committees.delete(&committee.uid, revision).await {
                tracing::error!(
                    committee_uid = %committee.uid,
                    error = %cleanup,
                    "failed to remove base record after settings write failure"
                );
            }
            return Err(err);
        }
        Ok(revision)
    }

    async fn update_base(&self, committee: &Committee, revision: u64) -> Result<u64> {
        let bytes = encode(committee)?;
        match self.committees.put(&committee.uid, bytes, revision).await {
            Ok(rev) => Ok(rev),
            Err(e) => Err(entity_error(
                self.committees.as_ref(),
                "committee",
                &committee.uid,
                revision,
                e,
            )
            .await),
        }
    }

    async fn update_settings(&self, settings: &CommitteeSettings, revision: u64) -> Result<u64> {
        let bytes = encode(settings)?;
        match self.settings.put(&settings.uid, bytes, revision).await {
            Ok(rev) => Ok(rev),
            Err(e) => Err(entity_error(
                self.settings.as_ref(),
                "committee settings",
                &settings.uid,
                revision,
                e,
            )
            .await),
        }
    }

    async fn delete(&self, uid: &str, revision: u64) -> Result<()> {
        if let Err(e) = self.committees.delete(uid, revision).await {
            return Err(entity_error(self.committees.as_ref(), "committee", uid, revision, e).await);
        }

        // Base is gone; settings removal is best-effort.
        let settings_removed = match self.settings.get(uid).await {
            Ok(entry) => self.settings.delete(uid, entry.revision).await,
            Err(e) => Err(e),
        };
        match settings_removed {
            Ok(()) | Err(CommitteeError::KeyNotFound { .. }) => {}
            Err(e) => tracing::warn!(
                committee_uid = %uid,
                error = %e,
                "orphaned committee settings left behind"
            ),
        }
        Ok(())
    }

    async fn create_member(&self, member: &CommitteeMember) -> Result<u64> {
        self.members
            .put(&member.uid, encode(member)?, CREATE_ONLY)
            .await
    }

    async fn update_member(&self, member: &CommitteeMember, revision: u64) -> Result<u64> {
        let bytes = encode(member)?;
        match self.members.put(&member.uid, bytes, revision).await {
            Ok(rev) => Ok(rev),
            Err(e) => {
                Err(entity_error(self.members.as_ref(), "member", &member.uid, revision, e).await)
            }
        }
    }

    async fn delete_member(&self, member_uid: &str, revision: u64) -> Result<()> {
        match self.members.delete(member_uid, revision).await {
            Ok(()) => Ok(()),
            Err(e) => {
                Err(entity_error(self.members.as_ref(), "member", member_uid, revision, e).await)
            }
        }
    }

    async fn unique_name_project(&self, committee: &Committee) -> Result<ReservationKey> {
        let key = ReservationKey::name_project(committee);
        match self.reserve(&key, &committee.uid).await? {
            Claim::Acquired => Ok(key),
            Claim::Held { owner: owner_uid } => Err(CommitteeError::NameTaken {
                project_uid: committee.project_uid.clone(),
                name: committee.name.clone(),
                owner_uid,
            }),
        }
    }

    async fn unique_sso_group_name(
        &self,
        committee_uid: &str,
        sso_group_name: &str,
    ) -> Result<ReservationKey> {
        let key = ReservationKey::sso_group_name(sso_group_name);
        match self.reserve(&key, committee_uid).await? {
            Claim::Acquired => Ok(key),
            Claim::Held { owner: owner_uid } => Err(CommitteeError::SsoGroupNameTaken {
                sso_group_name: sso_group_name.to_string(),
                owner_uid,
            }),
        }
    }

    async fn unique_member(&self, member: &CommitteeMember) -> Result<ReservationKey> {
        let key = ReservationKey::member(member);
        match self.reserve(&key, &member.uid).await? {
            Claim::Acquired => Ok(key),
            Claim::Held { owner: owner_uid } => Err(CommitteeError::MemberAlreadyExists {
                committee_uid: member.committee_uid.clone(),
                owner_uid,
            }),
        }
    }

    async fn reservation_revision(&self, key: &ReservationKey) -> Result<u64> {
        Ok(self.bucket_for(key.kind()).get(key.as_str()).await?.revision)
    }

    async fn delete_reservation(&self, key: &ReservationKey, revision: u64) -> Result<()> {
        self.bucket_for(key.kind())
            .delete(key.as_str(), revision)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committee(uid: &str, name: &str) -> Committee {
        let mut c = Committee::draft("p1", name);
        c.uid = uid.to_string();
        c
    }

    #[tokio::test]
    async fn test_second_reservation_reports_owner() {
        let repo = KvCommitteeRepository::in_memory();
        repo.unique_name_project(&committee("c1", "TSC"))
            .await
            .unwrap();

        let err = repo
            .unique_name_project(&committee("c2", "tsc"))
            .await
            .unwrap_err();
        match err {
            CommitteeError::NameTaken { owner_uid, .. } => {
                assert_eq!(owner_uid.as_deref(), Some("c1"))
            }
            other => panic!("Expected NameTaken, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_settings_failure_removes_base() {
        let repo = KvCommitteeRepository::in_memory();
        let c = committee("c1", "TSC");
        let settings = CommitteeSettings {
            uid: "c1".into(),
            ..Default::default()
        };
        // Pre-existing settings make the create-only settings write fail.
        repo.settings_bucket()
            .put("c1", b"{}".to_vec(), CREATE_ONLY)
            .await
            .unwrap();

        let err = repo.create(&c, Some(&settings)).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(repo.get_base("c1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_stale_update_is_revision_mismatch() {
        let repo = KvCommitteeRepository::in_memory();
        let mut c = committee("c1", "TSC");
        let rev = repo.create(&c, None).await.unwrap();

        c.description = "first".into();
        repo.update_base(&c, rev).await.unwrap();

        c.description = "second".into();
        match repo.update_base(&c, rev).await.unwrap_err() {
            CommitteeError::RevisionMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, rev);
                assert!(actual > rev);
            }
            other => panic!("Expected RevisionMismatch, got {:?}", other),
        }
    }
}
