//! Collaborator interfaces consumed by the orchestrators
//!
//! The orchestrators depend only on these traits; the KV-backed repository
//! and the NATS publisher are the production implementations.

use async_trait::async_trait;

use crate::errors::Result;
use crate::keys::ReservationKey;
use crate::model::{Committee, CommitteeMember, CommitteeSettings};

/// Resolves project UIDs owned by the wider platform
#[async_trait]
pub trait ProjectReader: Send + Sync {
    /// # Errors
    ///
    /// `ProjectNotFound` for an unknown UID.
    async fn slug(&self, uid: &str) -> Result<String>;

    /// # Errors
    ///
    /// `ProjectNotFound` for an unknown UID.
    async fn name(&self, uid: &str) -> Result<String>;
}

/// Read side of committee persistence; every read returns the revision
#[async_trait]
pub trait CommitteeReader: Send + Sync {
    async fn get_base(&self, uid: &str) -> Result<(Committee, u64)>;

    async fn get_revision(&self, uid: &str) -> Result<u64>;

    async fn get_settings(&self, uid: &str) -> Result<(CommitteeSettings, u64)>;

    async fn get_member(&self, member_uid: &str) -> Result<(CommitteeMember, u64)>;

    async fn get_member_revision(&self, member_uid: &str) -> Result<u64>;

    async fn list_members(&self, committee_uid: &str) -> Result<Vec<CommitteeMember>>;
}

/// Write side of committee persistence
///
/// Every mutation is revision-gated; an expected revision of 0 means
/// create-only. The `unique_*` methods are create-only writes of reservation
/// keys whose value is the owning UID.
#[async_trait]
pub trait CommitteeWriter: CommitteeReader {
    /// Create base and (optionally) settings; returns the base revision
    async fn create(
        &self,
        committee: &Committee,
        settings: Option<&CommitteeSettings>,
    ) -> Result<u64>;

    async fn update_base(&self, committee: &Committee, revision: u64) -> Result<u64>;

    async fn update_settings(&self, settings: &CommitteeSettings, revision: u64) -> Result<u64>;

    /// Delete the base record (gated by `revision`) and its settings
    async fn delete(&self, uid: &str, revision: u64) -> Result<()>;

    async fn create_member(&self, member: &CommitteeMember) -> Result<u64>;

    async fn update_member(&self, member: &CommitteeMember, revision: u64) -> Result<u64>;

    async fn delete_member(&self, member_uid: &str, revision: u64) -> Result<()>;

    /// # Errors
    ///
    /// `NameTaken` carrying the current owner when the key exists.
    async fn unique_name_project(&self, committee: &Committee) -> Result<ReservationKey>;

    /// # Errors
    ///
    /// `SsoGroupNameTaken` carrying the current owner when the key exists.
    async fn unique_sso_group_name(
        &self,
        committee_uid: &str,
        sso_group_name: &str,
    ) -> Result<ReservationKey>;

    /// # Errors
    ///
    /// `MemberAlreadyExists` carrying the current owner when the key exists.
    async fn unique_member(&self, member: &CommitteeMember) -> Result<ReservationKey>;

    async fn reservation_revision(&self, key: &ReservationKey) -> Result<u64>;

    async fn delete_reservation(&self, key: &ReservationKey, revision: u64) -> Result<()>;
}

/// Downstream notification sink
///
/// Subjects are opaque routing strings; implementations must not interpret
/// them.
#[async_trait]
pub trait CommitteePublisher: Send + Sync {
    async fn indexer(&self, subject: &str, message: &[u8]) -> Result<()>;

    async fn access(&self, subject: &str, message: &[u8]) -> Result<()>;
}
