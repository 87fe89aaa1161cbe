//! Read orchestrator
//!
//! A thin pass-through over the reader port with no consistency concerns of
//! its own.

use std::sync::Arc;

use committee_core::committee_core_types::RequestContext;
use committee_core::errors::{CommitteeError, Result};
use committee_core::model::{Committee, CommitteeMember, CommitteeSettings};
use committee_core::ports::CommitteeReader;
use committee_core::cancellable;

use super::attributes::CommitteeAttribute;

#[derive(Clone)]
pub struct ReadOrchestrator {
    reader: Arc<dyn CommitteeReader>,
}

impl ReadOrchestrator {
    pub fn new(reader: Arc<dyn CommitteeReader>) -> Self {
        Self { reader }
    }

    pub async fn get_committee(&self, ctx: &RequestContext, uid: &str) -> Result<(Committee, u64)> {
        cancellable(ctx, "get_committee", self.reader.get_base(uid)).await
    }

    pub async fn get_settings(
        &self,
        ctx: &RequestContext,
        uid: &str,
    ) -> Result<(CommitteeSettings, u64)> {
        cancellable(ctx, "get_committee_settings", self.reader.get_settings(uid)).await
    }

    /// # Errors
    ///
    /// `MemberNotFound` when the member does not belong to `committee_uid`.
    pub async fn get_member(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
        member_uid: &str,
    ) -> Result<(CommitteeMember, u64)> {
        let (member, revision) =
            cancellable(ctx, "get_member", self.reader.get_member(member_uid)).await?;
        if member.committee_uid != committee_uid {
            return Err(CommitteeError::MemberNotFound {
                uid: member_uid.to_string(),
            });
        }
        Ok((member, revision))
    }

    /// # Errors
    ///
    /// `CommitteeNotFound` for an unknown committee.
    pub async fn list_members(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
    ) -> Result<Vec<CommitteeMember>> {
        cancellable(ctx, "list_members", self.reader.get_revision(committee_uid)).await?;
        cancellable(ctx, "list_members", self.reader.list_members(committee_uid)).await
    }

    /// # Errors
    ///
    /// `UnknownAttribute` before any read when `attribute` is not in the
    /// table; `CommitteeNotFound` for an unknown UID.
    pub async fn get_attribute(
        &self,
        ctx: &RequestContext,
        uid: &str,
        attribute: &str,
    ) -> Result<String> {
        let attribute: CommitteeAttribute = attribute.parse()?;
        let (committee, _) = self.get_committee(ctx, uid).await?;
        Ok(attribute.value(&committee))
    }
}
