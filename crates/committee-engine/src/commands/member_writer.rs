//! Member create/update/delete
//!
//! Members are unique per `(committee_uid, email)`. Creating a member also
//! bumps the committee's member counter, retrying when another writer moved
//! the committee; if that still fails the member record and its reservation
//! are compensated.

use chrono::Utc;
use committee_core::committee_core_types::{RequestContext, Sensitive};
use committee_core::errors::{CommitteeError, Result};
use committee_core::keys::ReservationKey;
use committee_core::messages::{self, subjects, MessageAction, OutboundMessage};
use committee_core::model::CommitteeMember;
use committee_core::{cancellable, log_op_end, log_op_error, log_op_start};
use uuid::Uuid;

use super::orchestrator::WriteOrchestrator;
use super::reservations::{self, RollbackGuard};

/// Bound on re-reads of the committee when its member counter write races
const COUNTER_MAX_ATTEMPTS: u32 = 64;

impl WriteOrchestrator {
    /// Add a member to a committee
    ///
    /// ## Errors
    ///
    /// - `CommitteeNotFound`: unknown committee
    /// - `InvalidInput` / `MissingRequiredFields`: validation failures
    /// - `MemberAlreadyExists`: the e-mail is already a member
    /// - `RevisionMismatch`: the committee kept moving through every counter
    ///   attempt
    pub async fn create_member(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
        member: CommitteeMember,
    ) -> Result<(CommitteeMember, u64)> {
        log_op_start!(
            "create_member",
            committee_uid = %committee_uid,
            email = %Sensitive::new(member.email.clone()),
            request_id = ctx.request_id.as_str()
        );
        let start = std::time::Instant::now();

        let (created, revision) = self
            .create_member_impl(ctx, committee_uid, member)
            .await
            .map_err(|e| {
                log_op_error!(
                    "create_member",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    committee_uid = %committee_uid
                );
                e
            })?;

        log_op_end!(
            "create_member",
            duration_ms = start.elapsed().as_millis() as u64,
            member_uid = %created.uid
        );
        Ok((created, revision))
    }

    async fn create_member_impl(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
        mut member: CommitteeMember,
    ) -> Result<(CommitteeMember, u64)> {
        const OP: &str = "create_member";

        let (committee, _) = cancellable(ctx, OP, self.repo.get_base(committee_uid)).await?;

        member.committee_uid = committee_uid.to_string();
        member.validate_for(&committee)?;

        let now = Utc::now();
        member.uid = Uuid::new_v4().to_string();
        member.created_at = now;
        member.updated_at = now;

        let mut guard = RollbackGuard::new(self.repo.clone(), OP);
        let written = self.reserve_and_write_member(ctx, &member, &mut guard).await;
        let revision = match written {
            Ok(revision) => {
                guard.disarm();
                revision
            }
            Err(e) => {
                guard.rollback().await;
                return Err(e);
            }
        };

        let outgoing = member_messages(MessageAction::Created, &member);
        self.publish_best_effort(ctx, OP, &member.uid, outgoing)
            .await;

        Ok((member, revision))
    }

    async fn reserve_and_write_member(
        &self,
        ctx: &RequestContext,
        member: &CommitteeMember,
        guard: &mut RollbackGuard,
    ) -> Result<u64> {
        const OP: &str = "create_member";

        let key = cancellable(ctx, OP, self.repo.unique_member(member)).await?;
        guard.track(key);

        let revision = cancellable(ctx, OP, self.repo.create_member(member)).await?;
        guard.track_member_record(member.uid.clone(), revision);

        self.adjust_total_members(ctx, OP, &member.committee_uid, 1)
            .await?;
        Ok(revision)
    }

    /// Revision-gated read-modify-write of the committee's member counter
    ///
    /// The caller never holds the committee's revision, so a write that loses
    /// to another writer re-reads and tries again, up to
    /// `COUNTER_MAX_ATTEMPTS` times.
    async fn adjust_total_members(
        &self,
        ctx: &RequestContext,
        op: &str,
        committee_uid: &str,
        delta: i64,
    ) -> Result<u64> {
        let mut attempt = 1;
        loop {
            let (mut committee, revision) =
                cancellable(ctx, op, self.repo.get_base(committee_uid)).await?;
            let total = i64::from(committee.total_members) + delta;
            committee.total_members = u32::try_from(total.max(0)).unwrap_or(u32::MAX);
            match cancellable(ctx, op, self.repo.update_base(&committee, revision)).await {
                Err(CommitteeError::RevisionMismatch { .. }) if attempt < COUNTER_MAX_ATTEMPTS => {
                    tracing::debug!(
                        committee_uid = %committee_uid,
                        attempt,
                        "member counter raced another writer; retrying"
                    );
                    attempt += 1;
                    tokio::task::yield_now().await;
                }
                result => return result,
            }
        }
    }

    /// Update a member under optimistic concurrency
    ///
    /// An e-mail change reserves the new address first; the old reservation
    /// is released off the caller's path once the write commits.
    ///
    /// ## Errors
    ///
    /// - `MemberNotFound`: unknown member, or not a member of `committee_uid`
    /// - `RevisionMismatch`: the member moved past `revision`
    /// - `CommitteeNotFound`, validation errors, `MemberAlreadyExists`
    pub async fn update_member(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
        member: CommitteeMember,
        revision: u64,
    ) -> Result<(CommitteeMember, u64)> {
        log_op_start!(
            "update_member",
            committee_uid = %committee_uid,
            member_uid = %member.uid,
            request_id = ctx.request_id.as_str()
        );
        let start = std::time::Instant::now();

        let result = self
            .update_member_impl(ctx, committee_uid, member, revision)
            .await
            .map_err(|e| {
                log_op_error!(
                    "update_member",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "update_member",
            duration_ms = start.elapsed().as_millis() as u64,
            member_uid = %result.0.uid
        );
        Ok(result)
    }

    async fn update_member_impl(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
        mut member: CommitteeMember,
        revision: u64,
    ) -> Result<(CommitteeMember, u64)> {
        const OP: &str = "update_member";

        let existing = self
            .load_member_at_revision(ctx, OP, committee_uid, &member.uid, revision)
            .await?;
        let (committee, _) = cancellable(ctx, OP, self.repo.get_base(committee_uid)).await?;

        member.committee_uid = committee_uid.to_string();
        member.validate_for(&committee)?;

        let mut guard = RollbackGuard::new(self.repo.clone(), OP);
        let mut stale = Vec::new();
        let new_key = ReservationKey::member(&member);
        let reserved = if new_key != ReservationKey::member(&existing) {
            match cancellable(ctx, OP, self.repo.unique_member(&member)).await {
                Ok(key) => {
                    guard.track(key);
                    stale.extend(new_key.rebuild_for(&existing));
                    Ok(())
                }
                Err(e) => Err(e),
            }
        } else {
            Ok(())
        };

        member.created_at = existing.created_at;
        member.updated_at = Utc::now();

        let written = match reserved {
            Ok(()) => cancellable(ctx, OP, self.repo.update_member(&member, revision)).await,
            Err(e) => Err(e),
        };
        let new_revision = match written {
            Ok(rev) => {
                guard.disarm();
                rev
            }
            Err(e) => {
                guard.rollback().await;
                return Err(e);
            }
        };

        self.spawn_stale_cleanup(OP, stale);

        let outgoing = member_messages(MessageAction::Updated, &member);
        self.publish_best_effort(ctx, OP, &member.uid, outgoing)
            .await;

        Ok((member, new_revision))
    }

    /// Remove a member from a committee
    ///
    /// ## Errors
    ///
    /// - `MemberNotFound`, `RevisionMismatch`: gate failures
    /// - `Publish` / `Cancelled`: downstream systems were not told; the
    ///   member is already gone
    pub async fn delete_member(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
        member_uid: &str,
        revision: u64,
    ) -> Result<()> {
        log_op_start!(
            "delete_member",
            committee_uid = %committee_uid,
            member_uid = %member_uid,
            request_id = ctx.request_id.as_str()
        );
        let start = std::time::Instant::now();

        self.delete_member_impl(ctx, committee_uid, member_uid, revision)
            .await
            .map_err(|e| {
                log_op_error!(
                    "delete_member",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    member_uid = %member_uid
                );
                e
            })?;

        log_op_end!(
            "delete_member",
            duration_ms = start.elapsed().as_millis() as u64,
            member_uid = %member_uid
        );
        Ok(())
    }

    async fn delete_member_impl(
        &self,
        ctx: &RequestContext,
        committee_uid: &str,
        member_uid: &str,
        revision: u64,
    ) -> Result<()> {
        const OP: &str = "delete_member";

        let existing = self
            .load_member_at_revision(ctx, OP, committee_uid, member_uid, revision)
            .await?;

        cancellable(ctx, OP, self.repo.delete_member(member_uid, revision)).await?;

        reservations::release_one(self.repo.as_ref(), OP, &ReservationKey::member(&existing))
            .await;

        if let Err(e) = self.adjust_total_members(ctx, OP, committee_uid, -1).await {
            tracing::warn!(
                committee_uid = %committee_uid,
                error = %e,
                "member counter left stale after delete"
            );
        }

        let outgoing = vec![
            messages::index_deleted(subjects::INDEX_COMMITTEE_MEMBER, member_uid)?,
            messages::access_member(subjects::ACCESS_MEMBER_REMOVE, &existing)?,
        ];
        self.publish(ctx, outgoing).await
    }

    async fn load_member_at_revision(
        &self,
        ctx: &RequestContext,
        op: &str,
        committee_uid: &str,
        member_uid: &str,
        revision: u64,
    ) -> Result<CommitteeMember> {
        let (existing, current) = cancellable(ctx, op, self.repo.get_member(member_uid)).await?;
        if existing.committee_uid != committee_uid {
            return Err(CommitteeError::MemberNotFound {
                uid: member_uid.to_string(),
            });
        }
        if current != revision {
            return Err(CommitteeError::RevisionMismatch {
                entity: "member",
                uid: member_uid.to_string(),
                expected: revision,
                actual: current,
            });
        }
        Ok(existing)
    }
}

fn member_messages(
    action: MessageAction,
    member: &CommitteeMember,
) -> Result<Vec<OutboundMessage>> {
    Ok(vec![
        messages::index_member(action, member)?,
        messages::access_member(subjects::ACCESS_MEMBER_PUT, member)?,
    ])
}
