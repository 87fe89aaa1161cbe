//! Committee create/update/delete and settings update
//!
//! Each public operation wraps an `_impl` with boundary logging. Steps run
//! strictly in order: existence checks, reservations, primary write,
//! publish.

use chrono::Utc;
use committee_core::committee_core_types::RequestContext;
use committee_core::errors::{CommitteeError, Result};
use committee_core::keys::{Reservable, ReservationKey};
use committee_core::messages::{self, subjects, MessageAction, OutboundMessage};
use committee_core::model::{Committee, CommitteeSettings};
use committee_core::{cancellable, log_op_end, log_op_error, log_op_start};
use uuid::Uuid;

use super::orchestrator::WriteOrchestrator;
use super::reservations::{self, RollbackGuard};

impl WriteOrchestrator {
    /// Create a committee with its settings
    ///
    /// `uid`, timestamps, `sso_group_name` and the member counter are assigned
    /// here; caller-supplied values are ignored. Missing settings default to
    /// empty writer/auditor lists.
    ///
    /// ## Errors
    ///
    /// - `InvalidInput`: blank project or name
    /// - `ProjectNotFound` / `ParentNotFound`: unresolved references
    /// - `NameTaken`: `(project_uid, name)` already reserved
    /// - `RetriesExhausted`: no free SSO group name within the attempt bound
    ///
    /// Publishing is best-effort and never fails the call.
    pub async fn create_committee(
        &self,
        ctx: &RequestContext,
        committee: Committee,
        settings: Option<CommitteeSettings>,
    ) -> Result<(Committee, u64)> {
        log_op_start!(
            "create_committee",
            project_uid = %committee.project_uid,
            request_id = ctx.request_id.as_str()
        );
        let start = std::time::Instant::now();

        let (created, revision) = self
            .create_committee_impl(ctx, committee, settings)
            .await
            .map_err(|e| {
                log_op_error!(
                    "create_committee",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "create_committee",
            duration_ms = start.elapsed().as_millis() as u64,
            committee_uid = %created.uid
        );
        Ok((created, revision))
    }

    async fn create_committee_impl(
        &self,
        ctx: &RequestContext,
        mut committee: Committee,
        settings: Option<CommitteeSettings>,
    ) -> Result<(Committee, u64)> {
        const OP: &str = "create_committee";

        committee.validate()?;

        let now = Utc::now();
        committee.uid = Uuid::new_v4().to_string();
        committee.created_at = now;
        committee.updated_at = now;
        committee.sso_group_name.clear();
        committee.total_members = 0;

        let slug = cancellable(ctx, OP, self.projects.slug(&committee.project_uid)).await?;
        committee.project_name =
            cancellable(ctx, OP, self.projects.name(&committee.project_uid)).await?;

        if let Some(parent_uid) = committee.parent_uid.clone() {
            self.require_parent(ctx, OP, &parent_uid).await?;
        }

        let mut settings = settings.unwrap_or_default();
        settings.uid = committee.uid.clone();
        settings.created_at = now;
        settings.updated_at = now;

        let mut guard = RollbackGuard::new(self.repo.clone(), OP);
        let written = self
            .reserve_and_write(ctx, &mut committee, &settings, &slug, &mut guard)
            .await;
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

        let outgoing = created_messages(&committee, &settings);
        self.publish_best_effort(ctx, OP, &committee.uid, outgoing)
            .await;

        Ok((committee, revision))
    }

    async fn reserve_and_write(
        &self,
        ctx: &RequestContext,
        committee: &mut Committee,
        settings: &CommitteeSettings,
        slug: &str,
        guard: &mut RollbackGuard,
    ) -> Result<u64> {
        const OP: &str = "create_committee";

        let name_key = cancellable(ctx, OP, self.repo.unique_name_project(committee)).await?;
        guard.track(name_key);

        if committee.sso_group_enabled {
            let (sso_group_name, sso_key) = reservations::reserve_sso_group_name(
                self.repo.as_ref(),
                ctx,
                &committee.uid,
                slug,
                &committee.name,
                self.config.sso_max_attempts,
            )
            .await?;
            guard.track(sso_key);
            committee.sso_group_name = sso_group_name;
        }

        cancellable(ctx, OP, self.repo.create(committee, Some(settings))).await
    }

    /// Update a committee's base record under optimistic concurrency
    ///
    /// `revision` must be the revision the caller read. Renames reserve the
    /// new name (and SSO group name) first; the old keys are released off the
    /// caller's path once the write commits.
    ///
    /// ## Errors
    ///
    /// - `CommitteeNotFound`: unknown UID
    /// - `RevisionMismatch`: the record moved past `revision`
    /// - `ProjectNotFound` / `ParentNotFound`: unresolved references
    /// - `NameTaken`, `RetriesExhausted`: reservation failures
    pub async fn update_committee(
        &self,
        ctx: &RequestContext,
        committee: Committee,
        revision: u64,
    ) -> Result<(Committee, u64)> {
        log_op_start!(
            "update_committee",
            committee_uid = %committee.uid,
            request_id = ctx.request_id.as_str()
        );
        let start = std::time::Instant::now();

        let result = self
            .update_committee_impl(ctx, committee, revision)
            .await
            .map_err(|e| {
                log_op_error!(
                    "update_committee",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "update_committee",
            duration_ms = start.elapsed().as_millis() as u64,
            committee_uid = %result.0.uid
        );
        Ok(result)
    }

    async fn update_committee_impl(
        &self,
        ctx: &RequestContext,
        mut committee: Committee,
        revision: u64,
    ) -> Result<(Committee, u64)> {
        const OP: &str = "update_committee";

        let existing = self
            .load_at_revision(ctx, OP, &committee.uid, revision)
            .await?;
        committee.validate()?;

        let mut guard = RollbackGuard::new(self.repo.clone(), OP);
        let mut stale = Vec::new();
        let staged = self
            .stage_update(ctx, &existing, &mut committee, &mut guard, &mut stale)
            .await;
        let written = match staged {
            Ok(()) => {
                cancellable(ctx, OP, self.repo.update_base(&committee, revision)).await
            }
            Err(e) => Err(e),
        };
        let new_revision = match written {
            Ok(rev) => {
                guard.disarm();
                rev
            }
            Err(e) => {
                // Only the new keys go; stale ones still belong to the old record.
                guard.rollback().await;
                return Err(e);
            }
        };

        self.spawn_stale_cleanup(OP, stale);

        let settings = match self.repo.get_settings(&committee.uid).await {
            Ok((settings, _)) => Some(settings),
            Err(e) => {
                tracing::debug!(committee_uid = %committee.uid, error = %e, "settings unavailable for access message");
                None
            }
        };
        let outgoing = updated_messages(&committee, settings.as_ref());
        self.publish_best_effort(ctx, OP, &committee.uid, outgoing)
            .await;

        Ok((committee, new_revision))
    }

    /// Resolve references, reserve new keys and merge immutable fields
    async fn stage_update(
        &self,
        ctx: &RequestContext,
        existing: &Committee,
        committee: &mut Committee,
        guard: &mut RollbackGuard,
        stale: &mut Vec<ReservationKey>,
    ) -> Result<()> {
        const OP: &str = "update_committee";

        let project_changed = committee.project_uid != existing.project_uid;
        committee.project_name = if project_changed {
            cancellable(ctx, OP, self.projects.name(&committee.project_uid)).await?
        } else {
            existing.project_name.clone()
        };

        let name_key = ReservationKey::name_project(committee);
        let renamed = name_key != ReservationKey::name_project(existing);
        if renamed {
            let reserved = cancellable(ctx, OP, self.repo.unique_name_project(committee)).await?;
            guard.track(reserved);
            stale.extend(name_key.rebuild_for(existing));
        }

        if committee.sso_group_enabled && (renamed || !existing.holds_sso_group()) {
            let slug = cancellable(ctx, OP, self.projects.slug(&committee.project_uid)).await?;
            let (sso_group_name, sso_key) = reservations::reserve_sso_group_name(
                self.repo.as_ref(),
                ctx,
                &committee.uid,
                &slug,
                &committee.name,
                self.config.sso_max_attempts,
            )
            .await?;
            guard.track(sso_key.clone());
            stale.extend(sso_key.rebuild_for(existing));
            committee.sso_group_name = sso_group_name;
        } else if !committee.sso_group_enabled {
            if existing.holds_sso_group() {
                stale.push(ReservationKey::sso_group_name(&existing.sso_group_name));
            }
            committee.sso_group_name.clear();
        } else {
            committee.sso_group_name = existing.sso_group_name.clone();
        }

        if committee.parent_uid != existing.parent_uid {
            if let Some(parent_uid) = committee.parent_uid.clone() {
                self.require_parent(ctx, OP, &parent_uid).await?;
            }
        }

        committee.created_at = existing.created_at;
        committee.updated_at = Utc::now();
        committee.total_members = existing.total_members;
        committee.total_voting_repos = existing.total_voting_repos;
        Ok(())
    }

    /// Delete a committee, its settings and its reservation keys
    ///
    /// Member records are left in place.
    ///
    /// ## Errors
    ///
    /// - `CommitteeNotFound`, `RevisionMismatch`: gate failures
    /// - `Publish` / `Cancelled`: downstream systems were not told; the
    ///   committee is already gone
    pub async fn delete_committee(
        &self,
        ctx: &RequestContext,
        uid: &str,
        revision: u64,
    ) -> Result<()> {
        log_op_start!(
            "delete_committee",
            committee_uid = %uid,
            request_id = ctx.request_id.as_str()
        );
        let start = std::time::Instant::now();

        self.delete_committee_impl(ctx, uid, revision)
            .await
            .map_err(|e| {
                log_op_error!(
                    "delete_committee",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    committee_uid = %uid
                );
                e
            })?;

        log_op_end!(
            "delete_committee",
            duration_ms = start.elapsed().as_millis() as u64,
            committee_uid = %uid
        );
        Ok(())
    }

    async fn delete_committee_impl(
        &self,
        ctx: &RequestContext,
        uid: &str,
        revision: u64,
    ) -> Result<()> {
        const OP: &str = "delete_committee";

        let existing = self.load_at_revision(ctx, OP, uid, revision).await?;
        let owned_keys = existing.reservation_keys();

        cancellable(ctx, OP, self.repo.delete(uid, revision)).await?;

        // The primary record is gone; a lingering key is only a leak.
        reservations::release(self.repo.as_ref(), OP, &owned_keys).await;

        let outgoing = vec![
            messages::index_deleted(subjects::INDEX_COMMITTEE, uid)?,
            messages::index_deleted(subjects::INDEX_COMMITTEE_SETTINGS, uid)?,
            messages::access_delete_all(uid)?,
        ];
        self.publish(ctx, outgoing).await
    }

    /// Replace a committee's settings under optimistic concurrency
    ///
    /// ## Errors
    ///
    /// - `CommitteeNotFound` / `SettingsNotFound`: unknown UID
    /// - `RevisionMismatch`: the settings moved past `revision`
    pub async fn update_committee_settings(
        &self,
        ctx: &RequestContext,
        settings: CommitteeSettings,
        revision: u64,
    ) -> Result<(CommitteeSettings, u64)> {
        log_op_start!(
            "update_committee_settings",
            committee_uid = %settings.uid,
            request_id = ctx.request_id.as_str()
        );
        let start = std::time::Instant::now();

        let result = self
            .update_committee_settings_impl(ctx, settings, revision)
            .await
            .map_err(|e| {
                log_op_error!(
                    "update_committee_settings",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "update_committee_settings",
            duration_ms = start.elapsed().as_millis() as u64,
            committee_uid = %result.0.uid
        );
        Ok(result)
    }

    async fn update_committee_settings_impl(
        &self,
        ctx: &RequestContext,
        mut settings: CommitteeSettings,
        revision: u64,
    ) -> Result<(CommitteeSettings, u64)> {
        const OP: &str = "update_committee_settings";

        let (base, _) = cancellable(ctx, OP, self.repo.get_base(&settings.uid)).await?;
        let (existing, current) =
            cancellable(ctx, OP, self.repo.get_settings(&settings.uid)).await?;
        if current != revision {
            return Err(CommitteeError::RevisionMismatch {
                entity: "committee settings",
                uid: settings.uid.clone(),
                expected: revision,
                actual: current,
            });
        }

        settings.created_at = existing.created_at;
        settings.updated_at = Utc::now();
        let new_revision =
            cancellable(ctx, OP, self.repo.update_settings(&settings, revision)).await?;

        let outgoing = settings_messages(&base, &settings);
        self.publish_best_effort(ctx, OP, &settings.uid, outgoing)
            .await;

        Ok((settings, new_revision))
    }
}

fn created_messages(
    committee: &Committee,
    settings: &CommitteeSettings,
) -> Result<Vec<OutboundMessage>> {
    Ok(vec![
        messages::index_committee(MessageAction::Created, committee)?,
        messages::index_settings(MessageAction::Created, settings)?,
        messages::access_committee(committee, Some(settings))?,
    ])
}

fn updated_messages(
    committee: &Committee,
    settings: Option<&CommitteeSettings>,
) -> Result<Vec<OutboundMessage>> {
    Ok(vec![
        messages::index_committee(MessageAction::Updated, committee)?,
        messages::access_committee(committee, settings)?,
    ])
}

fn settings_messages(
    base: &Committee,
    settings: &CommitteeSettings,
) -> Result<Vec<OutboundMessage>> {
    Ok(vec![
        messages::index_settings(MessageAction::Updated, settings)?,
        messages::access_committee(base, Some(settings))?,
    ])
}
