//! Reservation lifecycle: bounded SSO retry, best-effort release, rollback
//!
//! Releasing a reservation is always best-effort. A key that cannot be
//! removed stays locked and is reported as a leak, but never fails the
//! caller's operation.

use std::sync::Arc;
use std::time::Duration;

use committee_core::committee_core_types::RequestContext;
use committee_core::errors::{CommitteeError, Result};
use committee_core::keys::{sso_group_candidate, ReservationKey};
use committee_core::ports::CommitteeWriter;
use committee_core::{cancellable, log_reservation_leak};
use tokio::task::JoinHandle;

/// Reserve an SSO group name, trying successive candidates on collision
///
/// # Errors
///
/// * `RetriesExhausted` - every one of `max_attempts` candidates was taken
/// * `Cancelled` - the request was cancelled between attempts
/// * any non-collision error of the reservation write
pub async fn reserve_sso_group_name(
    repo: &dyn CommitteeWriter,
    ctx: &RequestContext,
    committee_uid: &str,
    project_slug: &str,
    committee_name: &str,
    max_attempts: u32,
) -> Result<(String, ReservationKey)> {
    const OP: &str = "reserve_sso_group_name";

    for attempt in 0..max_attempts {
        let candidate = sso_group_candidate(project_slug, committee_name, attempt);
        match cancellable(ctx, OP, repo.unique_sso_group_name(committee_uid, &candidate)).await {
            Ok(key) => return Ok((candidate, key)),
            Err(CommitteeError::SsoGroupNameTaken { owner_uid, .. }) => {
                tracing::debug!(
                    committee_uid = %committee_uid,
                    candidate = %candidate,
                    attempt,
                    owner = ?owner_uid,
                    "sso group name taken, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(CommitteeError::RetriesExhausted {
        op: OP.to_string(),
        attempts: max_attempts,
    })
}

/// Delete one reservation key at its current revision
///
/// A key that is already gone counts as released.
pub async fn release_one(repo: &dyn CommitteeWriter, op: &str, key: &ReservationKey) {
    let released = match repo.reservation_revision(key).await {
        Ok(revision) => repo.delete_reservation(key, revision).await,
        Err(e) => Err(e),
    };
    match released {
        Ok(()) => tracing::debug!(op, key = %key, "reservation released"),
        Err(CommitteeError::KeyNotFound { .. }) => {
            tracing::debug!(op, key = %key, "reservation already absent")
        }
        Err(e) => log_reservation_leak!(op, key, e),
    }
}

/// Release every key, logging leaks; never fails
pub async fn release(repo: &dyn CommitteeWriter, op: &str, keys: &[ReservationKey]) {
    for key in keys {
        release_one(repo, op, key).await;
    }
}

/// Release stale keys off the caller's path, bounded by `deadline`
///
/// Anything still held when the deadline passes is reported as leaked.
pub fn spawn_stale_cleanup(
    repo: Arc<dyn CommitteeWriter>,
    op: &'static str,
    keys: Vec<ReservationKey>,
    deadline: Duration,
) -> Option<JoinHandle<()>> {
    if keys.is_empty() {
        return None;
    }
    Some(tokio::spawn(async move {
        let cleanup = release(repo.as_ref(), op, &keys);
        if tokio::time::timeout(deadline, cleanup).await.is_err() {
            for key in &keys {
                log_reservation_leak!(op, key, "stale cleanup timed out");
            }
        }
    }))
}

/// One undo step recorded by an orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// Release a reservation key
    Reservation(ReservationKey),
    /// Delete a member record written earlier in the same operation
    MemberRecord { uid: String, revision: u64 },
}

/// Owns the undo log of one write operation
///
/// The error path calls [`RollbackGuard::rollback`] and awaits it. If the
/// operation's future is dropped or unwinds while the guard is still armed,
/// `Drop` spawns the same compensation on the current runtime. Compensation
/// never observes the request's cancellation token.
pub struct RollbackGuard {
    repo: Arc<dyn CommitteeWriter>,
    op: &'static str,
    steps: Vec<Compensation>,
    armed: bool,
}

impl RollbackGuard {
    pub fn new(repo: Arc<dyn CommitteeWriter>, op: &'static str) -> Self {
        Self {
            repo,
            op,
            steps: Vec::new(),
            armed: true,
        }
    }

    pub fn track(&mut self, key: ReservationKey) {
        self.steps.push(Compensation::Reservation(key));
    }

    pub fn track_member_record(&mut self, uid: impl Into<String>, revision: u64) {
        self.steps.push(Compensation::MemberRecord {
            uid: uid.into(),
            revision,
        });
    }

    pub fn steps(&self) -> &[Compensation] {
        &self.steps
    }

    /// Success: keep everything that was written
    pub fn disarm(mut self) {
        self.armed = false;
        self.steps.clear();
    }

    /// Failure: undo every recorded step, newest first
    pub async fn rollback(mut self) {
        self.armed = false;
        let steps = std::mem::take(&mut self.steps);
        compensate(self.repo.as_ref(), self.op, steps).await;
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if !self.armed || self.steps.is_empty() {
            return;
        }
        let steps = std::mem::take(&mut self.steps);
        let op = self.op;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(op, steps = steps.len(), "operation abandoned, compensating");
                let repo = Arc::clone(&self.repo);
                handle.spawn(async move { compensate(repo.as_ref(), op, steps).await });
            }
            Err(_) => {
                for step in &steps {
                    if let Compensation::Reservation(key) = step {
                        log_reservation_leak!(op, key, "no runtime to compensate on");
                    }
                }
            }
        }
    }
}

async fn compensate(repo: &dyn CommitteeWriter, op: &str, steps: Vec<Compensation>) {
    for step in steps.into_iter().rev() {
        match step {
            Compensation::Reservation(key) => release_one(repo, op, &key).await,
            Compensation::MemberRecord { uid, revision } => {
                match repo.delete_member(&uid, revision).await {
                    Ok(()) | Err(CommitteeError::MemberNotFound { .. }) => {}
                    Err(e) => tracing::error!(
                        op,
                        member_uid = %uid,
                        error = %e,
                        "failed to remove member record during rollback"
                    ),
                }
            }
        }
    }
}
