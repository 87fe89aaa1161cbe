//! Write orchestrator wiring and downstream publishing
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging for every write operation:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal
//! details.

use std::sync::Arc;

use committee_core::committee_core_types::RequestContext;
use committee_core::config::OrchestratorConfig;
use committee_core::errors::{CommitteeError, Result};
use committee_core::executor::{BoundedExecutor, Task};
use committee_core::keys::ReservationKey;
use committee_core::log_publish_failure;
use committee_core::messages::{Channel, OutboundMessage};
use committee_core::model::Committee;
use committee_core::ports::{CommitteePublisher, CommitteeWriter, ProjectReader};
use committee_core::cancellable;
use futures::FutureExt;
use tokio::task::JoinHandle;

use super::reservations;

/// Turns one logical write into the ordered sequence of store operations,
/// reservations and notifications, compensating on failure
#[derive(Clone)]
pub struct WriteOrchestrator {
    pub(crate) projects: Arc<dyn ProjectReader>,
    pub(crate) repo: Arc<dyn CommitteeWriter>,
    pub(crate) publisher: Arc<dyn CommitteePublisher>,
    pub(crate) executor: BoundedExecutor,
    pub(crate) config: OrchestratorConfig,
}

impl WriteOrchestrator {
    pub fn new(
        projects: Arc<dyn ProjectReader>,
        repo: Arc<dyn CommitteeWriter>,
        publisher: Arc<dyn CommitteePublisher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            projects,
            repo,
            publisher,
            executor: BoundedExecutor::new(config.publish_concurrency),
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Publish a batch; the first failure is returned
    pub(crate) async fn publish(
        &self,
        ctx: &RequestContext,
        messages: Vec<OutboundMessage>,
    ) -> Result<()> {
        let tasks: Vec<Task> = messages
            .into_iter()
            .map(|message| {
                let publisher = Arc::clone(&self.publisher);
                async move {
                    match message.channel {
                        Channel::Indexer => {
                            publisher.indexer(message.subject, &message.payload).await
                        }
                        Channel::Access => publisher.access(message.subject, &message.payload).await,
                    }
                }
                .boxed()
            })
            .collect();
        self.executor.run(ctx.cancellation(), tasks).await
    }

    /// Publish a batch whose failure must not undo the write
    pub(crate) async fn publish_best_effort(
        &self,
        ctx: &RequestContext,
        op: &'static str,
        uid: &str,
        messages: Result<Vec<OutboundMessage>>,
    ) {
        let outcome = match messages {
            Ok(messages) => self.publish(ctx, messages).await,
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            log_publish_failure!(op, e, uid = %uid);
        }
    }

    pub(crate) fn spawn_stale_cleanup(
        &self,
        op: &'static str,
        keys: Vec<ReservationKey>,
    ) -> Option<JoinHandle<()>> {
        reservations::spawn_stale_cleanup(
            Arc::clone(&self.repo),
            op,
            keys,
            self.config.stale_cleanup_timeout,
        )
    }

    /// Load a committee and check the caller's revision against it
    pub(crate) async fn load_at_revision(
        &self,
        ctx: &RequestContext,
        op: &str,
        uid: &str,
        revision: u64,
    ) -> Result<Committee> {
        let (existing, current) = cancellable(ctx, op, self.repo.get_base(uid)).await?;
        if current != revision {
            return Err(CommitteeError::RevisionMismatch {
                entity: "committee",
                uid: uid.to_string(),
                expected: revision,
                actual: current,
            });
        }
        Ok(existing)
    }

    pub(crate) async fn require_parent(
        &self,
        ctx: &RequestContext,
        op: &str,
        parent_uid: &str,
    ) -> Result<()> {
        match cancellable(ctx, op, self.repo.get_revision(parent_uid)).await {
            Ok(_) => Ok(()),
            Err(CommitteeError::CommitteeNotFound { .. }) => Err(CommitteeError::ParentNotFound {
                uid: parent_uid.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}
