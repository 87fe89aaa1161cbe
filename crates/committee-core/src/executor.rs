//! Bounded concurrent executor for downstream notifications
//!
//! Runs a batch of independent side-effecting tasks with at most `limit` in
//! flight. The first failure cancels the batch: tasks that have not yet
//! started observe the cancellation and skip, tasks already running are left
//! to finish. Only use this for work with no ordering dependency.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::errors::{CommitteeError, Result};

pub type Task = BoxFuture<'static, Result<()>>;

enum Outcome {
    Ran(Result<()>),
    Skipped,
}

#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    limit: usize,
}

impl BoundedExecutor {
    /// A `limit` of zero is treated as one
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run every task and return the first error
    ///
    /// # Errors
    ///
    /// The first task error, or `Cancelled` when `parent` was cancelled and at
    /// least one task was skipped because of it.
    pub async fn run(&self, parent: &CancellationToken, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let batch = parent.child_token();
        let permits = Arc::new(Semaphore::new(self.limit));
        let mut set = JoinSet::new();

        for task in tasks {
            let batch = batch.clone();
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = batch.cancelled() => return Outcome::Skipped,
                    permit = permits.acquire_owned() => permit,
                };
                let Ok(_permit) = permit else {
                    return Outcome::Skipped;
                };
                // Re-check: the batch may have failed while we waited.
                if batch.is_cancelled() {
                    return Outcome::Skipped;
                }
                Outcome::Ran(task.await)
            });
        }

        let mut first_error = None;
        let mut skipped = false;
        while let Some(joined) = set.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Outcome::Ran(Err(CommitteeError::Internal {
                    message: format!("publish task failed to complete: {}", e),
                }))
            });
            match outcome {
                Outcome::Ran(Ok(())) => {}
                Outcome::Ran(Err(err)) => {
                    if first_error.is_none() {
                        batch.cancel();
                        first_error = Some(err);
                    }
                }
                Outcome::Skipped => skipped = true,
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        if skipped && parent.is_cancelled() {
            return Err(CommitteeError::Cancelled {
                op: "publish batch".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_empty_batch_is_ok() {
        let exec = BoundedExecutor::new(2);
        assert!(exec.run(&CancellationToken::new(), vec![]).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_limit_clamped() {
        assert_eq!(BoundedExecutor::new(0).limit(), 1);
    }

    #[tokio::test]
    async fn test_returns_task_error() {
        let exec = BoundedExecutor::new(2);
        let tasks: Vec<Task> = vec![
            async { Ok(()) }.boxed(),
            async {
                Err(CommitteeError::Storage {
                    message: "boom".into(),
                })
            }
            .boxed(),
        ];
        let err = exec.run(&CancellationToken::new(), tasks).await.unwrap_err();
        assert!(matches!(err, CommitteeError::Storage { .. }));
    }
}
