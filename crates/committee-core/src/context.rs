//! Forward-path cancellation
//!
//! Only forward steps race the caller's token. Compensation is awaited
//! directly and never goes through here.

use std::future::Future;

use committee_core_types::RequestContext;

use crate::errors::{CommitteeError, Result};

/// Run `fut` unless the request is cancelled first
///
/// # Errors
///
/// `Cancelled` when the token fires before `fut` completes, otherwise the
/// error of `fut` itself.
pub async fn cancellable<T, F>(ctx: &RequestContext, op: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancellation().cancelled() => Err(CommitteeError::Cancelled { op: op.to_string() }),
        outcome = fut => outcome,
    }
}
