use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use committee_core::errors::CommitteeError;
use committee_core::executor::{BoundedExecutor, Task};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

fn counting_task(
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    done: Arc<AtomicUsize>,
) -> Task {
    async move {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        in_flight.fetch_sub(1, Ordering::SeqCst);
        done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    .boxed()
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let exec = BoundedExecutor::new(3);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    let tasks = (0..20)
        .map(|_| counting_task(in_flight.clone(), peak.clone(), done.clone()))
        .collect();

    exec.run(&CancellationToken::new(), tasks).await.unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 20);
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_first_error_stops_pending_tasks() {
    // Limit 1 serialises the batch, so everything after the failure is
    // still waiting for a permit when the batch is cancelled.
    let exec = BoundedExecutor::new(1);
    let started = Arc::new(AtomicUsize::new(0));

    let mut tasks: Vec<Task> = vec![async {
        Err(CommitteeError::Publish {
            subject: "index.committee".into(),
            message: "nats down".into(),
        })
    }
    .boxed()];
    for _ in 0..10 {
        let started = started.clone();
        tasks.push(
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            }
            .boxed(),
        );
    }

    let err = exec.run(&CancellationToken::new(), tasks).await.unwrap_err();

    assert!(matches!(err, CommitteeError::Publish { .. }));
    assert!(started.load(Ordering::SeqCst) < 10);
}

#[tokio::test]
async fn test_cancelled_parent_skips_everything() {
    let exec = BoundedExecutor::new(4);
    let ran = Arc::new(AtomicUsize::new(0));
    let parent = CancellationToken::new();
    parent.cancel();

    let tasks = (0..5)
        .map(|_| {
            let ran = ran.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        })
        .collect();

    let err = exec.run(&parent, tasks).await.unwrap_err();

    assert!(matches!(err, CommitteeError::Cancelled { .. }));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_task_surfaces_as_internal() {
    let exec = BoundedExecutor::new(2);
    let tasks: Vec<Task> = vec![async {
        if tasks_should_panic() {
            panic!("publisher bug");
        }
        Ok::<(), CommitteeError>(())
    }
    .boxed()];

    let err = exec.run(&CancellationToken::new(), tasks).await.unwrap_err();
    assert!(matches!(err, CommitteeError::Internal { .. }));
}

fn tasks_should_panic() -> bool {
    true
}
