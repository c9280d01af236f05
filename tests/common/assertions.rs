//! Custom test assertions for integration tests

use std::time::Duration;
use transfer_tracker::{Event, Job, JobController, JobId};

/// Result of waiting for a job to finish
#[derive(Debug)]
pub enum WaitResult {
    /// Job completed; holds the final snapshot
    Completed(Job),
    /// Job failed; holds the final snapshot
    Failed(Job),
    /// Timeout waiting for a terminal event
    Timeout,
    /// Event channel closed unexpectedly
    ChannelClosed,
}

/// Wait for `id` to reach a terminal status, watching the event stream
///
/// Subscribe before the job can finish, otherwise the event is missed; use
/// [`JobController::get`] for jobs that may already be done.
pub async fn wait_for_terminal(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: &JobId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::JobCompleted { job }) if &job.id == id => {
                    return WaitResult::Completed(job);
                }
                Ok(Event::JobFailed { job }) if &job.id == id => {
                    return WaitResult::Failed(job);
                }
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    return WaitResult::ChannelClosed;
                }
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Assert the controller holds `id` with the given status
pub async fn assert_status(
    controller: &JobController,
    id: &JobId,
    expected: transfer_tracker::JobStatus,
) {
    let job = controller.get(id).await.unwrap();
    assert_eq!(
        job.status, expected,
        "job {id} has status {} instead of {expected}",
        job.status
    );
}

/// Assert that progress never decreases across snapshots
pub fn assert_monotonic(snapshots: &[Job]) {
    for pair in snapshots.windows(2) {
        assert!(
            pair[1].progress_percent >= pair[0].progress_percent,
            "progress went backwards: {} -> {}",
            pair[0].progress_percent,
            pair[1].progress_percent
        );
        assert!(pair[1].revision > pair[0].revision, "revisions out of order");
    }
}
