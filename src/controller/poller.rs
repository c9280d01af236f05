//! Periodic status polling for tracked jobs.

use crate::backend::{RawStatus, TransferBackend, TransferStatus};
use crate::config::TrackingConfig;
use crate::error::{BackendError, RegistryError};
use crate::registry::JobRegistry;
use crate::types::{JobId, JobStatus};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::JobController;

/// Why a poll loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// This loop committed `Completed`
    Completed,
    /// This loop committed `Failed`
    Failed,
    /// Another writer finalized the job first
    Superseded,
    /// The job disappeared from the registry
    Removed,
    /// Stop was requested (shutdown or completion signal)
    Cancelled,
}

enum Step {
    Continue,
    Stop(PollOutcome),
}

/// Map the backend's status vocabulary onto job status
pub fn map_status(raw: RawStatus) -> JobStatus {
    match raw {
        RawStatus::Successful => JobStatus::Completed,
        RawStatus::Failed => JobStatus::Failed,
        RawStatus::Paused => JobStatus::Paused,
        RawStatus::Pending | RawStatus::Running => JobStatus::Downloading,
    }
}

/// Whole-percent progress for a status reading
///
/// `floor(downloaded * 100 / total)` capped at 100. With an unknown or zero
/// total the previous value is kept.
pub fn derive_progress(previous: u8, bytes_downloaded: u64, bytes_total: Option<u64>) -> u8 {
    match bytes_total {
        Some(total) if total > 0 => {
            let percent = u128::from(bytes_downloaded) * 100 / u128::from(total);
            u8::try_from(percent.min(100)).unwrap_or(100)
        }
        _ => previous,
    }
}

/// Poll loop that drives one job to a terminal state
///
/// Cheap to clone; every tracked job runs [`StatusPoller::run`] on its own task.
#[derive(Clone)]
pub struct StatusPoller {
    backend: Arc<dyn TransferBackend>,
    registry: JobRegistry,
    interval: Duration,
    max_transient_failures: u32,
}

impl StatusPoller {
    /// Create a poller using the interval and retry bound from `config`
    pub fn new(
        backend: Arc<dyn TransferBackend>,
        registry: JobRegistry,
        config: &TrackingConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            interval: config.poll_interval,
            max_transient_failures: config.max_transient_failures.max(1),
        }
    }

    /// Query, apply, sleep, repeat until the job is terminal or `cancel` fires
    ///
    /// The first query happens immediately. A query in flight is never
    /// interrupted; cancellation is observed before each query and during the
    /// sleep. Nothing escapes this loop: every failure ends up as a job status.
    pub async fn run(&self, id: JobId, cancel: CancellationToken) -> PollOutcome {
        let mut consecutive_failures = 0u32;

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            if let Step::Stop(outcome) = self.poll_once(&id, &mut consecutive_failures).await {
                return outcome;
            }

            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    async fn poll_once(&self, id: &JobId, consecutive_failures: &mut u32) -> Step {
        let reply = AssertUnwindSafe(self.backend.status(id))
            .catch_unwind()
            .await;

        match reply {
            Ok(Ok(status)) => {
                *consecutive_failures = 0;
                self.apply_status(id, &status).await
            }
            Ok(Err(BackendError::NotFound { .. })) => {
                self.finalize_failed(id, "transfer no longer known to backend".to_string())
                    .await
            }
            Ok(Err(e)) if e.is_transient() => {
                *consecutive_failures += 1;
                if *consecutive_failures >= self.max_transient_failures {
                    tracing::warn!(
                        job_id = %id,
                        error = %e,
                        attempts = *consecutive_failures,
                        "Transient failure bound reached, failing job"
                    );
                    self.finalize_failed(
                        id,
                        format!(
                            "backend unreachable after {} consecutive attempts: {}",
                            consecutive_failures, e
                        ),
                    )
                    .await
                } else {
                    tracing::warn!(
                        job_id = %id,
                        error = %e,
                        attempt = *consecutive_failures,
                        max_attempts = self.max_transient_failures,
                        "Status query failed, retrying next cycle"
                    );
                    Step::Continue
                }
            }
            Ok(Err(e)) => self.finalize_failed(id, e.to_string()).await,
            Err(_) => {
                tracing::error!(
                    job_id = %id,
                    backend = self.backend.name(),
                    "Backend panicked while reporting status"
                );
                self.finalize_failed(id, "backend panicked while reporting status".to_string())
                    .await
            }
        }
    }

    async fn apply_status(&self, id: &JobId, status: &TransferStatus) -> Step {
        let next_status = map_status(status.raw_status);

        let result = self
            .registry
            .update(id, |job| {
                // A zero total carries no information and never replaces a known one
                let reported_total = status.bytes_total.filter(|total| *total > 0);
                if let Some(total) = reported_total {
                    job.bytes_total = Some(total);
                }
                let downloaded = job
                    .bytes_downloaded
                    .map_or(status.bytes_downloaded, |seen| seen.max(status.bytes_downloaded));
                job.bytes_downloaded = Some(downloaded);
                job.progress_percent =
                    derive_progress(job.progress_percent, downloaded, reported_total);

                match next_status {
                    JobStatus::Completed => job.complete(),
                    JobStatus::Failed => job.fail("transfer failed in backend"),
                    other => job.status = other,
                }
            })
            .await;

        match result {
            Ok(job) => match job.status {
                JobStatus::Completed => {
                    tracing::info!(job_id = %id, name = %job.display_name, "Transfer completed");
                    Step::Stop(PollOutcome::Completed)
                }
                JobStatus::Failed => {
                    tracing::info!(job_id = %id, name = %job.display_name, "Transfer failed in backend");
                    Step::Stop(PollOutcome::Failed)
                }
                _ => {
                    tracing::debug!(
                        job_id = %id,
                        status = %job.status,
                        progress = job.progress_percent,
                        "Status polled"
                    );
                    Step::Continue
                }
            },
            Err(e) => stop_on_registry_error(id, e),
        }
    }

    async fn finalize_failed(&self, id: &JobId, cause: String) -> Step {
        match self.registry.update(id, |job| job.fail(cause)).await {
            Ok(job) => {
                tracing::info!(
                    job_id = %id,
                    cause = job.error.as_deref().unwrap_or_default(),
                    "Transfer marked failed"
                );
                Step::Stop(PollOutcome::Failed)
            }
            Err(e) => stop_on_registry_error(id, e),
        }
    }
}

fn stop_on_registry_error(id: &JobId, error: RegistryError) -> Step {
    match error {
        RegistryError::TerminalState { status, .. } => {
            tracing::debug!(job_id = %id, %status, "Job finalized elsewhere, stopping poller");
            Step::Stop(PollOutcome::Superseded)
        }
        other => {
            tracing::debug!(job_id = %id, error = %other, "Job no longer registered, stopping poller");
            Step::Stop(PollOutcome::Removed)
        }
    }
}

/// Cancellation tokens of running pollers, keyed by job id
#[derive(Clone, Default)]
pub(crate) struct ActivePollers {
    tokens: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl ActivePollers {
    /// Register a poller unless one is already running for `id`
    async fn register(&self, id: &JobId, token: CancellationToken) -> bool {
        let mut tokens = self.tokens.lock().await;
        if tokens.contains_key(id) {
            return false;
        }
        tokens.insert(id.clone(), token);
        true
    }

    async fn release(&self, id: &JobId) {
        self.tokens.lock().await.remove(id);
    }

    /// Ask the poller for `id` to stop; returns whether one was running
    pub(crate) async fn cancel(&self, id: &JobId) -> bool {
        match self.tokens.lock().await.get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) async fn contains(&self, id: &JobId) -> bool {
        self.tokens.lock().await.contains_key(id)
    }

    pub(crate) async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }
}

impl JobController {
    /// Spawn the status poller for a registered job
    ///
    /// Returns `false` without spawning if a poller for `id` is already running.
    pub(crate) async fn start_tracking(&self, id: JobId) -> bool {
        let cancel = self.tracking.shutdown.child_token();
        if !self.tracking.pollers.register(&id, cancel.clone()).await {
            tracing::warn!(job_id = %id, "Poller already running for job, not starting another");
            return false;
        }

        let poller = self.poller.clone();
        let pollers = self.tracking.pollers.clone();

        tokio::spawn(async move {
            let outcome = poller.run(id.clone(), cancel).await;
            pollers.release(&id).await;
            tracing::debug!(job_id = %id, ?outcome, "Status poller exited");
        });

        true
    }
}
