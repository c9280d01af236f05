//! In-memory job store
//!
//! The registry is the single source of truth for job state. All writes go
//! through [`JobRegistry::update`], which applies a mutator atomically and
//! refuses to touch jobs that already reached a terminal status. Committed
//! changes are handed to the dispatcher while the lock is still held, which
//! keeps per-job delivery order identical to commit order.
//!
//! Jobs live only as long as the process; nothing is persisted.

use crate::dispatcher::DispatchHandle;
use crate::error::RegistryError;
use crate::types::{Job, JobId};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Concurrent map of job id to job snapshot
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
    dispatch: Option<DispatchHandle>,
}

impl JobRegistry {
    /// Registry without change delivery
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that forwards every committed change to a dispatcher
    pub fn with_dispatcher(dispatch: DispatchHandle) -> Self {
        Self {
            jobs: Arc::default(),
            dispatch: Some(dispatch),
        }
    }

    /// Insert a new job
    ///
    /// The stored copy gets revision 1. Returns the stored snapshot.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Duplicate`] if the id is already present.
    pub async fn put(&self, mut job: Job) -> Result<Job, RegistryError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.id) {
            return Err(RegistryError::Duplicate { id: job.id });
        }

        job.revision = 1;
        job.progress_percent = job.progress_percent.min(100);
        jobs.insert(job.id.clone(), job.clone());
        self.commit(&job);
        Ok(job)
    }

    /// Snapshot of one job
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if the id is unknown.
    pub async fn get(&self, id: &JobId) -> Result<Job, RegistryError> {
        self.jobs
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() })
    }

    /// Apply `mutate` to a job atomically and return the resulting snapshot
    ///
    /// The mutator sees a working copy. Identity fields (`id`, `display_name`,
    /// `url`, `created_at`) are restored afterwards, and progress is clamped to
    /// `previous..=100`. If nothing observable changed the update is not
    /// committed and the current snapshot is returned.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if the id is unknown
    /// - [`RegistryError::TerminalState`] if the job is already completed or failed
    pub async fn update<F>(&self, id: &JobId, mutate: F) -> Result<Job, RegistryError>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.lock().await;
        let stored = jobs
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;

        if stored.is_terminal() {
            return Err(RegistryError::TerminalState {
                id: id.clone(),
                status: stored.status,
            });
        }

        let mut next = stored.clone();
        mutate(&mut next);

        next.id = stored.id.clone();
        next.display_name = stored.display_name.clone();
        next.url = stored.url.clone();
        next.created_at = stored.created_at;
        next.progress_percent = next.progress_percent.clamp(stored.progress_percent, 100);

        if next.same_state(stored) {
            return Ok(stored.clone());
        }

        next.revision = stored.revision + 1;
        next.updated_at = Utc::now();
        *stored = next.clone();
        self.commit(&next);
        Ok(next)
    }

    /// Drop a job; absent ids are ignored
    pub async fn remove(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().await.remove(id)
    }

    /// All jobs, oldest first
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }

    /// Number of jobs held
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Whether the registry holds no jobs
    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    fn commit(&self, job: &Job) {
        if let Some(dispatch) = &self.dispatch {
            dispatch.deliver(job.clone());
        }
    }
}
