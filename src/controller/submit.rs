//! Submitting and forgetting jobs.

use crate::error::{Error, RegistryError, Result};
use crate::types::{Event, Job, JobId};
use crate::utils::{destination_hint, display_name_for, validate_url};
use std::sync::atomic::Ordering;

use super::JobController;

impl JobController {
    /// Start a transfer for `url` and begin tracking it
    ///
    /// The URL must be an absolute http(s) URL. On success the backend has
    /// accepted the transfer, a `Queued` job with 0% progress is registered,
    /// and its status poller is running. Submitting the same URL twice starts
    /// two independent transfers.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for empty, malformed or non-http(s) URLs (nothing is started)
    /// - [`Error::InvalidRequest`] if the backend refuses the transfer (nothing is registered)
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun, including
    ///   when it begins while the backend is still starting the transfer (the
    ///   started transfer is then not registered)
    /// - [`Error::Registry`] if the backend hands out an id that is already tracked
    pub async fn submit(&self, url: &str) -> Result<Job> {
        if !self.tracking.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let url = validate_url(url)?;
        let display_name = display_name_for(&url);
        let destination = destination_hint(&self.config.transfer.destination_dir, &display_name);

        let id = self
            .backend
            .start(&url, &destination)
            .await
            .map_err(|e| {
                tracing::warn!(
                    url = %url,
                    backend = self.backend.name(),
                    error = %e,
                    "Backend did not start transfer"
                );
                Error::from(e)
            })?;

        // Shutdown may have begun while the backend was starting the transfer
        if !self.tracking.accepting_new.load(Ordering::SeqCst) {
            tracing::warn!(
                job_id = %id,
                url = %url,
                backend = self.backend.name(),
                "Shutdown began during backend start, transfer left untracked"
            );
            return Err(Error::ShuttingDown);
        }

        let job = Job::new(id.clone(), display_name, url.as_str());
        let job = self.registry.put(job).await.map_err(|e| {
            tracing::error!(job_id = %id, error = %e, "Backend returned an id that is already tracked");
            Error::from(e)
        })?;

        self.start_tracking(id).await;

        tracing::info!(
            job_id = %job.id,
            name = %job.display_name,
            url = %job.url,
            destination = %destination.display(),
            "Transfer submitted"
        );

        Ok(job)
    }

    /// Remove a finished job from the registry
    ///
    /// # Errors
    ///
    /// - [`Error::Registry`] with [`RegistryError::NotFound`] for unknown ids
    /// - [`Error::InvalidState`] if the job is still queued, downloading or paused
    pub async fn forget(&self, id: &JobId) -> Result<Job> {
        let job = self.registry.get(id).await?;
        if !job.is_terminal() {
            return Err(Error::InvalidState {
                id: id.clone(),
                operation: "forget".to_string(),
                current_state: job.status,
            });
        }

        let removed = self
            .registry
            .remove(id)
            .await
            .ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;

        // Let the final snapshot reach the observer before announcing removal
        self.dispatch.flush().await;
        self.emit_event(Event::JobRemoved { id: id.clone() });

        tracing::info!(job_id = %id, "Job forgotten");
        Ok(removed)
    }
}
