//! Core types for transfer-tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a transfer, assigned by the [`TransferBackend`](crate::backend::TransferBackend)
///
/// Opaque to this crate: it is only compared, hashed and echoed back to the backend.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl PartialEq<&str> for JobId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Job status as seen by observers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted by the backend, no status observed yet
    Queued,
    /// Transfer in progress (or pending inside the backend)
    Downloading,
    /// Paused by the backend
    Paused,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
}

impl JobStatus {
    /// Whether no further transitions are permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Lowercase name, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one tracked transfer
///
/// The registry owns the authoritative copy; everything handed out (return
/// values, observer notifications, events) is a clone taken at commit time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Backend-assigned identifier (immutable)
    pub id: JobId,

    /// Human-readable name, usually the last URL path segment (immutable)
    pub display_name: String,

    /// Source URL the transfer was started from (immutable)
    pub url: String,

    /// Current status
    pub status: JobStatus,

    /// Progress in whole percent, 0..=100, never decreasing
    pub progress_percent: u8,

    /// Bytes transferred so far, if the backend has reported any
    ///
    /// Never decreases. After a reading without a total, `progress_percent`
    /// holds its last derived value and may trail this count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_downloaded: Option<u64>,

    /// Total size in bytes; `None` while unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_total: Option<u64>,

    /// Cause recorded when the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Commit counter: 1 on insertion, incremented by every committed change
    pub revision: u64,

    /// When the job was registered
    pub created_at: DateTime<Utc>,

    /// When the job last changed
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a freshly submitted job in the `Queued` state with 0% progress
    pub fn new(id: JobId, display_name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name: display_name.into(),
            url: url.into(),
            status: JobStatus::Queued,
            progress_percent: 0,
            bytes_downloaded: None,
            bytes_total: None,
            error: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the job reached `Completed` or `Failed`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark the job completed: progress jumps to 100 and, when the total is
    /// known, the downloaded byte count is aligned with it.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.progress_percent = 100;
        if let Some(total) = self.bytes_total {
            self.bytes_downloaded = Some(total);
        }
    }

    /// Mark the job failed, keeping the last known progress
    pub fn fail(&mut self, cause: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(cause.into());
    }

    /// Compare the fields observers care about, ignoring bookkeeping
    pub(crate) fn same_state(&self, other: &Job) -> bool {
        self.status == other.status
            && self.progress_percent == other.progress_percent
            && self.bytes_downloaded == other.bytes_downloaded
            && self.bytes_total == other.bytes_total
            && self.error == other.error
    }
}

/// Event broadcast to subscribers after the observer has seen the change
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job registered after the backend accepted it
    JobAdded {
        /// Snapshot at registration
        job: Job,
    },

    /// Non-terminal change (status, progress or byte counts)
    JobUpdated {
        /// Snapshot after the change
        job: Job,
    },

    /// Job reached `Completed`
    JobCompleted {
        /// Final snapshot
        job: Job,
    },

    /// Job reached `Failed`
    JobFailed {
        /// Final snapshot, `error` holds the cause
        job: Job,
    },

    /// Terminal job dropped from the registry
    JobRemoved {
        /// Identifier of the removed job
        id: JobId,
    },

    /// Controller finished shutting down
    Shutdown,
}

impl Event {
    /// Classify a committed snapshot
    pub fn from_snapshot(job: Job) -> Self {
        match job.status {
            JobStatus::Completed => Event::JobCompleted { job },
            JobStatus::Failed => Event::JobFailed { job },
            _ if job.revision <= 1 => Event::JobAdded { job },
            _ => Event::JobUpdated { job },
        }
    }

    /// Event name as used in the serialized `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            Event::JobAdded { .. } => "job_added",
            Event::JobUpdated { .. } => "job_updated",
            Event::JobCompleted { .. } => "job_completed",
            Event::JobFailed { .. } => "job_failed",
            Event::JobRemoved { .. } => "job_removed",
            Event::Shutdown => "shutdown",
        }
    }
}
