//! Transfer backend abstraction
//!
//! The backend performs the actual byte transfer (a platform download service,
//! a download daemon, an HTTP client pool). This crate only starts transfers
//! through it and observes their status.

use crate::error::BackendError;
use crate::types::JobId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Status vocabulary reported by a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawStatus {
    /// Accepted, not started yet
    Pending,
    /// Bytes are flowing
    Running,
    /// Suspended by the backend (network loss, user action, ...)
    Paused,
    /// Finished successfully
    Successful,
    /// Finished unsuccessfully
    Failed,
}

/// One status reading for a transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferStatus {
    /// Backend-side state
    pub raw_status: RawStatus,
    /// Bytes transferred so far
    pub bytes_downloaded: u64,
    /// Total size in bytes, `None` when the backend does not know it yet
    pub bytes_total: Option<u64>,
}

impl TransferStatus {
    /// Status with a known total
    pub fn new(raw_status: RawStatus, bytes_downloaded: u64, bytes_total: u64) -> Self {
        Self {
            raw_status,
            bytes_downloaded,
            bytes_total: Some(bytes_total),
        }
    }

    /// Status whose total size is not known
    pub fn unknown_total(raw_status: RawStatus, bytes_downloaded: u64) -> Self {
        Self {
            raw_status,
            bytes_downloaded,
            bytes_total: None,
        }
    }
}

/// Service that performs transfers on behalf of the tracker
///
/// Implementations must be safe to call concurrently: one status query per
/// tracked job may be in flight at the same time as `start` calls.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use std::path::Path;
/// use transfer_tracker::backend::{RawStatus, TransferBackend, TransferStatus};
/// use transfer_tracker::error::BackendError;
/// use transfer_tracker::types::JobId;
/// use url::Url;
///
/// struct AlwaysDone;
///
/// #[async_trait]
/// impl TransferBackend for AlwaysDone {
///     async fn start(&self, _url: &Url, _hint: &Path) -> Result<JobId, BackendError> {
///         Ok(JobId::new("1"))
///     }
///
///     async fn status(&self, _id: &JobId) -> Result<TransferStatus, BackendError> {
///         Ok(TransferStatus::new(RawStatus::Successful, 10, 10))
///     }
/// }
/// ```
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Begin a transfer
    ///
    /// # Arguments
    ///
    /// * `url` - Validated http(s) source
    /// * `destination_hint` - Suggested output path; the backend may choose another
    ///
    /// # Errors
    ///
    /// [`BackendError::InvalidRequest`] when the backend refuses the transfer.
    async fn start(&self, url: &Url, destination_hint: &Path) -> Result<JobId, BackendError>;

    /// Read the current status of a transfer
    ///
    /// # Errors
    ///
    /// - [`BackendError::NotFound`] once the backend forgot the transfer
    /// - [`BackendError::TransientIo`] when the query itself failed and may be retried
    async fn status(&self, id: &JobId) -> Result<TransferStatus, BackendError>;

    /// Name used in log output
    fn name(&self) -> &str {
        "transfer-backend"
    }
}
