//! Shared test helpers: a scripted backend, a recording observer, and controller setup.

use crate::backend::{RawStatus, TransferBackend, TransferStatus};
use crate::config::Config;
use crate::controller::JobController;
use crate::dispatcher::JobObserver;
use crate::error::BackendError;
use crate::types::{Job, JobId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub(crate) type StatusReply = Result<TransferStatus, BackendError>;

pub(crate) fn running(downloaded: u64, total: u64) -> StatusReply {
    Ok(TransferStatus::new(RawStatus::Running, downloaded, total))
}

pub(crate) fn running_unknown_total(downloaded: u64) -> StatusReply {
    Ok(TransferStatus::unknown_total(RawStatus::Running, downloaded))
}

pub(crate) fn pending() -> StatusReply {
    Ok(TransferStatus::unknown_total(RawStatus::Pending, 0))
}

pub(crate) fn paused(downloaded: u64, total: u64) -> StatusReply {
    Ok(TransferStatus::new(RawStatus::Paused, downloaded, total))
}

pub(crate) fn successful(total: u64) -> StatusReply {
    Ok(TransferStatus::new(RawStatus::Successful, total, total))
}

pub(crate) fn backend_failed(downloaded: u64, total: u64) -> StatusReply {
    Ok(TransferStatus::new(RawStatus::Failed, downloaded, total))
}

pub(crate) fn transient() -> StatusReply {
    Err(BackendError::TransientIo("connection reset".to_string()))
}

pub(crate) fn gone(id: &str) -> StatusReply {
    Err(BackendError::NotFound { id: JobId::new(id) })
}

/// Backend whose status replies are scripted per transfer
///
/// Each `start` consumes the next script queued with [`ScriptedBackend::script`]
/// (or a default "running forever" script). `status` pops replies in order and
/// keeps repeating the last one.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    next_id: AtomicU64,
    pending_scripts: Mutex<VecDeque<Vec<StatusReply>>>,
    scripts: Mutex<HashMap<JobId, VecDeque<StatusReply>>>,
    queries: Mutex<HashMap<JobId, usize>>,
    started: Mutex<Vec<(Url, PathBuf)>>,
    reject_with: Mutex<Option<String>>,
    fixed_id: Mutex<Option<JobId>>,
    panic_on_status: AtomicBool,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replies for the next started transfer
    pub(crate) fn script(&self, replies: Vec<StatusReply>) {
        self.pending_scripts.lock().unwrap().push_back(replies);
    }

    pub(crate) fn reject_starts(&self, message: &str) {
        *self.reject_with.lock().unwrap() = Some(message.to_string());
    }

    /// Hand out the same id for every start
    pub(crate) fn reuse_id(&self, id: &str) {
        *self.fixed_id.lock().unwrap() = Some(JobId::new(id));
    }

    pub(crate) fn panic_on_status(&self) {
        self.panic_on_status.store(true, Ordering::SeqCst);
    }

    pub(crate) fn queries_for(&self, id: &JobId) -> usize {
        self.queries.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub(crate) fn started(&self) -> Vec<(Url, PathBuf)> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferBackend for ScriptedBackend {
    async fn start(&self, url: &Url, destination_hint: &Path) -> Result<JobId, BackendError> {
        if let Some(message) = self.reject_with.lock().unwrap().clone() {
            return Err(BackendError::InvalidRequest(message));
        }

        let id = match self.fixed_id.lock().unwrap().clone() {
            Some(id) => id,
            None => JobId::from(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
        };

        let script = self
            .pending_scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![running(10, 1000)]);
        self.scripts
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_insert_with(|| script.into());
        self.started
            .lock()
            .unwrap()
            .push((url.clone(), destination_hint.to_path_buf()));

        Ok(id)
    }

    async fn status(&self, id: &JobId) -> Result<TransferStatus, BackendError> {
        *self.queries.lock().unwrap().entry(id.clone()).or_default() += 1;

        if self.panic_on_status.load(Ordering::SeqCst) {
            panic!("scripted backend exploded");
        }

        let mut scripts = self.scripts.lock().unwrap();
        let Some(replies) = scripts.get_mut(id) else {
            return Err(BackendError::NotFound { id: id.clone() });
        };

        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err(BackendError::NotFound { id: id.clone() }))
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Observer that records every snapshot and counts overlapping calls
#[derive(Default)]
pub(crate) struct RecordingObserver {
    seen: Mutex<Vec<Job>>,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
    delay: Option<Duration>,
    panic_on: Option<JobId>,
}

impl RecordingObserver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn panicking_on(id: JobId) -> Self {
        Self {
            panic_on: Some(id),
            ..Self::default()
        }
    }

    pub(crate) fn snapshots_for(&self, id: &JobId) -> Vec<Job> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|job| &job.id == id)
            .cloned()
            .collect()
    }

    pub(crate) fn all(&self) -> Vec<Job> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobObserver for RecordingObserver {
    async fn notify(&self, job: &Job) {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        if self.panic_on.as_ref() == Some(&job.id) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            panic!("observer rejected job {}", job.id);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.seen.lock().unwrap().push(job.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Config used by controller tests: 1 s polling, three transient failures allowed
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.tracking.max_transient_failures = 3;
    config.tracking.shutdown_timeout = Duration::from_secs(5);
    config.transfer.destination_dir = PathBuf::from("/downloads");
    config
}

/// Controller over the given backend and observer with [`test_config`]
pub(crate) fn create_test_controller(
    backend: Arc<ScriptedBackend>,
    observer: Arc<RecordingObserver>,
) -> JobController {
    JobController::new(test_config(), backend, observer).unwrap()
}

/// Wait (in virtual time when the clock is paused) until no poller is running,
/// then until the observer has seen every committed change.
pub(crate) async fn wait_until_settled(controller: &JobController) {
    tokio::time::timeout(Duration::from_secs(600), async {
        while controller.active_pollers().await > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("pollers did not settle");
    controller.flush_updates().await;
}
