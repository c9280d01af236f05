//! Job tracking façade split into focused submodules.
//!
//! The `JobController` struct and its methods are organized by concern:
//! - [`submit`] - URL validation, backend start, registration, forgetting jobs
//! - [`poller`] - Per-job periodic status polling
//! - [`listener`] - Push-style completion signals
//! - [`lifecycle`] - Shutdown coordination

mod lifecycle;
mod listener;
mod poller;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use listener::{CompletionListener, CompletionOutcome, CompletionSender, completion_channel};
pub use poller::{PollOutcome, StatusPoller, derive_progress, map_status};

use crate::backend::TransferBackend;
use crate::config::Config;
use crate::dispatcher::{DispatchHandle, JobObserver, UpdateDispatcher};
use crate::error::Result;
use crate::registry::JobRegistry;
use crate::types::{Event, Job, JobId};
use poller::ActivePollers;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Poller, listener and shutdown bookkeeping
#[derive(Clone)]
pub(crate) struct TrackingState {
    /// Running pollers keyed by job id (at most one per job)
    pub(crate) pollers: ActivePollers,
    /// Completion listener tasks, joined during shutdown
    pub(crate) listeners: Arc<Mutex<Vec<JoinHandle<()>>>>,
    /// Parent token of every poller and listener
    pub(crate) shutdown: CancellationToken,
    /// Flag to indicate whether new submissions are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Entry point for submitting and observing transfers (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct JobController {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Service that performs the transfers
    pub(crate) backend: Arc<dyn TransferBackend>,
    /// Source of truth for job state
    pub(crate) registry: JobRegistry,
    /// Poll loop shared by every tracked job
    pub(crate) poller: StatusPoller,
    /// Queue feeding the update dispatcher
    pub(crate) dispatch: DispatchHandle,
    /// Dispatcher task, taken and closed on shutdown
    pub(crate) dispatcher: Arc<Mutex<Option<UpdateDispatcher>>>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Poller and listener bookkeeping
    pub(crate) tracking: TrackingState,
}

impl JobController {
    /// Create a controller
    ///
    /// Spawns the update dispatcher, so this must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated before anything is spawned
    /// * `backend` - Service that performs the transfers
    /// * `observer` - Receives every committed job change, serially and in order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is unusable.
    pub fn new(
        config: Config,
        backend: Arc<dyn TransferBackend>,
        observer: Arc<dyn JobObserver>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let (event_tx, _rx) = broadcast::channel(config.dispatch.event_buffer);
        let dispatcher = UpdateDispatcher::spawn(observer, event_tx.clone());
        let dispatch = dispatcher.handle();
        let registry = JobRegistry::with_dispatcher(dispatch.clone());
        let poller = StatusPoller::new(backend.clone(), registry.clone(), &config.tracking);

        tracing::info!(
            backend = backend.name(),
            poll_interval_ms = config.tracking.poll_interval.as_millis() as u64,
            max_transient_failures = config.tracking.max_transient_failures,
            "Job controller started"
        );

        Ok(Self {
            config,
            backend,
            registry,
            poller,
            dispatch,
            dispatcher: Arc::new(Mutex::new(Some(dispatcher))),
            event_tx,
            tracking: TrackingState {
                pollers: ActivePollers::default(),
                listeners: Arc::new(Mutex::new(Vec::new())),
                shutdown: CancellationToken::new(),
                accepting_new: Arc::new(AtomicBool::new(true)),
            },
        })
    }

    /// Subscribe to job events
    ///
    /// Events are broadcast after the observer has been notified of the same
    /// change. Slow subscribers may miss events (`RecvError::Lagged`).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine
        self.event_tx.send(event).ok();
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Underlying job registry
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Snapshot of one job
    pub async fn get(&self, id: &JobId) -> Result<Job> {
        Ok(self.registry.get(id).await?)
    }

    /// All jobs, oldest first
    pub async fn list(&self) -> Vec<Job> {
        self.registry.list().await
    }

    /// Whether a status poller is currently running for `id`
    pub async fn is_tracking(&self, id: &JobId) -> bool {
        self.tracking.pollers.contains(id).await
    }

    /// Number of running status pollers
    pub async fn active_pollers(&self) -> usize {
        self.tracking.pollers.len().await
    }

    /// Wait until every change committed so far has reached the observer
    pub async fn flush_updates(&self) {
        self.dispatch.flush().await;
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 127.0.0.1:6790).
    pub fn spawn_api_server(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let controller = Arc::clone(self);

        tokio::spawn(async move { crate::api::start_api_server(controller).await })
    }
}
