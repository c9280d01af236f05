//! Push-style completion signals.
//!
//! Some backends announce finished transfers instead of (or in addition to)
//! answering status queries. The listener turns each announced id into a
//! `Completed` commit. Signals for unknown or already-finished jobs are
//! expected (the poller may have won the race) and are ignored.

use crate::error::{Error, RegistryError, Result};
use crate::registry::JobRegistry;
use crate::types::{Job, JobId};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::JobController;
use super::poller::ActivePollers;

/// Buffer size of the channel created by [`JobController::completion_sender`]
const COMPLETION_CHANNEL_CAPACITY: usize = 256;

/// What a completion signal did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The job was committed as `Completed`
    Finalized(Job),
    /// The job had already reached a terminal status
    AlreadyTerminal,
    /// No job with this id is registered
    Unknown,
}

/// Applies completion signals to the registry
#[derive(Clone)]
pub struct CompletionListener {
    registry: JobRegistry,
    pollers: ActivePollers,
}

impl CompletionListener {
    pub(crate) fn new(registry: JobRegistry, pollers: ActivePollers) -> Self {
        Self { registry, pollers }
    }

    /// Mark `id` completed with 100% progress and stop its poller
    ///
    /// The poller is cancelled after the commit. A status query it already
    /// started still runs once; its result is rejected by the registry and
    /// the poller then exits.
    pub async fn handle(&self, id: &JobId) -> CompletionOutcome {
        match self.registry.update(id, Job::complete).await {
            Ok(job) => {
                self.pollers.cancel(id).await;
                tracing::info!(job_id = %id, name = %job.display_name, "Transfer completion signalled");
                CompletionOutcome::Finalized(job)
            }
            Err(RegistryError::TerminalState { status, .. }) => {
                tracing::debug!(job_id = %id, %status, "Completion signal for finished job ignored");
                CompletionOutcome::AlreadyTerminal
            }
            Err(e) => {
                tracing::debug!(job_id = %id, error = %e, "Completion signal for unknown job ignored");
                CompletionOutcome::Unknown
            }
        }
    }

    /// Consume signals until the stream ends or `cancel` fires
    pub async fn run<S>(self, mut signals: S, cancel: CancellationToken)
    where
        S: Stream<Item = JobId> + Send + Unpin,
    {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = signals.next() => match next {
                    Some(id) => {
                        self.handle(&id).await;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Completion listener stopped");
    }
}

/// Sending half of a completion signal channel
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::Sender<JobId>,
}

impl CompletionSender {
    /// Announce that the transfer `id` finished
    ///
    /// # Errors
    ///
    /// [`Error::ShuttingDown`] once the listener has stopped.
    pub async fn signal(&self, id: impl Into<JobId>) -> Result<()> {
        self.tx
            .send(id.into())
            .await
            .map_err(|_| Error::ShuttingDown)
    }
}

/// Create a bounded completion channel usable with [`JobController::listen`]
pub fn completion_channel(capacity: usize) -> (CompletionSender, ReceiverStream<JobId>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CompletionSender { tx }, ReceiverStream::new(rx))
}

impl JobController {
    /// Listener bound to this controller's registry, for direct calls
    pub fn completion_listener(&self) -> CompletionListener {
        CompletionListener::new(self.registry.clone(), self.tracking.pollers.clone())
    }

    /// Apply one completion signal immediately
    pub async fn notify_completed(&self, id: &JobId) -> CompletionOutcome {
        self.completion_listener().handle(id).await
    }

    /// Spawn a listener consuming `signals` until shutdown or end of stream
    pub async fn listen<S>(&self, signals: S)
    where
        S: Stream<Item = JobId> + Send + Unpin + 'static,
    {
        let listener = self.completion_listener();
        let cancel = self.tracking.shutdown.child_token();
        let handle = tokio::spawn(listener.run(signals, cancel));
        self.tracking.listeners.lock().await.push(handle);
    }

    /// Create a completion channel whose receiving end is already being listened to
    pub async fn completion_sender(&self) -> CompletionSender {
        let (sender, signals) = completion_channel(COMPLETION_CHANNEL_CAPACITY);
        self.listen(signals).await;
        sender
    }
}
