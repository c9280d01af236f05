//! Ordered delivery of job snapshots to a single observer
//!
//! Every committed registry change is queued here and handed to the observer
//! by one task, so notifications never overlap and arrive in commit order.
//! After the observer returns, the matching [`Event`] is broadcast to subscribers.

use crate::types::{Event, Job};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Receiver of job snapshots
///
/// `notify` is awaited before the next snapshot is delivered. A slow observer
/// delays later notifications but never blocks pollers or the registry.
#[async_trait]
pub trait JobObserver: Send + Sync {
    /// Called once per committed change, in commit order
    async fn notify(&self, job: &Job);
}

/// Observer that discards every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

#[async_trait]
impl JobObserver for NoOpObserver {
    async fn notify(&self, _job: &Job) {}
}

/// Observer that forwards snapshots into a channel
///
/// Useful when the consumer runs its own loop (a UI thread, a websocket
/// writer) and wants to pull updates instead of being called.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Job>,
}

impl ChannelObserver {
    /// Create the observer and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl JobObserver for ChannelObserver {
    async fn notify(&self, job: &Job) {
        if self.tx.send(job.clone()).is_err() {
            tracing::debug!(job_id = %job.id, "Channel observer receiver dropped");
        }
    }
}

enum DispatchMessage {
    Deliver(Job),
    Flush(oneshot::Sender<()>),
    Close,
}

/// Cloneable sending side of the dispatcher queue
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<DispatchMessage>,
}

impl DispatchHandle {
    /// Enqueue a snapshot; never blocks
    pub(crate) fn deliver(&self, job: Job) {
        if let Err(mpsc::error::SendError(DispatchMessage::Deliver(job))) =
            self.tx.send(DispatchMessage::Deliver(job))
        {
            tracing::debug!(job_id = %job.id, "Dispatcher closed, dropping update");
        }
    }

    /// Wait until everything enqueued before this call has been delivered
    ///
    /// Returns immediately if the dispatcher is already closed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(DispatchMessage::Flush(done_tx)).is_ok() {
            done_rx.await.ok();
        }
    }
}

/// Single-consumer delivery task
pub struct UpdateDispatcher {
    handle: DispatchHandle,
    task: JoinHandle<()>,
}

impl UpdateDispatcher {
    /// Spawn the delivery task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(observer: Arc<dyn JobObserver>, event_tx: broadcast::Sender<Event>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<DispatchMessage>();

        let task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    DispatchMessage::Deliver(job) => {
                        deliver_one(observer.as_ref(), &job).await;
                        // No subscribers is fine
                        event_tx.send(Event::from_snapshot(job)).ok();
                    }
                    DispatchMessage::Flush(done) => {
                        done.send(()).ok();
                    }
                    DispatchMessage::Close => break,
                }
            }
            tracing::debug!("Update dispatcher stopped");
        });

        Self {
            handle: DispatchHandle { tx },
            task,
        }
    }

    /// Get a sending handle for the registry or other producers
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Deliver everything already queued, then stop the task
    pub async fn close(self) {
        if self.handle.tx.send(DispatchMessage::Close).is_err() {
            tracing::debug!("Update dispatcher already stopped");
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Update dispatcher task ended abnormally");
        }
    }
}

async fn deliver_one(observer: &dyn JobObserver, job: &Job) {
    if AssertUnwindSafe(observer.notify(job))
        .catch_unwind()
        .await
        .is_err()
    {
        tracing::error!(
            job_id = %job.id,
            status = %job.status,
            "Observer panicked while handling an update, continuing with the next one"
        );
    }
}
