//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::JobController;

impl JobController {
    /// Gracefully shut down the controller
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting submissions
    /// 2. Signals every status poller and completion listener to stop
    /// 3. Waits for pollers to exit, bounded by `tracking.shutdown_timeout`
    /// 4. Delivers already committed updates to the observer
    /// 5. Emits [`Event::Shutdown`]
    ///
    /// A status query already in flight is allowed to finish. Job state is
    /// not persisted. Calling this more than once is harmless.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.tracking.accepting_new.swap(false, Ordering::SeqCst) {
            tracing::debug!("Shutdown already in progress or complete");
            return Ok(());
        }
        tracing::info!("Initiating graceful shutdown");

        let active_count = self.tracking.pollers.len().await;
        self.tracking.shutdown.cancel();
        tracing::info!(active_count, "Signaled pollers and listeners to stop");

        let shutdown_timeout = self.config.tracking.shutdown_timeout;
        match tokio::time::timeout(shutdown_timeout, self.wait_for_pollers()).await {
            Ok(()) => tracing::info!("All pollers stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Timeout waiting for pollers to stop, proceeding with shutdown"
            ),
        }

        let listeners = std::mem::take(&mut *self.tracking.listeners.lock().await);
        for listener in listeners {
            if let Err(e) = listener.await {
                tracing::warn!(error = %e, "Completion listener ended abnormally");
            }
        }

        if let Some(dispatcher) = self.dispatcher.lock().await.take() {
            dispatcher.close().await;
            tracing::info!("Pending updates delivered");
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        !self.tracking.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_pollers(&self) {
        loop {
            let active_count = self.tracking.pollers.len().await;
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for pollers to stop");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
