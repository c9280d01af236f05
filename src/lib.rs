//! # transfer-tracker
//!
//! Tracks file transfers delegated to an external transfer backend.
//!
//! ## Design Philosophy
//!
//! transfer-tracker is designed to be:
//! - **Backend-agnostic** - The bytes are moved by whatever implements [`TransferBackend`]
//! - **Consistent** - Every job lives in one [`JobRegistry`] and changes are observed in order
//! - **Library-first** - Embed the controller, optionally expose it over the REST API
//! - **Event-driven** - Consumers get snapshots through a [`JobObserver`] or the event stream
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use transfer_tracker::{ChannelObserver, Config, JobController, TransferBackend};
//!
//! # async fn example(backend: Arc<dyn TransferBackend>) -> Result<(), Box<dyn std::error::Error>> {
//! let (observer, mut updates) = ChannelObserver::new();
//! let controller = JobController::new(Config::default(), backend, Arc::new(observer))?;
//!
//! let job = controller.submit("https://example.com/files/report.pdf").await?;
//! println!("tracking {} as {}", job.display_name, job.id);
//!
//! while let Some(snapshot) = updates.recv().await {
//!     println!("{}: {} {}%", snapshot.id, snapshot.status, snapshot.progress_percent);
//!     if snapshot.is_terminal() {
//!         break;
//!     }
//! }
//!
//! controller.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Transfer backend abstraction
pub mod backend;
/// Configuration types
pub mod config;
/// Job controller: submission, polling, completion signals, shutdown
pub mod controller;
/// Ordered delivery of job snapshots to observers
pub mod dispatcher;
/// Error types
pub mod error;
/// Authoritative job store
pub mod registry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use backend::{RawStatus, TransferBackend, TransferStatus};
pub use config::Config;
pub use controller::{
    CompletionListener, CompletionOutcome, CompletionSender, JobController, PollOutcome,
    completion_channel,
};
pub use dispatcher::{ChannelObserver, JobObserver, NoOpObserver, UpdateDispatcher};
pub use error::{
    ApiError, BackendError, Error, ErrorDetail, RegistryError, Result, ToHttpStatus,
};
pub use registry::JobRegistry;
pub use types::{Event, Job, JobId, JobStatus};

/// Helper function to run the controller with graceful signal handling.
///
/// Waits for a termination signal and then calls the controller's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use transfer_tracker::{Config, JobController, NoOpObserver, TransferBackend, run_with_shutdown};
///
/// # async fn example(backend: Arc<dyn TransferBackend>) -> Result<(), Box<dyn std::error::Error>> {
/// let controller = JobController::new(Config::default(), backend, Arc::new(NoOpObserver))?;
///
/// // Run with automatic signal handling
/// run_with_shutdown(controller).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_with_shutdown(controller: JobController) -> Result<()> {
    wait_for_signal().await;
    controller.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
