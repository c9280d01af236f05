//! Application state for the API server

use crate::JobController;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The controller every handler delegates to
    pub controller: Arc<JobController>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(controller: Arc<JobController>) -> Self {
        Self { controller }
    }
}
