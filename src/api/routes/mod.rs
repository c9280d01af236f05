//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Submission, inspection, completion and removal of jobs
//! - [`system`] - Health, events, OpenAPI, shutdown

use crate::controller::CompletionOutcome;
use crate::types::Job;
use serde::{Deserialize, Serialize};

mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` works from the router
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitRequest {
    /// Location of the file to transfer (http or https)
    pub url: String,
}

/// Response for POST /jobs/:id/complete
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CompletionResponse {
    /// "finalized", "already_terminal" or "unknown"
    pub outcome: String,
    /// Final snapshot when the signal finalized the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
}

impl From<CompletionOutcome> for CompletionResponse {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Finalized(job) => Self {
                outcome: "finalized".to_string(),
                job: Some(job),
            },
            CompletionOutcome::AlreadyTerminal => Self {
                outcome: "already_terminal".to_string(),
                job: None,
            },
            CompletionOutcome::Unknown => Self {
                outcome: "unknown".to_string(),
                job: None,
            },
        }
    }
}
