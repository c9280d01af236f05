//! Job handlers.

use super::{CompletionResponse, SubmitRequest};
use crate::api::AppState;
use crate::types::JobId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /jobs - List all jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Every tracked job, oldest first", body = Vec<crate::types::Job>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.list().await))
}

/// GET /jobs/:id - Get single job
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Latest snapshot of the job", body = crate::types::Job),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.controller.get(&JobId::new(id)).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /jobs - Submit a URL for transfer
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Job registered and tracking started", body = crate::types::Job),
        (status = 400, description = "Empty, malformed or unsupported URL", body = crate::error::ApiError),
        (status = 409, description = "Backend reused an id that is still registered", body = crate::error::ApiError),
        (status = 422, description = "Backend refused the transfer", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    match state.controller.submit(&request.url).await {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /jobs/:id - Forget a finished job
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 204, description = "Job removed from the registry"),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job is still active", body = crate::error::ApiError)
    )
)]
pub async fn forget_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.controller.forget(&JobId::new(id)).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /jobs/:id/complete - Deliver a completion signal
#[utoipa::path(
    post,
    path = "/jobs/{id}/complete",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Signal processed; unknown and finished jobs are left untouched", body = CompletionResponse)
    )
)]
pub async fn complete_job(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let outcome = state.controller.notify_completed(&JobId::new(id)).await;
    (StatusCode::OK, Json(CompletionResponse::from(outcome)))
}
