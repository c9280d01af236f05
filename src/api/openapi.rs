//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time by utoipa from the route
//! annotations in [`routes`](crate::api::routes).

use utoipa::OpenApi;

/// OpenAPI documentation for the transfer-tracker REST API
///
/// Served at `/openapi.json` and, when enabled, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "transfer-tracker REST API",
        version = "0.1.0",
        description = "Submit URLs for transfer and follow their progress to completion",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::list_jobs,
        crate::api::routes::submit_job,
        crate::api::routes::get_job,
        crate::api::routes::forget_job,
        crate::api::routes::complete_job,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::Job,
        crate::api::routes::SubmitRequest,
        crate::api::routes::CompletionResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Jobs - Submit transfers, inspect progress, forget finished jobs"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
