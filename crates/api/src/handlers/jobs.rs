//! Handlers for the `/jobs` resource.
//!
//! Submission, listing and edits require a session. Reading a single job
//! accepts anonymous callers for public jobs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mu2mi_core::params::{JobRequest, ModelParams};
use mu2mi_core::types::DbId;
use mu2mi_db::models::job::UpdateJob;
use serde::de::DeserializeOwned;

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/jobs/{generate,separate,analyze,transcribe-midi,transcribe-lyrics}
///
/// One handler per kind, selected by the parameter type. Returns 202 once
/// the prediction has been accepted by the provider.
pub async fn submit<P>(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<JobRequest<P>>,
) -> AppResult<impl IntoResponse>
where
    P: ModelParams + DeserializeOwned + Send + Sync + 'static,
{
    let submission = state
        .services
        .submitter
        .submit(&auth.user_id, input)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: submission })))
}

/// GET /api/v1/jobs
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.services.jobs.list(&auth.user_id).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
///
/// Status plus every bound asset with a freshly presigned download URL.
pub async fn get_job(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.services.jobs.view(job_id, viewer.user_id()).await?;
    Ok(Json(DataResponse { data: job }))
}

/// PATCH /api/v1/jobs/{id}
pub async fn update_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<UpdateJob>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .services
        .jobs
        .update(&auth.user_id, job_id, input)
        .await?;
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/v1/jobs/{id}
pub async fn delete_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.services.jobs.delete(&auth.user_id, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
