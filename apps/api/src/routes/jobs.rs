use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobDashboard, JobRow, JobUpdate, NewJob};
use crate::pipeline::{self, JobUpdateOutcome};
use crate::state::AppState;

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<NewJob>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    req.validate()?;
    let job = state.store.create_job(req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(state.store.get_job(job_id).await?))
}

/// PUT /api/jobs/:id
/// A changed description re-scores every candidate of the job before responding.
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<JobUpdate>,
) -> Result<Json<JobUpdateOutcome>, AppError> {
    let outcome =
        pipeline::update_job(state.store.as_ref(), &state.scorer, job_id, req).await?;
    Ok(Json(outcome))
}

/// DELETE /api/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_job(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/jobs/:id/dashboard
pub async fn handle_job_dashboard(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDashboard>, AppError> {
    Ok(Json(state.store.job_dashboard(job_id).await?))
}
