use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{
    CandidateDetail, CandidateFilter, CandidateRow, ScreeningStatusRow, ScreeningUpdate,
};
use crate::pipeline::{self, BatchUploadReport, UploadedFile};
use crate::scoring::Bucket;
use crate::screening::{self, SendScreeningRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BucketOverride {
    pub bucket: Bucket,
}

/// Fields of an upload form: the target job and one or more files.
struct UploadForm {
    job_id: Uuid,
    files: Vec<UploadedFile>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut job_id = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable job_id: {e}")))?;
                let parsed = text
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::Validation(format!("Invalid job_id '{text}'")))?;
                job_id = Some(parsed);
            }
            "file" | "files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Could not read upload {filename}: {e}"))
                })?;
                debug!("Received {filename} ({} bytes)", bytes.len());
                files.push(UploadedFile { filename, bytes });
            }
            other => debug!("Ignoring multipart field '{other}'"),
        }
    }

    let job_id =
        job_id.ok_or_else(|| AppError::Validation("Missing job_id field".to_string()))?;
    if files.is_empty() {
        return Err(AppError::Validation("No file uploaded".to_string()));
    }
    Ok(UploadForm { job_id, files })
}

/// POST /api/resumes/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CandidateDetail>), AppError> {
    let UploadForm { job_id, mut files } = read_upload_form(multipart).await?;
    if files.len() > 1 {
        return Err(AppError::Validation(
            "Single upload accepts exactly one file; use /api/resumes/upload-batch".to_string(),
        ));
    }
    let file = files.remove(0);

    let detail = pipeline::ingest_document(
        state.store.as_ref(),
        &state.scorer,
        &state.extractor,
        job_id,
        file,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// POST /api/resumes/upload-batch
pub async fn handle_upload_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BatchUploadReport>), AppError> {
    let UploadForm { job_id, files } = read_upload_form(multipart).await?;

    let report = pipeline::ingest_batch(
        state.store.as_ref(),
        &state.scorer,
        &state.extractor,
        job_id,
        files,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/resumes/job/:job_id?bucket=&min_match=
pub async fn handle_list_for_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(filter): Query<CandidateFilter>,
) -> Result<Json<Vec<CandidateDetail>>, AppError> {
    state.store.get_job(job_id).await?;
    Ok(Json(state.store.list_candidates(job_id, &filter).await?))
}

/// GET /api/resumes/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateDetail>, AppError> {
    Ok(Json(state.store.get_candidate(candidate_id).await?))
}

/// PATCH /api/resumes/:id/bucket
pub async fn handle_override_bucket(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(req): Json<BucketOverride>,
) -> Result<Json<CandidateRow>, AppError> {
    Ok(Json(
        state.store.update_bucket(candidate_id, req.bucket).await?,
    ))
}

/// POST /api/resumes/:id/send-screening-form
pub async fn handle_send_screening_form(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(req): Json<SendScreeningRequest>,
) -> Result<Json<ScreeningStatusRow>, AppError> {
    let status = screening::send_screening_form(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &state.config.screening_form_link,
        candidate_id,
        req,
    )
    .await?;
    Ok(Json(status))
}

/// PATCH /api/resumes/:id/email-status
pub async fn handle_update_email_status(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(req): Json<ScreeningUpdate>,
) -> Result<Json<ScreeningStatusRow>, AppError> {
    let status =
        screening::update_screening_status(state.store.as_ref(), candidate_id, req).await?;
    Ok(Json(status))
}
