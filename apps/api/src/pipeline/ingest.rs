use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{extract_contacts, TextExtractor};
use crate::models::candidate::{CandidateDetail, NewCandidate};
use crate::scoring::{classify, ScorerHandle};
use crate::store::CandidateStore;

/// One file taken from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize)]
pub struct FailedUpload {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchUploadReport {
    pub uploaded: Vec<CandidateDetail>,
    pub failed: Vec<FailedUpload>,
}

fn is_pdf(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

/// Width of the `candidates.filename` column.
const MAX_FILENAME_CHARS: usize = 255;
const PDF_EXTENSION_LEN: usize = ".pdf".len();

/// Shortens the stem of an over-long filename so the stored name still ends
/// in its original extension. Callers have already checked `is_pdf`, so the
/// last four bytes are ASCII.
fn clamp_filename(filename: String) -> String {
    if filename.chars().count() <= MAX_FILENAME_CHARS {
        return filename;
    }
    let (stem, extension) = filename.split_at(filename.len() - PDF_EXTENSION_LEN);
    let mut clamped: String = stem
        .chars()
        .take(MAX_FILENAME_CHARS - PDF_EXTENSION_LEN)
        .collect();
    clamped.push_str(extension);
    clamped
}

/// Extracts, stores and (when a scorer is available) scores one resume.
///
/// Only validation, extraction and the candidate insert can fail the upload.
/// When scoring yields no verdict the candidate is kept in `reject` without an
/// analysis record.
pub async fn ingest_document(
    store: &dyn CandidateStore,
    scorer: &ScorerHandle,
    extractor: &TextExtractor,
    job_id: Uuid,
    file: UploadedFile,
) -> Result<CandidateDetail, AppError> {
    if !is_pdf(&file.filename) {
        return Err(AppError::Validation(format!(
            "Only PDF files are allowed (got '{}')",
            file.filename
        )));
    }

    let job = store.get_job(job_id).await?;

    let extracted_text = extractor.extract(file.bytes).await.map_err(|e| {
        warn!("Extraction failed for {}: {e}", file.filename);
        AppError::ExtractionFailed(file.filename.clone())
    })?;
    let contacts = extract_contacts(&extracted_text);

    let candidate = store
        .create_candidate(NewCandidate {
            job_id,
            filename: clamp_filename(file.filename),
            extracted_text,
            name: contacts.name,
            email: contacts.email,
            phone: contacts.phone,
        })
        .await?;

    match scorer.scorer() {
        Some(scorer) => match scorer.score(&candidate.extracted_text, &job.description).await {
            Ok(verdict) => {
                let bucket = classify(verdict.match_percentage);
                match store.record_analysis(candidate.id, bucket, &verdict).await {
                    Ok(_) => info!(
                        "Candidate {} scored {:.1}% -> {bucket}",
                        candidate.id, verdict.match_percentage
                    ),
                    Err(e) => error!("Failed to store analysis for candidate {}: {e}", candidate.id),
                }
            }
            Err(e) => warn!("No verdict for candidate {}, left unscored: {e}", candidate.id),
        },
        None => warn!(
            "Match scorer unavailable, candidate {} stored without analysis",
            candidate.id
        ),
    }

    store.get_candidate(candidate.id).await
}

/// Runs `ingest_document` for every file in order. A failing file is recorded
/// and does not stop the rest of the batch.
pub async fn ingest_batch(
    store: &dyn CandidateStore,
    scorer: &ScorerHandle,
    extractor: &TextExtractor,
    job_id: Uuid,
    files: Vec<UploadedFile>,
) -> Result<BatchUploadReport, AppError> {
    // an unknown job fails the whole request rather than every file
    store.get_job(job_id).await?;

    let mut report = BatchUploadReport::default();
    for file in files {
        let filename = file.filename.clone();
        match ingest_document(store, scorer, extractor, job_id, file).await {
            Ok(detail) => report.uploaded.push(detail),
            Err(e) => {
                warn!("Batch upload: {filename} failed: {e}");
                report.failed.push(FailedUpload {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Batch upload for job {job_id}: {} uploaded, {} failed",
        report.uploaded.len(),
        report.failed.len()
    );
    Ok(report)
}
