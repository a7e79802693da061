use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobRow, JobUpdate};
use crate::scoring::{classify, ScorerHandle};
use crate::store::CandidateStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReevaluationReport {
    pub job_id: Uuid,
    pub rescored: usize,
}

#[derive(Debug, Serialize)]
pub struct JobUpdateOutcome {
    pub job: JobRow,
    /// Present when the description changed and candidates were rescored.
    pub reevaluation: Option<ReevaluationReport>,
}

/// Rescores every candidate of `job_id` against `job_description`, in upload order.
///
/// Stops at the first candidate that cannot be rescored. Candidates before it
/// keep their new scores, it keeps its old one, and the rest are not visited.
pub async fn reevaluate_job(
    store: &dyn CandidateStore,
    scorer: &ScorerHandle,
    job_id: Uuid,
    job_description: &str,
) -> Result<ReevaluationReport, AppError> {
    let candidates = store.candidates_for_job(job_id).await?;
    if candidates.is_empty() {
        info!("Job {job_id} has no candidates to re-evaluate");
        return Ok(ReevaluationReport {
            job_id,
            rescored: 0,
        });
    }

    let Some(scorer) = scorer.scorer() else {
        return Err(AppError::ScorerUnavailable(format!(
            "cannot re-evaluate {} candidate(s) of job {job_id}",
            candidates.len()
        )));
    };

    info!("Re-evaluating {} candidate(s) for job {job_id}", candidates.len());

    let mut rescored = 0;
    for detail in &candidates {
        let candidate_id = detail.candidate.id;
        let abort = |reason: String| {
            warn!("Re-evaluation of job {job_id} stopped at candidate {candidate_id}: {reason}");
            AppError::ReevaluationAborted {
                candidate_id,
                succeeded: rescored,
                reason,
            }
        };

        if detail.analysis.is_none() {
            return Err(abort(AppError::AnalysisRecordMissing(candidate_id).to_string()));
        }

        let verdict = scorer
            .score(&detail.candidate.extracted_text, job_description)
            .await
            .map_err(|e| abort(e.to_string()))?;

        let bucket = classify(verdict.match_percentage);
        store
            .rescore_candidate(candidate_id, bucket, &verdict)
            .await
            .map_err(|e| abort(e.to_string()))?;

        rescored += 1;
    }

    info!("Re-evaluated {rescored} candidate(s) for job {job_id}");
    Ok(ReevaluationReport { job_id, rescored })
}

/// Applies a job update and re-evaluates candidates when the description changed.
///
/// The job update is committed before re-evaluation starts and stays committed
/// if re-evaluation aborts; the abort is returned as the error.
pub async fn update_job(
    store: &dyn CandidateStore,
    scorer: &ScorerHandle,
    job_id: Uuid,
    update: JobUpdate,
) -> Result<JobUpdateOutcome, AppError> {
    update.validate()?;

    let before = store.get_job(job_id).await?;
    let job = store.update_job(job_id, update).await?;

    let reevaluation = if job.description != before.description {
        Some(reevaluate_job(store, scorer, job_id, &job.description).await?)
    } else {
        None
    };

    Ok(JobUpdateOutcome { job, reevaluation })
}
