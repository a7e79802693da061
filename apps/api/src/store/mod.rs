//! Candidate Record Store: persistence for jobs, candidates, analyses and screening state.
//!
//! `PgCandidateStore` is the production backend; `MemoryCandidateStore` backs tests
//! and local runs without `DATABASE_URL`. Both guarantee that a candidate's bucket and
//! its analysis are written together or not at all.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{
    AnalysisRow, CandidateDetail, CandidateFilter, CandidateRow, NewCandidate, ScreeningStatusRow,
    ScreeningUpdate,
};
use crate::models::job::{JobDashboard, JobRow, JobUpdate, NewJob};
use crate::scoring::{Bucket, MatchVerdict};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCandidateStore;
pub use postgres::PgCandidateStore;

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn create_job(&self, job: NewJob) -> Result<JobRow, AppError>;

    async fn get_job(&self, job_id: Uuid) -> Result<JobRow, AppError>;

    /// Newest first.
    async fn list_jobs(&self) -> Result<Vec<JobRow>, AppError>;

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<JobRow, AppError>;

    /// Removes the job together with every candidate, analysis and screening status it owns.
    async fn delete_job(&self, job_id: Uuid) -> Result<(), AppError>;

    async fn job_dashboard(&self, job_id: Uuid) -> Result<JobDashboard, AppError>;

    /// Inserts the candidate with bucket `reject` and a `not_sent` screening status.
    async fn create_candidate(&self, candidate: NewCandidate) -> Result<CandidateRow, AppError>;

    async fn get_candidate(&self, candidate_id: Uuid) -> Result<CandidateDetail, AppError>;

    /// Filtered listing ordered by match percentage descending, unscored last.
    async fn list_candidates(
        &self,
        job_id: Uuid,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateDetail>, AppError>;

    /// Every candidate of a job in upload order.
    async fn candidates_for_job(&self, job_id: Uuid) -> Result<Vec<CandidateDetail>, AppError>;

    /// Inserts or fully overwrites the candidate's analysis and sets its bucket, atomically.
    async fn record_analysis(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
        verdict: &MatchVerdict,
    ) -> Result<AnalysisRow, AppError>;

    /// Overwrites an existing analysis and sets the bucket, atomically.
    /// Fails with `AnalysisRecordMissing` when the candidate was never scored.
    async fn rescore_candidate(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
        verdict: &MatchVerdict,
    ) -> Result<AnalysisRow, AppError>;

    /// Manual override.
    async fn update_bucket(&self, candidate_id: Uuid, bucket: Bucket)
        -> Result<CandidateRow, AppError>;

    /// Returns the screening status, creating a `not_sent` one if it is missing.
    async fn screening_status(&self, candidate_id: Uuid) -> Result<ScreeningStatusRow, AppError>;

    async fn mark_screening_sent(
        &self,
        candidate_id: Uuid,
        form_link: &str,
    ) -> Result<ScreeningStatusRow, AppError>;

    async fn update_screening(
        &self,
        candidate_id: Uuid,
        update: ScreeningUpdate,
    ) -> Result<ScreeningStatusRow, AppError>;
}
