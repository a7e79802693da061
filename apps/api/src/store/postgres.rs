use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{
    AnalysisRow, CandidateDetail, CandidateFilter, CandidateRow, NewCandidate, ScreeningState,
    ScreeningStatusRow, ScreeningUpdate,
};
use crate::models::job::{JobDashboard, JobRow, JobUpdate, NewJob};
use crate::scoring::{Bucket, MatchVerdict};
use crate::store::CandidateStore;

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attaches analyses and screening statuses to a list of candidates, preserving order.
    async fn hydrate(&self, candidates: Vec<CandidateRow>) -> Result<Vec<CandidateDetail>, AppError> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();

        let mut analyses: HashMap<Uuid, AnalysisRow> = sqlx::query_as::<_, AnalysisRow>(
            "SELECT * FROM match_analyses WHERE candidate_id = ANY($1)",
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|a| (a.candidate_id, a))
        .collect();

        let mut statuses: HashMap<Uuid, ScreeningStatusRow> =
            sqlx::query_as::<_, ScreeningStatusRow>(
                "SELECT * FROM screening_statuses WHERE candidate_id = ANY($1)",
            )
            .bind(&ids[..])
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|s| (s.candidate_id, s))
            .collect();

        Ok(candidates
            .into_iter()
            .map(|candidate| CandidateDetail {
                analysis: analyses.remove(&candidate.id),
                screening: statuses.remove(&candidate.id),
                candidate,
            })
            .collect())
    }

    /// Locks the candidate row and sets its bucket inside `tx`.
    async fn set_bucket(
        tx: &mut Transaction<'_, Postgres>,
        candidate_id: Uuid,
        bucket: Bucket,
    ) -> Result<CandidateRow, AppError> {
        sqlx::query_as::<_, CandidateRow>(
            "UPDATE candidates SET bucket = $1 WHERE id = $2 RETURNING *",
        )
        .bind(bucket.as_str())
        .bind(candidate_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::CandidateNotFound(candidate_id))
    }

    async fn ensure_candidate(&self, candidate_id: Uuid) -> Result<(), AppError> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM candidates WHERE id = $1")
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?;
        exists
            .map(|_| ())
            .ok_or(AppError::CandidateNotFound(candidate_id))
    }

    async fn ensure_screening_row(
        tx: &mut Transaction<'_, Postgres>,
        candidate_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO screening_statuses (candidate_id) VALUES ($1) ON CONFLICT (candidate_id) DO NOTHING",
        )
        .bind(candidate_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn create_job(&self, job: NewJob) -> Result<JobRow, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            "INSERT INTO jobs (id, title, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&job.title)
        .bind(&job.description)
        .fetch_one(&self.pool)
        .await?;

        info!("Created job {} ({})", row.id, row.title);
        Ok(row)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<JobRow, AppError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::JobNotFound(job_id))
    }

    async fn list_jobs(&self) -> Result<Vec<JobRow>, AppError> {
        Ok(
            sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<JobRow, AppError> {
        sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::JobNotFound(job_id))
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<(), AppError> {
        // candidates, analyses and screening statuses go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::JobNotFound(job_id));
        }
        info!("Deleted job {job_id}");
        Ok(())
    }

    async fn job_dashboard(&self, job_id: Uuid) -> Result<JobDashboard, AppError> {
        self.get_job(job_id).await?;

        let (total, strong, potential, reject, average, pending): (
            i64,
            i64,
            i64,
            i64,
            Option<f64>,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE c.bucket = 'strong_fit'),
                COUNT(*) FILTER (WHERE c.bucket = 'potential'),
                COUNT(*) FILTER (WHERE c.bucket = 'reject'),
                AVG(a.match_percentage),
                COUNT(*) FILTER (WHERE s.status = 'sent')
            FROM candidates c
            LEFT JOIN match_analyses a ON a.candidate_id = c.id
            LEFT JOIN screening_statuses s ON s.candidate_id = c.id
            WHERE c.job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(JobDashboard {
            job_id,
            total_candidates: total,
            strong_fit_count: strong,
            potential_count: potential,
            reject_count: reject,
            average_match_percentage: average,
            pending_screening_responses: pending,
        })
    }

    async fn create_candidate(&self, candidate: NewCandidate) -> Result<CandidateRow, AppError> {
        let mut tx = self.pool.begin().await?;

        let job_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM jobs WHERE id = $1")
            .bind(candidate.job_id)
            .fetch_optional(&mut *tx)
            .await?;
        if job_exists.is_none() {
            return Err(AppError::JobNotFound(candidate.job_id));
        }

        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates
                (id, job_id, filename, extracted_text, name, email, phone, bucket)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(candidate.job_id)
        .bind(&candidate.filename)
        .bind(&candidate.extracted_text)
        .bind(candidate.name.as_deref())
        .bind(candidate.email.as_deref())
        .bind(candidate.phone.as_deref())
        .bind(Bucket::Reject.as_str())
        .fetch_one(&mut *tx)
        .await?;

        Self::ensure_screening_row(&mut tx, row.id).await?;
        tx.commit().await?;

        info!("Stored candidate {} for job {}", row.id, row.job_id);
        Ok(row)
    }

    async fn get_candidate(&self, candidate_id: Uuid) -> Result<CandidateDetail, AppError> {
        let candidate =
            sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(AppError::CandidateNotFound(candidate_id))?;

        self.hydrate(vec![candidate])
            .await?
            .pop()
            .ok_or(AppError::CandidateNotFound(candidate_id))
    }

    async fn list_candidates(
        &self,
        job_id: Uuid,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateDetail>, AppError> {
        let candidates = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT c.*
            FROM candidates c
            LEFT JOIN match_analyses a ON a.candidate_id = c.id
            WHERE c.job_id = $1
              AND ($2::text IS NULL OR c.bucket = $2)
              AND ($3::float8 IS NULL OR a.match_percentage >= $3)
            ORDER BY a.match_percentage DESC NULLS LAST, c.uploaded_at ASC, c.id
            "#,
        )
        .bind(job_id)
        .bind(filter.bucket.map(|b| b.as_str()))
        .bind(filter.min_match)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(candidates).await
    }

    async fn candidates_for_job(&self, job_id: Uuid) -> Result<Vec<CandidateDetail>, AppError> {
        let candidates = sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates WHERE job_id = $1 ORDER BY uploaded_at ASC, id",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(candidates).await
    }

    async fn record_analysis(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
        verdict: &MatchVerdict,
    ) -> Result<AnalysisRow, AppError> {
        let mut tx = self.pool.begin().await?;
        Self::set_bucket(&mut tx, candidate_id, bucket).await?;

        let analysis = sqlx::query_as::<_, AnalysisRow>(
            r#"
            INSERT INTO match_analyses
                (candidate_id, match_percentage, matched_skills, missing_skills, bonus_skills, reasoning)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (candidate_id) DO UPDATE
            SET match_percentage = EXCLUDED.match_percentage,
                matched_skills = EXCLUDED.matched_skills,
                missing_skills = EXCLUDED.missing_skills,
                bonus_skills = EXCLUDED.bonus_skills,
                reasoning = EXCLUDED.reasoning,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(verdict.match_percentage)
        .bind(&verdict.matched_skills[..])
        .bind(&verdict.missing_skills[..])
        .bind(&verdict.bonus_skills[..])
        .bind(&verdict.reasoning)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(analysis)
    }

    async fn rescore_candidate(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
        verdict: &MatchVerdict,
    ) -> Result<AnalysisRow, AppError> {
        let mut tx = self.pool.begin().await?;
        Self::set_bucket(&mut tx, candidate_id, bucket).await?;

        // Dropping `tx` on the error path rolls the bucket change back.
        let analysis = sqlx::query_as::<_, AnalysisRow>(
            r#"
            UPDATE match_analyses
            SET match_percentage = $2,
                matched_skills = $3,
                missing_skills = $4,
                bonus_skills = $5,
                reasoning = $6,
                updated_at = now()
            WHERE candidate_id = $1
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(verdict.match_percentage)
        .bind(&verdict.matched_skills[..])
        .bind(&verdict.missing_skills[..])
        .bind(&verdict.bonus_skills[..])
        .bind(&verdict.reasoning)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::AnalysisRecordMissing(candidate_id))?;

        tx.commit().await?;
        Ok(analysis)
    }

    async fn update_bucket(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
    ) -> Result<CandidateRow, AppError> {
        let mut tx = self.pool.begin().await?;
        let row = Self::set_bucket(&mut tx, candidate_id, bucket).await?;
        tx.commit().await?;

        info!("Bucket for candidate {candidate_id} manually set to {bucket}");
        Ok(row)
    }

    async fn screening_status(&self, candidate_id: Uuid) -> Result<ScreeningStatusRow, AppError> {
        self.ensure_candidate(candidate_id).await?;

        let mut tx = self.pool.begin().await?;
        Self::ensure_screening_row(&mut tx, candidate_id).await?;
        let row = sqlx::query_as::<_, ScreeningStatusRow>(
            "SELECT * FROM screening_statuses WHERE candidate_id = $1",
        )
        .bind(candidate_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn mark_screening_sent(
        &self,
        candidate_id: Uuid,
        form_link: &str,
    ) -> Result<ScreeningStatusRow, AppError> {
        self.ensure_candidate(candidate_id).await?;

        let mut tx = self.pool.begin().await?;
        Self::ensure_screening_row(&mut tx, candidate_id).await?;
        let row = sqlx::query_as::<_, ScreeningStatusRow>(
            r#"
            UPDATE screening_statuses
            SET status = $2, form_link = $3, sent_at = now()
            WHERE candidate_id = $1
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(ScreeningState::Sent.as_str())
        .bind(form_link)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn update_screening(
        &self,
        candidate_id: Uuid,
        update: ScreeningUpdate,
    ) -> Result<ScreeningStatusRow, AppError> {
        self.ensure_candidate(candidate_id).await?;

        let mut tx = self.pool.begin().await?;
        Self::ensure_screening_row(&mut tx, candidate_id).await?;
        let row = sqlx::query_as::<_, ScreeningStatusRow>(
            r#"
            UPDATE screening_statuses
            SET status = $2,
                form_link = COALESCE($3, form_link),
                sent_at = CASE WHEN $2 = 'sent' AND sent_at IS NULL THEN now() ELSE sent_at END,
                response_received_at = CASE
                    WHEN $2 = 'response_received' THEN now()
                    ELSE response_received_at
                END
            WHERE candidate_id = $1
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(update.status.as_str())
        .bind(update.form_link.as_deref())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }
}
