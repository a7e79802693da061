use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
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

#[derive(Default)]
struct Tables {
    jobs: HashMap<Uuid, JobRow>,
    candidates: HashMap<Uuid, CandidateRow>,
    /// Candidate ids in upload order.
    upload_order: Vec<Uuid>,
    analyses: HashMap<Uuid, AnalysisRow>,
    screening: HashMap<Uuid, ScreeningStatusRow>,
}

impl Tables {
    fn detail(&self, candidate: &CandidateRow) -> CandidateDetail {
        CandidateDetail {
            candidate: candidate.clone(),
            analysis: self.analyses.get(&candidate.id).cloned(),
            screening: self.screening.get(&candidate.id).cloned(),
        }
    }

    fn job_candidates(&self, job_id: Uuid) -> Vec<CandidateDetail> {
        self.upload_order
            .iter()
            .filter_map(|id| self.candidates.get(id))
            .filter(|c| c.job_id == job_id)
            .map(|c| self.detail(c))
            .collect()
    }

    fn candidate_mut(&mut self, candidate_id: Uuid) -> Result<&mut CandidateRow, AppError> {
        self.candidates
            .get_mut(&candidate_id)
            .ok_or(AppError::CandidateNotFound(candidate_id))
    }

    fn screening_entry(&mut self, candidate_id: Uuid) -> Result<&mut ScreeningStatusRow, AppError> {
        if !self.candidates.contains_key(&candidate_id) {
            return Err(AppError::CandidateNotFound(candidate_id));
        }
        Ok(self
            .screening
            .entry(candidate_id)
            .or_insert_with(|| ScreeningStatusRow::not_sent(candidate_id)))
    }
}

/// In-process store used when no database is configured, and by tests.
/// Every operation holds the table lock for its whole duration, so multi-row
/// writes are atomic with respect to readers.
#[derive(Default)]
pub struct MemoryCandidateStore {
    tables: RwLock<Tables>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryCandidateStore {
    /// Drops a candidate's screening row, as for candidates stored before
    /// screening statuses existed.
    pub async fn forget_screening(&self, candidate_id: Uuid) {
        self.tables.write().await.screening.remove(&candidate_id);
    }
}

fn analysis_from(candidate_id: Uuid, verdict: &MatchVerdict, previous: Option<&AnalysisRow>) -> AnalysisRow {
    let now = Utc::now();
    AnalysisRow {
        candidate_id,
        match_percentage: verdict.match_percentage,
        matched_skills: verdict.matched_skills.clone(),
        missing_skills: verdict.missing_skills.clone(),
        bonus_skills: verdict.bonus_skills.clone(),
        reasoning: verdict.reasoning.clone(),
        created_at: previous.map(|p| p.created_at).unwrap_or(now),
        updated_at: now,
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn create_job(&self, job: NewJob) -> Result<JobRow, AppError> {
        let now = Utc::now();
        let row = JobRow {
            id: Uuid::new_v4(),
            title: job.title,
            description: job.description,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.jobs.insert(row.id, row.clone());
        info!("Created job {} ({})", row.id, row.title);
        Ok(row)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<JobRow, AppError> {
        self.tables
            .read()
            .await
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(AppError::JobNotFound(job_id))
    }

    async fn list_jobs(&self) -> Result<Vec<JobRow>, AppError> {
        let mut jobs: Vec<JobRow> = self.tables.read().await.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<JobRow, AppError> {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(&job_id)
            .ok_or(AppError::JobNotFound(job_id))?;

        if let Some(title) = update.title {
            job.title = title;
        }
        if let Some(description) = update.description {
            job.description = description;
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.jobs.remove(&job_id).is_none() {
            return Err(AppError::JobNotFound(job_id));
        }

        let owned: Vec<Uuid> = tables
            .candidates
            .values()
            .filter(|c| c.job_id == job_id)
            .map(|c| c.id)
            .collect();
        for id in &owned {
            tables.candidates.remove(id);
            tables.analyses.remove(id);
            tables.screening.remove(id);
        }
        tables.upload_order.retain(|id| !owned.contains(id));

        info!("Deleted job {job_id} and {} candidates", owned.len());
        Ok(())
    }

    async fn job_dashboard(&self, job_id: Uuid) -> Result<JobDashboard, AppError> {
        let tables = self.tables.read().await;
        if !tables.jobs.contains_key(&job_id) {
            return Err(AppError::JobNotFound(job_id));
        }

        let candidates = tables.job_candidates(job_id);
        let count = |bucket: Bucket| {
            candidates
                .iter()
                .filter(|c| c.candidate.bucket == bucket)
                .count() as i64
        };
        let scores: Vec<f64> = candidates.iter().filter_map(|c| c.match_percentage()).collect();
        let average_match_percentage =
            (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64);
        let pending_screening_responses = candidates
            .iter()
            .filter(|c| {
                c.screening
                    .as_ref()
                    .is_some_and(|s| s.status == ScreeningState::Sent)
            })
            .count() as i64;

        Ok(JobDashboard {
            job_id,
            total_candidates: candidates.len() as i64,
            strong_fit_count: count(Bucket::StrongFit),
            potential_count: count(Bucket::Potential),
            reject_count: count(Bucket::Reject),
            average_match_percentage,
            pending_screening_responses,
        })
    }

    async fn create_candidate(&self, candidate: NewCandidate) -> Result<CandidateRow, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.jobs.contains_key(&candidate.job_id) {
            return Err(AppError::JobNotFound(candidate.job_id));
        }

        let row = CandidateRow {
            id: Uuid::new_v4(),
            job_id: candidate.job_id,
            filename: candidate.filename,
            extracted_text: candidate.extracted_text,
            name: candidate.name,
            email: candidate.email,
            phone: candidate.phone,
            bucket: Bucket::Reject,
            uploaded_at: Utc::now(),
        };
        tables.candidates.insert(row.id, row.clone());
        tables.upload_order.push(row.id);
        tables
            .screening
            .insert(row.id, ScreeningStatusRow::not_sent(row.id));

        info!("Stored candidate {} for job {}", row.id, row.job_id);
        Ok(row)
    }

    async fn get_candidate(&self, candidate_id: Uuid) -> Result<CandidateDetail, AppError> {
        let tables = self.tables.read().await;
        tables
            .candidates
            .get(&candidate_id)
            .map(|c| tables.detail(c))
            .ok_or(AppError::CandidateNotFound(candidate_id))
    }

    async fn list_candidates(
        &self,
        job_id: Uuid,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateDetail>, AppError> {
        let mut listed: Vec<CandidateDetail> = self
            .tables
            .read()
            .await
            .job_candidates(job_id)
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();

        // Stable sort keeps upload order among equal scores.
        listed.sort_by(|a, b| match (a.match_percentage(), b.match_percentage()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(listed)
    }

    async fn candidates_for_job(&self, job_id: Uuid) -> Result<Vec<CandidateDetail>, AppError> {
        Ok(self.tables.read().await.job_candidates(job_id))
    }

    async fn record_analysis(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
        verdict: &MatchVerdict,
    ) -> Result<AnalysisRow, AppError> {
        let mut tables = self.tables.write().await;
        tables.candidate_mut(candidate_id)?.bucket = bucket;

        let analysis = analysis_from(candidate_id, verdict, tables.analyses.get(&candidate_id));
        tables.analyses.insert(candidate_id, analysis.clone());
        Ok(analysis)
    }

    async fn rescore_candidate(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
        verdict: &MatchVerdict,
    ) -> Result<AnalysisRow, AppError> {
        let mut tables = self.tables.write().await;
        tables.candidate_mut(candidate_id)?;
        let previous = tables
            .analyses
            .get(&candidate_id)
            .ok_or(AppError::AnalysisRecordMissing(candidate_id))?;

        let analysis = analysis_from(candidate_id, verdict, Some(previous));
        tables.analyses.insert(candidate_id, analysis.clone());
        tables.candidate_mut(candidate_id)?.bucket = bucket;
        Ok(analysis)
    }

    async fn update_bucket(
        &self,
        candidate_id: Uuid,
        bucket: Bucket,
    ) -> Result<CandidateRow, AppError> {
        let mut tables = self.tables.write().await;
        let candidate = tables.candidate_mut(candidate_id)?;
        candidate.bucket = bucket;
        info!("Bucket for candidate {candidate_id} manually set to {bucket}");
        Ok(candidate.clone())
    }

    async fn screening_status(&self, candidate_id: Uuid) -> Result<ScreeningStatusRow, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.screening_entry(candidate_id)?.clone())
    }

    async fn mark_screening_sent(
        &self,
        candidate_id: Uuid,
        form_link: &str,
    ) -> Result<ScreeningStatusRow, AppError> {
        let mut tables = self.tables.write().await;
        let status = tables.screening_entry(candidate_id)?;
        status.status = ScreeningState::Sent;
        status.form_link = Some(form_link.to_string());
        status.sent_at = Some(Utc::now());
        Ok(status.clone())
    }

    async fn update_screening(
        &self,
        candidate_id: Uuid,
        update: ScreeningUpdate,
    ) -> Result<ScreeningStatusRow, AppError> {
        let mut tables = self.tables.write().await;
        let status = tables.screening_entry(candidate_id)?;
        let now = Utc::now();

        status.status = update.status;
        if let Some(link) = update.form_link {
            status.form_link = Some(link);
        }
        match update.status {
            ScreeningState::Sent if status.sent_at.is_none() => status.sent_at = Some(now),
            ScreeningState::ResponseReceived => status.response_received_at = Some(now),
            _ => {}
        }
        Ok(status.clone())
    }
}
