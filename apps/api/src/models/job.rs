use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

/// Width of the `jobs.title` column.
pub const MAX_TITLE_CHARS: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
}

impl NewJob {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_description(&self.description)
    }
}

/// Partial job update. Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl JobUpdate {
    /// Fields that are present must satisfy the same rules as on creation.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("Job title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Job title cannot exceed {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Per-job aggregate counters shown on the job dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDashboard {
    pub job_id: Uuid,
    pub total_candidates: i64,
    pub strong_fit_count: i64,
    pub potential_count: i64,
    pub reject_count: i64,
    /// Mean over scored candidates only; `None` when nobody has been scored.
    pub average_match_percentage: Option<f64>,
    /// Screening emails sent without a recorded response.
    pub pending_screening_responses: i64,
}
