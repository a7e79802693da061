use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scoring::bucket::{Bucket, UnknownTag};

/// One uploaded resume, owned by a job.
/// `extracted_text` is immutable after creation and never sent back over the API.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub filename: String,
    #[serde(skip_serializing)]
    pub extracted_text: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub bucket: Bucket,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields captured at intake. Bucket starts at `reject` until a verdict lands.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub job_id: Uuid,
    pub filename: String,
    pub extracted_text: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The stored match verdict for a candidate. At most one per candidate.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AnalysisRow {
    pub candidate_id: Uuid,
    pub match_percentage: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub bonus_skills: Vec<String>,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningState {
    #[default]
    NotSent,
    Sent,
    ResponseReceived,
}

impl ScreeningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningState::NotSent => "not_sent",
            ScreeningState::Sent => "sent",
            ScreeningState::ResponseReceived => "response_received",
        }
    }
}

impl fmt::Display for ScreeningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreeningState {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_sent" => Ok(ScreeningState::NotSent),
            "sent" => Ok(ScreeningState::Sent),
            "response_received" => Ok(ScreeningState::ResponseReceived),
            other => Err(UnknownTag {
                kind: "screening status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ScreeningState {
    type Error = UnknownTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ScreeningStatusRow {
    pub candidate_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ScreeningState,
    pub form_link: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub response_received_at: Option<DateTime<Utc>>,
}

impl ScreeningStatusRow {
    pub fn not_sent(candidate_id: Uuid) -> Self {
        Self {
            candidate_id,
            status: ScreeningState::NotSent,
            form_link: None,
            sent_at: None,
            response_received_at: None,
        }
    }
}

/// Manual screening status change requested by a recruiter.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreeningUpdate {
    pub status: ScreeningState,
    pub form_link: Option<String>,
}

/// Candidate plus its derived records, as returned by list and detail queries.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateDetail {
    pub candidate: CandidateRow,
    pub analysis: Option<AnalysisRow>,
    pub screening: Option<ScreeningStatusRow>,
}

impl CandidateDetail {
    pub fn match_percentage(&self) -> Option<f64> {
        self.analysis.as_ref().map(|a| a.match_percentage)
    }
}

/// Optional narrowing for candidate listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateFilter {
    pub bucket: Option<Bucket>,
    /// Inclusive lower bound. Unscored candidates never satisfy it.
    pub min_match: Option<f64>,
}

impl CandidateFilter {
    pub fn matches(&self, detail: &CandidateDetail) -> bool {
        if let Some(bucket) = self.bucket {
            if detail.candidate.bucket != bucket {
                return false;
            }
        }
        match self.min_match {
            Some(min) => detail.match_percentage().is_some_and(|p| p >= min),
            None => true,
        }
    }
}
