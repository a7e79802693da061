use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Could not extract text from {0}")]
    ExtractionFailed(String),

    #[error("Match scorer unavailable: {0}")]
    ScorerUnavailable(String),

    #[error("Match scorer returned no usable verdict: {0}")]
    ScorerMalformedResponse(String),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Candidate {0} not found")]
    CandidateNotFound(Uuid),

    #[error("Candidate {0} has no analysis record to update")]
    AnalysisRecordMissing(Uuid),

    #[error(
        "Re-evaluation aborted at candidate {candidate_id} after {succeeded} candidate(s) were rescored: {reason}"
    )]
    ReevaluationAborted {
        candidate_id: Uuid,
        succeeded: usize,
        reason: String,
    },

    #[error("Email transport failed: {0}")]
    EmailTransportFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::ExtractionFailed(_) => {
                (StatusCode::BAD_REQUEST, "EXTRACTION_FAILED", self.to_string())
            }
            AppError::ScorerUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SCORER_UNAVAILABLE",
                self.to_string(),
            ),
            AppError::ScorerMalformedResponse(msg) => {
                tracing::warn!("Scorer failure surfaced to caller: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "SCORER_MALFORMED_RESPONSE",
                    self.to_string(),
                )
            }
            AppError::JobNotFound(_) => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND", self.to_string()),
            AppError::CandidateNotFound(_) => (
                StatusCode::NOT_FOUND,
                "CANDIDATE_NOT_FOUND",
                self.to_string(),
            ),
            AppError::AnalysisRecordMissing(_) => (
                StatusCode::CONFLICT,
                "ANALYSIS_RECORD_MISSING",
                self.to_string(),
            ),
            AppError::ReevaluationAborted { .. } => (
                StatusCode::BAD_GATEWAY,
                "REEVALUATION_ABORTED",
                self.to_string(),
            ),
            AppError::EmailTransportFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "EMAIL_TRANSPORT_FAILED",
                self.to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_errors_map_to_404() {
        let resp = AppError::JobNotFound(Uuid::new_v4()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::CandidateNotFound(Uuid::new_v4()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_extraction_failure_is_client_error() {
        let resp = AppError::ExtractionFailed("resume.pdf".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_reevaluation_abort_message_names_candidate() {
        let candidate_id = Uuid::new_v4();
        let err = AppError::ReevaluationAborted {
            candidate_id,
            succeeded: 1,
            reason: "no verdict".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains(&candidate_id.to_string()));
        assert!(msg.contains("after 1 candidate"));
    }
}
