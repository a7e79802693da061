//! Screening outreach: sends the screening form to a candidate and records
//! the delivery on the candidate's screening status.
//!
//! Delivery goes through the `EmailTransport` trait. The default
//! `LogEmailTransport` only logs the message; a real SMTP or API-backed
//! transport slots in behind the same trait.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{ScreeningState, ScreeningStatusRow, ScreeningUpdate};
use crate::store::CandidateStore;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_screening_form(
        &self,
        recipient: &str,
        job_title: &str,
        form_link: &str,
    ) -> Result<(), TransportError>;
}

/// Transport that records the outgoing email in the log and always succeeds.
pub struct LogEmailTransport;

#[async_trait]
impl EmailTransport for LogEmailTransport {
    async fn send_screening_form(
        &self,
        recipient: &str,
        job_title: &str,
        form_link: &str,
    ) -> Result<(), TransportError> {
        info!(recipient, job_title, form_link, "Screening form email dispatched");
        Ok(())
    }
}

/// Body of a send request. Both fields fall back to stored or configured values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendScreeningRequest {
    pub candidate_email: Option<String>,
    pub form_link: Option<String>,
}

/// Sends the screening form and marks the status `sent`.
///
/// The status is only touched after the transport reports success.
pub async fn send_screening_form(
    store: &dyn CandidateStore,
    mailer: &dyn EmailTransport,
    default_form_link: &str,
    candidate_id: Uuid,
    request: SendScreeningRequest,
) -> Result<ScreeningStatusRow, AppError> {
    let detail = store.get_candidate(candidate_id).await?;
    let current = store.screening_status(candidate_id).await?;
    if current.status != ScreeningState::NotSent {
        info!(
            "Re-sending screening form to candidate {candidate_id} (status {})",
            current.status
        );
    }
    let job = store.get_job(detail.candidate.job_id).await?;

    let recipient = request
        .candidate_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .or(detail.candidate.email)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Candidate {candidate_id} has no email address; supply candidate_email"
            ))
        })?;
    let form_link = request
        .form_link
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| default_form_link.to_string());

    if let Err(e) = mailer
        .send_screening_form(&recipient, &job.title, &form_link)
        .await
    {
        warn!("Screening email to candidate {candidate_id} failed: {e}");
        return Err(AppError::EmailTransportFailed(e.to_string()));
    }

    store.mark_screening_sent(candidate_id, &form_link).await
}

/// Manual status change, e.g. recording that the candidate responded.
pub async fn update_screening_status(
    store: &dyn CandidateStore,
    candidate_id: Uuid,
    update: ScreeningUpdate,
) -> Result<ScreeningStatusRow, AppError> {
    info!("Screening status for candidate {candidate_id} -> {}", update.status);
    store.update_screening(candidate_id, update).await
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Transport that records every send and can be told to fail.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub fail: bool,
        pub sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn send_screening_form(
            &self,
            recipient: &str,
            job_title: &str,
            form_link: &str,
        ) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError("mailbox unavailable".to_string()));
            }
            self.sent.lock().unwrap().push((
                recipient.to_string(),
                job_title.to_string(),
                form_link.to_string(),
            ));
            Ok(())
        }
    }
}
