//! Match Scoring: pluggable, trait-based scorer that measures a resume against a job description.
//!
//! Default: `LlmMatchScorer` (oracle-backed, bounded retry, strict verdict schema).
//!
//! `AppState` carries a `ScorerHandle`: `Available` when an API key is configured,
//! `Unavailable` otherwise. Callers check the handle instead of assuming a scorer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::{LlmClient, LlmError, Oracle};

pub mod bucket;
pub mod prompts;
pub mod retry;
pub mod verdict;

pub use bucket::{classify, Bucket};
pub use verdict::MatchVerdict;

use prompts::{build_match_prompt, MATCH_SYSTEM};
use retry::retry_bounded;
use verdict::parse_verdict;

/// Oracle calls per scoring request, first try included.
pub const MAX_SCORING_ATTEMPTS: u32 = 2;

/// Why a scoring request produced no verdict.
#[derive(Debug, Clone, Error)]
pub enum ScoreError {
    #[error("oracle call failed: {0}")]
    OracleFailed(String),

    #[error("oracle response was malformed: {0}")]
    MalformedResponse(String),
}

impl From<ScoreError> for AppError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::OracleFailed(msg) => AppError::ScorerUnavailable(msg),
            ScoreError::MalformedResponse(msg) => AppError::ScorerMalformedResponse(msg),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The match scorer trait. Implementations never panic or raise past this
/// boundary: every failure is a `ScoreError`, i.e. "no verdict".
#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn score(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<MatchVerdict, ScoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmMatchScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmMatchScorer {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    max_attempts: u32,
}

impl LlmMatchScorer {
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self {
            oracle,
            timeout,
            max_attempts: MAX_SCORING_ATTEMPTS,
        }
    }

    async fn attempt(&self, prompt: &str, attempt: u32) -> Result<MatchVerdict, ScoreError> {
        debug!("Scoring attempt {attempt}");

        let raw = tokio::time::timeout(self.timeout, self.oracle.complete(prompt, MATCH_SYSTEM))
            .await
            .map_err(|_| ScoreError::OracleFailed(LlmError::Timeout(self.timeout).to_string()))?
            .map_err(|e| ScoreError::OracleFailed(e.to_string()))?;

        parse_verdict(&raw).map_err(|e| ScoreError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl MatchScorer for LlmMatchScorer {
    async fn score(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<MatchVerdict, ScoreError> {
        let prompt = build_match_prompt(resume_text, job_description);
        let prompt = prompt.as_str();

        let verdict = retry_bounded(self.max_attempts, move |n| self.attempt(prompt, n)).await?;

        info!(
            "Match verdict: {:.1}% ({} matched, {} missing)",
            verdict.match_percentage,
            verdict.matched_skills.len(),
            verdict.missing_skills.len()
        );
        Ok(verdict)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer capability
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub enum ScorerHandle {
    Available(Arc<dyn MatchScorer>),
    #[default]
    Unavailable,
}

impl ScorerHandle {
    /// Builds the oracle-backed scorer when an API key is configured.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let Some(api_key) = config.anthropic_api_key.clone() else {
            return Ok(ScorerHandle::Unavailable);
        };
        let timeout = Duration::from_secs(config.oracle_timeout_secs);
        let client = LlmClient::new(api_key, timeout)?;
        Ok(ScorerHandle::Available(Arc::new(LlmMatchScorer::new(
            Arc::new(client),
            timeout,
        ))))
    }

    pub fn scorer(&self) -> Option<&dyn MatchScorer> {
        match self {
            ScorerHandle::Available(scorer) => Some(scorer.as_ref()),
            ScorerHandle::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ScorerHandle::Available(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    //! Test doubles shared by the pipeline and route tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Oracle that replays canned responses in order.
    pub struct ScriptedOracle {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        pub calls: Mutex<u32>,
    }

    impl ScriptedOracle {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        pub fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    /// Scorer that returns a verdict chosen by the resume text, or fails when
    /// the text contains `FAIL`.
    pub struct KeyedScorer {
        pub percentages: Vec<(&'static str, f64)>,
    }

    #[async_trait]
    impl MatchScorer for KeyedScorer {
        async fn score(
            &self,
            resume_text: &str,
            _job_description: &str,
        ) -> Result<MatchVerdict, ScoreError> {
            if resume_text.contains("FAIL") {
                return Err(ScoreError::MalformedResponse("scripted failure".to_string()));
            }
            let pct = self
                .percentages
                .iter()
                .find(|(key, _)| resume_text.contains(key))
                .map(|(_, p)| *p)
                .unwrap_or(50.0);
            Ok(verdict(pct))
        }
    }

    pub fn verdict(match_percentage: f64) -> MatchVerdict {
        MatchVerdict {
            match_percentage,
            matched_skills: vec!["Rust".to_string()],
            missing_skills: vec![],
            bonus_skills: vec![],
            reasoning: format!("Scored at {match_percentage}"),
        }
    }

    pub fn verdict_json(match_percentage: f64) -> String {
        serde_json::to_string(&verdict(match_percentage)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn scorer(oracle: Arc<ScriptedOracle>) -> LlmMatchScorer {
        LlmMatchScorer::new(oracle, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_valid_first_response_uses_one_call() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(verdict_json(72.0))]));
        let verdict = scorer(oracle.clone()).score("resume", "job").await.unwrap();
        assert_eq!(verdict.match_percentage, 72.0);
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fenced_response_is_accepted() {
        let fenced = format!("```json\n{}\n```", verdict_json(81.0));
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(fenced)]));
        let verdict = scorer(oracle).score("resume", "job").await.unwrap();
        assert_eq!(verdict, testing::verdict(81.0));
    }

    #[tokio::test]
    async fn test_malformed_then_valid_retries_once() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok("not json".to_string()),
            Ok(verdict_json(64.0)),
        ]));
        let verdict = scorer(oracle.clone()).score("resume", "job").await.unwrap();
        assert_eq!(verdict.match_percentage, 64.0);
        assert_eq!(oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_reasoning_twice_yields_no_verdict() {
        let incomplete = r#"{"match_percentage": 70, "matched_skills": [], "missing_skills": [], "bonus_skills": []}"#;
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(incomplete.to_string()),
            Ok(incomplete.to_string()),
            Ok(verdict_json(99.0)),
        ]));
        let result = scorer(oracle.clone()).score("resume", "job").await;
        assert!(matches!(result, Err(ScoreError::MalformedResponse(_))));
        assert_eq!(oracle.call_count(), MAX_SCORING_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_oracle_errors_exhaust_attempts() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Err(LlmError::EmptyContent),
            Err(LlmError::Api {
                status: 529,
                message: "overloaded".to_string(),
            }),
        ]));
        let result = scorer(oracle).score("resume", "job").await;
        match result {
            Err(ScoreError::OracleFailed(msg)) => assert!(msg.contains("overloaded")),
            other => panic!("expected oracle failure, got {other:?}"),
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl Oracle for SlowOracle {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(verdict_json(90.0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_oracle_failure() {
        let scorer = LlmMatchScorer::new(Arc::new(SlowOracle), Duration::from_secs(1));
        let result = scorer.score("resume", "job").await;
        assert!(matches!(result, Err(ScoreError::OracleFailed(_))));
    }

    #[test]
    fn test_handle_unavailable_without_api_key() {
        let config = Config::for_tests();
        let handle = ScorerHandle::from_config(&config).unwrap();
        assert!(!handle.is_available());
        assert!(handle.scorer().is_none());
    }

    #[test]
    fn test_handle_available_with_api_key() {
        let mut config = Config::for_tests();
        config.anthropic_api_key = Some("sk-test".to_string());
        let handle = ScorerHandle::from_config(&config).unwrap();
        assert!(handle.is_available());
    }

    #[test]
    fn test_score_error_maps_to_app_error_kinds() {
        assert!(matches!(
            AppError::from(ScoreError::OracleFailed("x".into())),
            AppError::ScorerUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(ScoreError::MalformedResponse("x".into())),
            AppError::ScorerMalformedResponse(_)
        ));
    }
}
