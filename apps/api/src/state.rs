use std::sync::Arc;

use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::scoring::ScorerHandle;
use crate::screening::EmailTransport;
use crate::store::CandidateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres-backed when `DATABASE_URL` is set, in-memory otherwise.
    pub store: Arc<dyn CandidateStore>,
    pub scorer: ScorerHandle,
    pub extractor: TextExtractor,
    pub mailer: Arc<dyn EmailTransport>,
    pub config: Config,
}
