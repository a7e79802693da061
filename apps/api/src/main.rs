mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod scoring;
mod screening;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::TextExtractor;
use crate::routes::build_router;
use crate::scoring::ScorerHandle;
use crate::screening::LogEmailTransport;
use crate::state::AppState;
use crate::store::{CandidateStore, MemoryCandidateStore, PgCandidateStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HireSense API v{}", env!("CARGO_PKG_VERSION"));

    // Candidate store: PostgreSQL when configured, in-memory otherwise
    let store: Arc<dyn CandidateStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            Arc::new(PgCandidateStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory candidate store");
            Arc::new(MemoryCandidateStore::new())
        }
    };

    let scorer = ScorerHandle::from_config(&config)?;
    if scorer.is_available() {
        info!(
            "Match scorer ready (model: {}, timeout {}s)",
            llm_client::MODEL,
            config.oracle_timeout_secs
        );
    } else {
        warn!("ANTHROPIC_API_KEY not set, uploads will be stored without a match analysis");
    }

    let state = AppState {
        store,
        scorer,
        extractor: TextExtractor::pdf(),
        mailer: Arc::new(LogEmailTransport),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
