use anyhow::{Context, Result};

const DEFAULT_SCREENING_FORM_LINK: &str = "https://forms.office.com/YourFormLinkHere";

/// Application configuration loaded from environment variables.
///
/// `DATABASE_URL` and `ANTHROPIC_API_KEY` are optional: without a database the
/// service runs on the in-memory store, and without an API key the match
/// scorer is reported as unavailable instead of failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub screening_form_link: String,
    pub oracle_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            screening_form_link: optional_env("SCREENING_FORM_LINK")
                .unwrap_or_else(|| DEFAULT_SCREENING_FORM_LINK.to_string()),
            oracle_timeout_secs: std::env::var("ORACLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("ORACLE_TIMEOUT_SECS must be a whole number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Treats unset and blank variables the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
impl Config {
    /// Configuration used by router and pipeline tests.
    pub fn for_tests() -> Self {
        Config {
            database_url: None,
            anthropic_api_key: None,
            screening_form_link: DEFAULT_SCREENING_FORM_LINK.to_string(),
            oracle_timeout_secs: 5,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
