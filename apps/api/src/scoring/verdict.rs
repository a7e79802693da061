//! Match verdict: the structured output of one successful scoring call,
//! plus the strict parser that turns raw oracle text into one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::extract_json_object;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchVerdict {
    pub match_percentage: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub bonus_skills: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("response is not a valid verdict: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("match_percentage {0} is outside 0..=100")]
    OutOfRange(f64),
}

/// Parses oracle output into a verdict.
///
/// Fences and surrounding prose are dropped, then the payload must carry every
/// field with the right type: a number for `match_percentage`, string arrays
/// for the three skill lists, and a string for `reasoning`. Skill lists are
/// de-duplicated keeping the oracle's order.
pub fn parse_verdict(raw: &str) -> Result<MatchVerdict, VerdictError> {
    let payload = extract_json_object(raw);
    let mut verdict: MatchVerdict = serde_json::from_str(payload)?;

    if !(0.0..=100.0).contains(&verdict.match_percentage) {
        return Err(VerdictError::OutOfRange(verdict.match_percentage));
    }

    dedup_in_order(&mut verdict.matched_skills);
    dedup_in_order(&mut verdict.missing_skills);
    dedup_in_order(&mut verdict.bonus_skills);
    Ok(verdict)
}

fn dedup_in_order(skills: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    skills.retain(|s| seen.insert(s.clone()));
}
