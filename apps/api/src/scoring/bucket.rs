//! Bucket classification: maps a match percentage onto a coarse tier.
//!
//! Used identically at ingestion and during re-evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower bound (inclusive) of the `strong_fit` tier.
pub const STRONG_FIT_THRESHOLD: f64 = 80.0;
/// Lower bound (inclusive) of the `potential` tier.
pub const POTENTIAL_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    StrongFit,
    Potential,
    #[default]
    Reject,
}

#[derive(Debug, Error)]
#[error("unknown {kind} tag '{value}'")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::StrongFit => "strong_fit",
            Bucket::Potential => "potential",
            Bucket::Reject => "reject",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong_fit" => Ok(Bucket::StrongFit),
            "potential" => Ok(Bucket::Potential),
            "reject" => Ok(Bucket::Reject),
            other => Err(UnknownTag {
                kind: "bucket",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Bucket {
    type Error = UnknownTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// `≥ 80 → strong_fit`, `60..80 → potential`, anything lower → `reject`.
pub fn classify(match_percentage: f64) -> Bucket {
    if match_percentage >= STRONG_FIT_THRESHOLD {
        Bucket::StrongFit
    } else if match_percentage >= POTENTIAL_THRESHOLD {
        Bucket::Potential
    } else {
        Bucket::Reject
    }
}
