use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while interpreting a review answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("malformed review outcome: {0:?} (expected \"correct\" or \"wrong\")")]
    InvalidOutcome(String),
}

/// What the learner answered for a single card.
///
/// The product only distinguishes two buttons ("I got it" / "I missed it"),
/// so unlike four-grade schedulers there is no hard/easy nuance here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Correct,
    Wrong,
}

impl ReviewOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewOutcome::Correct => "correct",
            ReviewOutcome::Wrong => "wrong",
        }
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, ReviewOutcome::Correct)
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewOutcome {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "correct" => Ok(Self::Correct),
            "wrong" => Ok(Self::Wrong),
            _ => Err(ReviewError::InvalidOutcome(s.to_owned())),
        }
    }
}
