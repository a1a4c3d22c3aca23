use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("unknown difficulty label: {0:?}")]
    UnknownLabel(String),
}

//
// ─── DIFFICULTY ───────────────────────────────────────────────────────────────
//

/// Self-assessed difficulty a learner gives a question after seeing the answer.
///
/// The rating decides which bucket the question lives in for the rest of the
/// session:
/// - `Easy`: answered comfortably, only resurfaces once nothing harder is left
/// - `Medium`: resurfaces at medium milestones and after the hard bucket drains
/// - `Hard`: resurfaces first, both at hard milestones and in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Lowercase label used by the supply service and storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyError;

    /// Labels are matched case-insensitively and ignore surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(DifficultyError::UnknownLabel(s.to_owned())),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
