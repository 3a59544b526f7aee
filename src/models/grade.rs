//! Recall grades a learner reports after reviewing a word or word list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest quality score that counts as a successful recall.
pub const PASS_THRESHOLD: u8 = 3;

/// Self-reported recall quality, ordered weakest to strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 3] = [Grade::Hard, Grade::Good, Grade::Easy];

    /// SM-2 quality score on the 0-5 scale.
    pub fn quality(self) -> u8 {
        match self {
            Grade::Hard => 1,
            Grade::Good => 3,
            Grade::Easy => 5,
        }
    }

    pub fn is_pass(self) -> bool {
        self.quality() >= PASS_THRESHOLD
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grade '{0}', expected hard, good or easy")]
pub struct ParseGradeError(pub String);

impl FromStr for Grade {
    type Err = ParseGradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(Grade::Hard),
            "good" => Ok(Grade::Good),
            "easy" => Ok(Grade::Easy),
            _ => Err(ParseGradeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grades_are_ordered() {
        assert!(Grade::Hard < Grade::Good);
        assert!(Grade::Good < Grade::Easy);
        assert!(Grade::Hard.quality() < Grade::Good.quality());
        assert!(Grade::Good.quality() < Grade::Easy.quality());
    }

    #[test]
    fn test_only_hard_fails() {
        assert!(!Grade::Hard.is_pass());
        assert!(Grade::Good.is_pass());
        assert!(Grade::Easy.is_pass());
    }

    #[test]
    fn test_parse_and_display() {
        for grade in Grade::ALL {
            assert_eq!(grade.to_string().parse::<Grade>(), Ok(grade));
        }
        assert_eq!(" EASY ".parse::<Grade>(), Ok(Grade::Easy));
        assert!("again".parse::<Grade>().is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&Grade::Good).unwrap();
        assert_eq!(json, "\"good\"");
        let back: Grade = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(back, Grade::Hard);
    }
}
