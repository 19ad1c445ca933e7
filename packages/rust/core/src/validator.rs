//! Garbage rejection for generated summaries.
//!
//! The generation service sometimes answers with an empty string, a refusal,
//! or a placeholder such as `None`. Every generated string passes through a
//! [`SummaryGate`] before it can reach a persisted summary.

use docdigest_shared::ValidatorConfig;
use serde::Serialize;

/// Why a candidate summary was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Empty or whitespace-only.
    Empty,
    /// Matched a known placeholder reply.
    Sentinel(String),
    /// Shorter than the minimum length.
    TooShort { chars: usize, min: usize },
    /// Rejected by a custom gate.
    Other(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty output"),
            Self::Sentinel(s) => write!(f, "placeholder reply '{s}'"),
            Self::TooShort { chars, min } => {
                write!(f, "too short ({chars} chars, minimum {min})")
            }
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// A predicate deciding whether a generated string is usable.
pub trait SummaryGate: Send + Sync {
    fn check(&self, candidate: &str) -> Result<(), Rejection>;

    fn is_valid(&self, candidate: &str) -> bool {
        self.check(candidate).is_ok()
    }
}

/// Sentinel-list + minimum-length validator.
#[derive(Debug, Clone)]
pub struct SummaryValidator {
    sentinels: Vec<String>,
    min_chars: usize,
}

impl SummaryValidator {
    pub fn new<I, S>(sentinels: I, min_chars: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            sentinels: sentinels
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
            min_chars,
        }
    }

    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self::new(&config.sentinels, config.min_chars)
    }
}

impl Default for SummaryValidator {
    fn default() -> Self {
        Self::from_config(&ValidatorConfig::default())
    }
}

impl SummaryGate for SummaryValidator {
    fn check(&self, candidate: &str) -> Result<(), Rejection> {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(Rejection::Empty);
        }

        let lowered = trimmed.to_lowercase();
        if self.sentinels.iter().any(|s| *s == lowered) {
            return Err(Rejection::Sentinel(lowered));
        }

        let chars = trimmed.chars().count();
        if chars < self.min_chars {
            return Err(Rejection::TooShort {
                chars,
                min: self.min_chars,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace() {
        let v = SummaryValidator::default();
        assert_eq!(v.check(""), Err(Rejection::Empty));
        assert_eq!(v.check("   "), Err(Rejection::Empty));
        assert_eq!(v.check("\n\t"), Err(Rejection::Empty));
    }

    #[test]
    fn rejects_sentinels_case_insensitively() {
        let v = SummaryValidator::default();
        assert_eq!(v.check("none"), Err(Rejection::Sentinel("none".into())));
        assert_eq!(v.check("NULL"), Err(Rejection::Sentinel("null".into())));
        assert!(!v.is_valid("No Summary Generated"));
        assert!(!v.is_valid("  [no summary generated]  "));
        assert!(!v.is_valid("No content was found"));
    }

    #[test]
    fn rejects_short_output() {
        let v = SummaryValidator::default();
        assert_eq!(v.check("ab"), Err(Rejection::TooShort { chars: 2, min: 20 }));
        // 19 characters after trimming.
        assert!(!v.is_valid("  abcdefghijklmnopqrs  "));
    }

    #[test]
    fn accepts_ordinary_text() {
        let v = SummaryValidator::default();
        assert!(v.is_valid("abcdefghijklmnopqrst"));
        assert!(v.is_valid("\\section{Thermodynamics} Energy is conserved."));
        // A sentinel embedded in longer text is fine.
        assert!(v.is_valid("None of the experiments replicated the effect."));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let v = SummaryValidator::new(Vec::<String>::new(), 5);
        assert!(v.is_valid("ééééé"));
        assert!(!v.is_valid("éééé"));
    }

    #[test]
    fn configured_sentinels_are_normalized() {
        let v = SummaryValidator::new(["  I Cannot Help  "], 0);
        assert!(!v.is_valid("i cannot help"));
        assert!(v.is_valid("none"));
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(Rejection::Empty.to_string(), "empty output");
        assert_eq!(
            Rejection::TooShort { chars: 2, min: 20 }.to_string(),
            "too short (2 chars, minimum 20)"
        );
    }
}
