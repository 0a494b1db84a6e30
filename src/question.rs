use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum length for question text and explanations.
pub const MIN_TEXT_LEN: usize = 10;

/// One of the four answer option keys.
///
/// Serialized as `"A"`..`"D"`, which also makes it usable as a JSON map key.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    /// All keys, in display order.
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
            OptionKey::D => "D",
        }
    }

    /// Parse a key from its letter form, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(OptionKey::A),
            "B" | "b" => Some(OptionKey::B),
            "C" | "c" => Some(OptionKey::C),
            "D" | "d" => Some(OptionKey::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A multiple-choice quiz question.
///
/// Immutable once created: [`Question::new`] is the only way to construct
/// one and it enforces the structural invariants, so any `Question` held by
/// the workflow state is already valid.
///
/// # Invariants
///
/// - `options` has exactly the four keys A–D, each with non-empty text
/// - `correct` is one of those keys (guaranteed by the type)
/// - `text` and `explanation` are at least [`MIN_TEXT_LEN`] characters
///
/// # Examples
///
/// ```rust
/// use quizsmith::question::{OptionKey, Question};
/// use std::collections::BTreeMap;
///
/// let options = BTreeMap::from([
///     (OptionKey::A, "Chloroplast".to_string()),
///     (OptionKey::B, "Mitochondrion".to_string()),
///     (OptionKey::C, "Nucleus".to_string()),
///     (OptionKey::D, "Ribosome".to_string()),
/// ]);
/// let q = Question::new(
///     "Where do the light reactions of photosynthesis occur?",
///     options,
///     OptionKey::A,
///     "Light reactions take place in the thylakoid membranes of the chloroplast.",
///     Some("Light Reactions".to_string()),
/// )
/// .unwrap();
/// assert_eq!(q.correct, OptionKey::A);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: BTreeMap<OptionKey, String>,
    pub correct: OptionKey,
    pub explanation: String,
    /// The subtopic this question was generated for, when known.
    pub subtopic: Option<String>,
}

/// Structural validation failures for a candidate question.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("expected exactly 4 options, got {got}")]
    WrongOptionCount { got: usize },

    #[error("option {key} is missing or empty")]
    BadOption { key: OptionKey },

    #[error("question text too short ({len} < {MIN_TEXT_LEN} chars)")]
    TextTooShort { len: usize },

    #[error("explanation too short ({len} < {MIN_TEXT_LEN} chars)")]
    ExplanationTooShort { len: usize },
}

impl Question {
    /// Construct a validated question.
    pub fn new(
        text: impl Into<String>,
        options: BTreeMap<OptionKey, String>,
        correct: OptionKey,
        explanation: impl Into<String>,
        subtopic: Option<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        let explanation = explanation.into();

        if options.len() != 4 {
            return Err(QuestionError::WrongOptionCount { got: options.len() });
        }
        for key in OptionKey::ALL {
            match options.get(&key) {
                Some(v) if !v.trim().is_empty() => {}
                _ => return Err(QuestionError::BadOption { key }),
            }
        }
        if text.trim().chars().count() < MIN_TEXT_LEN {
            return Err(QuestionError::TextTooShort {
                len: text.trim().chars().count(),
            });
        }
        if explanation.trim().chars().count() < MIN_TEXT_LEN {
            return Err(QuestionError::ExplanationTooShort {
                len: explanation.trim().chars().count(),
            });
        }

        Ok(Self {
            text,
            options,
            correct,
            explanation,
            subtopic,
        })
    }
}
