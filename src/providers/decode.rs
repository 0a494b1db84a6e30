//! Schema-validated decoding of structured generator output.
//!
//! Raw `serde_json::Value`s from [`TextGenerator::generate_structured`]
//! (see [`super::TextGenerator`]) are turned into typed values here, at the
//! provider boundary. A malformed envelope is a single
//! [`ProviderError::Decode`]; individually malformed items inside a question
//! batch are dropped and counted instead, so one bad question never sinks a
//! subtopic.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::{ProviderError, StructuredSchema};
use crate::question::{OptionKey, Question};

const PROVIDER: &str = "text_generator";

/// Schema for a bounded list of subtopic strings.
pub fn subtopic_list_schema(min: usize, max: usize) -> StructuredSchema {
    StructuredSchema::new(
        "subtopic_list",
        json!({
            "type": "array",
            "items": { "type": "string", "minLength": 1 },
            "minItems": min,
            "maxItems": max,
        }),
    )
}

/// Schema for a batch of multiple-choice questions.
pub fn question_batch_schema(count: usize) -> StructuredSchema {
    StructuredSchema::new(
        "question_batch",
        json!({
            "type": "array",
            "minItems": count,
            "maxItems": count,
            "items": {
                "type": "object",
                "required": ["text", "options", "correct", "explanation"],
                "properties": {
                    "text": { "type": "string", "minLength": 10 },
                    "options": {
                        "type": "object",
                        "required": ["A", "B", "C", "D"],
                        "properties": {
                            "A": { "type": "string" },
                            "B": { "type": "string" },
                            "C": { "type": "string" },
                            "D": { "type": "string" }
                        }
                    },
                    "correct": { "enum": ["A", "B", "C", "D"] },
                    "explanation": { "type": "string", "minLength": 10 }
                }
            }
        }),
    )
}

/// Schema for the supervisor's constrained routing decision.
pub fn routing_decision_schema() -> StructuredSchema {
    StructuredSchema::new(
        "routing_decision",
        json!({
            "type": "object",
            "required": ["decision"],
            "properties": {
                "decision": { "enum": ["expand_topics", "generate_questions", "finish"] }
            }
        }),
    )
}

/// Decode and validate a subtopic list: `min..=max` distinct non-empty
/// strings. Duplicates are collapsed (first occurrence wins) before the
/// count check.
pub fn decode_subtopics(value: &Value, min: usize, max: usize) -> Result<Vec<String>, ProviderError> {
    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::decode(PROVIDER, "expected a JSON array of subtopics"))?;

    let mut subtopics: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let s = item
            .as_str()
            .ok_or_else(|| ProviderError::decode(PROVIDER, "subtopic entry is not a string"))?
            .trim();
        if s.is_empty() {
            return Err(ProviderError::decode(PROVIDER, "subtopic entry is empty"));
        }
        if !subtopics.iter().any(|existing| existing == s) {
            subtopics.push(s.to_string());
        }
    }

    if subtopics.len() < min || subtopics.len() > max {
        return Err(ProviderError::decode(
            PROVIDER,
            format!(
                "expected {min}..={max} distinct subtopics, got {}",
                subtopics.len()
            ),
        ));
    }
    Ok(subtopics)
}

/// Result of decoding one question batch.
#[derive(Clone, Debug, Default)]
pub struct QuestionBatch {
    pub questions: Vec<Question>,
    /// Structurally invalid entries dropped from the batch.
    pub dropped: usize,
}

/// Decode a question batch for one subtopic.
///
/// A non-array envelope is a decode error (the provider did not honor the
/// schema at all). Individual entries that fail structural validation are
/// dropped and counted; the caller decides whether an empty surviving batch
/// warrants a warning.
pub fn decode_question_batch(value: &Value, subtopic: &str) -> Result<QuestionBatch, ProviderError> {
    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::decode(PROVIDER, "expected a JSON array of questions"))?;

    let mut batch = QuestionBatch::default();
    for item in items {
        match decode_question(item, subtopic) {
            Some(q) => batch.questions.push(q),
            None => batch.dropped += 1,
        }
    }
    Ok(batch)
}

fn decode_question(item: &Value, subtopic: &str) -> Option<Question> {
    let text = item.get("text")?.as_str()?;
    let explanation = item.get("explanation")?.as_str()?;
    let correct = OptionKey::parse(item.get("correct")?.as_str()?)?;

    let raw_options = item.get("options")?.as_object()?;
    let mut options = BTreeMap::new();
    for (key, value) in raw_options {
        let key = OptionKey::parse(key)?;
        options.insert(key, value.as_str()?.to_string());
    }

    Question::new(text, options, correct, explanation, Some(subtopic.to_string())).ok()
}
