//! Stub capability providers for deterministic workflow tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use quizsmith::providers::{Embedder, ProviderError, StructuredSchema, TextGenerator};

/// A structurally valid question JSON object for `subtopic`.
pub fn question_json(subtopic: &str, index: usize) -> Value {
    json!({
        "text": format!("{subtopic} question {index}: which statement is accurate?"),
        "options": {
            "A": format!("{subtopic} correct answer {index}"),
            "B": "A plausible distractor",
            "C": "Another distractor",
            "D": "A third distractor"
        },
        "correct": "A",
        "explanation": format!("Option A is correct for {subtopic}, the others are distractors."),
    })
}

/// A question JSON object that fails structural validation (missing D).
pub fn invalid_question_json(subtopic: &str) -> Value {
    json!({
        "text": format!("{subtopic} broken question missing an option?"),
        "options": {"A": "one", "B": "two", "C": "three"},
        "correct": "A",
        "explanation": "This entry is structurally invalid and must be dropped.",
    })
}

/// Configurable stub [`TextGenerator`].
///
/// Behaviour is keyed on the structured schema name, and per-subtopic
/// behaviour (failure, delay) is matched against the prompt text.
#[derive(Default)]
pub struct StubGenerator {
    subtopics: Option<Vec<String>>,
    questions_per_subtopic: usize,
    failing_subtopics: Vec<String>,
    delayed_subtopics: Vec<(String, Duration)>,
    invalid_question_subtopics: Vec<String>,
    routing: Option<Value>,
    enhancement: Option<String>,
    fail_generate: bool,
    fail_structured: bool,
    pub structured_calls: AtomicU32,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            questions_per_subtopic: 2,
            ..Self::default()
        }
    }

    pub fn with_subtopics(mut self, subtopics: &[&str]) -> Self {
        self.subtopics = Some(subtopics.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_questions_per_subtopic(mut self, count: usize) -> Self {
        self.questions_per_subtopic = count;
        self
    }

    /// Question generation for this subtopic always fails.
    pub fn failing_for(mut self, subtopic: &str) -> Self {
        self.failing_subtopics.push(subtopic.to_string());
        self
    }

    /// Question generation for this subtopic resolves after a delay.
    pub fn delayed_for(mut self, subtopic: &str, delay: Duration) -> Self {
        self.delayed_subtopics.push((subtopic.to_string(), delay));
        self
    }

    /// Question generation for this subtopic returns only invalid entries.
    pub fn invalid_questions_for(mut self, subtopic: &str) -> Self {
        self.invalid_question_subtopics.push(subtopic.to_string());
        self
    }

    /// Fixed response for routing-decision requests.
    pub fn with_routing(mut self, decision: &str) -> Self {
        self.routing = Some(json!({"decision": decision}));
        self
    }

    /// Fixed response for free-form generation (query enhancement).
    pub fn with_enhancement(mut self, enhanced: &str) -> Self {
        self.enhancement = Some(enhanced.to_string());
        self
    }

    /// Every free-form generation call fails.
    pub fn fail_generate(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    /// Every structured generation call fails.
    pub fn fail_structured(mut self) -> Self {
        self.fail_structured = true;
        self
    }

    fn question_batch_for(&self, prompt: &str) -> Result<Value, ProviderError> {
        let subtopic = self
            .subtopics
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .find(|s| prompt.contains(s.as_str()))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        if self.failing_subtopics.iter().any(|s| prompt.contains(s.as_str())) {
            return Err(ProviderError::request(
                "stub_generator",
                format!("configured failure for \"{subtopic}\""),
            ));
        }
        if self
            .invalid_question_subtopics
            .iter()
            .any(|s| prompt.contains(s.as_str()))
        {
            return Ok(json!([invalid_question_json(&subtopic)]));
        }

        let questions: Vec<Value> = (0..self.questions_per_subtopic)
            .map(|i| question_json(&subtopic, i))
            .collect();
        Ok(json!(questions))
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        if self.fail_generate {
            return Err(ProviderError::request("stub_generator", "generate disabled"));
        }
        Ok(self
            .enhancement
            .clone()
            .unwrap_or_else(|| "enhanced query".to_string()))
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &StructuredSchema,
    ) -> Result<Value, ProviderError> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_structured {
            return Err(ProviderError::request(
                "stub_generator",
                "structured generation disabled",
            ));
        }
        match schema.name {
            "subtopic_list" => self
                .subtopics
                .as_ref()
                .map(|s| json!(s))
                .ok_or_else(|| ProviderError::request("stub_generator", "no subtopics configured")),
            "question_batch" => {
                if let Some((_, delay)) = self
                    .delayed_subtopics
                    .iter()
                    .find(|(s, _)| prompt.contains(s.as_str()))
                {
                    tokio::time::sleep(*delay).await;
                }
                self.question_batch_for(prompt)
            }
            "routing_decision" => self
                .routing
                .clone()
                .ok_or_else(|| ProviderError::request("stub_generator", "no routing configured")),
            other => Err(ProviderError::request(
                "stub_generator",
                format!("unexpected schema {other}"),
            )),
        }
    }
}

/// Deterministic embedder: maps text onto a small fixed-dimension vector
/// derived from character counts, so identical text always lands on the
/// same point and related texts score similarly.
#[derive(Default)]
pub struct StubEmbedder {
    fail: bool,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if self.fail {
            return Err(ProviderError::request("stub_embedder", "embed disabled"));
        }
        let lower = text.to_lowercase();
        let letters = lower.chars().filter(|c| c.is_alphabetic()).count() as f32;
        let vowels = lower
            .chars()
            .filter(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
            .count() as f32;
        let spaces = lower.chars().filter(|c| c.is_whitespace()).count() as f32;
        Ok(vec![letters.max(1.0), vowels + 1.0, spaces + 1.0])
    }
}
