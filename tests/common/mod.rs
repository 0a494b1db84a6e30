#![allow(dead_code)]

pub mod providers;

use std::collections::BTreeMap;
use std::time::Duration;

use quizsmith::config::WorkflowConfig;
use quizsmith::question::{OptionKey, Question};

/// Config with fast retries and a small ceiling so tests stay quick.
pub fn fast_config() -> WorkflowConfig {
    WorkflowConfig {
        max_supervisor_turns: 8,
        max_retries: 2,
        retry_backoff: Duration::from_millis(1),
        questions_per_subtopic: 2,
        ..WorkflowConfig::default()
    }
}

/// A structurally valid question tagged with `subtopic`.
pub fn sample_question(subtopic: &str) -> Question {
    let options = BTreeMap::from([
        (OptionKey::A, "The correct answer".to_string()),
        (OptionKey::B, "A distractor".to_string()),
        (OptionKey::C, "Another distractor".to_string()),
        (OptionKey::D, "A third distractor".to_string()),
    ]);
    Question::new(
        format!("{subtopic}: which statement is accurate?"),
        options,
        OptionKey::A,
        "Option A is the accurate statement here.",
        Some(subtopic.to_string()),
    )
    .expect("sample question is valid")
}
