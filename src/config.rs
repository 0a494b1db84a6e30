//! Workflow configuration.

use std::time::Duration;

/// Tunable limits for a workflow run.
///
/// Defaults match the documented policy; [`WorkflowConfig::from_env`]
/// resolves overrides from `QUIZSMITH_*` environment variables (loading a
/// `.env` file when present).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Hard ceiling on supervisor turns; reaching it forces termination.
    pub max_supervisor_turns: u64,
    /// Attempts per retried provider call (topic expansion, per-subtopic
    /// question generation).
    pub max_retries: u32,
    /// Base backoff between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Target question count per subtopic.
    pub questions_per_subtopic: usize,
    /// Inclusive bounds on the subtopic list size.
    pub min_subtopics: usize,
    pub max_subtopics: usize,
    /// Top-K for vector search in the retrieval stage.
    pub top_k: usize,
    /// Maximum accepted input topic/query length, in characters.
    pub max_input_len: usize,
    /// How many trailing log entries the supervisor's fallback sees.
    pub supervisor_log_window: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_supervisor_turns: 25,
            max_retries: 2,
            retry_backoff: Duration::from_millis(1000),
            questions_per_subtopic: 5,
            min_subtopics: 3,
            max_subtopics: 5,
            top_k: 5,
            max_input_len: 512,
            supervisor_log_window: 8,
        }
    }
}

impl WorkflowConfig {
    /// Resolve configuration with environment overrides.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            max_supervisor_turns: env_parse("QUIZSMITH_MAX_TURNS", defaults.max_supervisor_turns),
            max_retries: env_parse("QUIZSMITH_MAX_RETRIES", defaults.max_retries),
            retry_backoff: Duration::from_millis(env_parse(
                "QUIZSMITH_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )),
            questions_per_subtopic: env_parse(
                "QUIZSMITH_QUESTIONS_PER_SUBTOPIC",
                defaults.questions_per_subtopic,
            ),
            min_subtopics: defaults.min_subtopics,
            max_subtopics: defaults.max_subtopics,
            top_k: env_parse("QUIZSMITH_TOP_K", defaults.top_k),
            max_input_len: env_parse("QUIZSMITH_MAX_INPUT_LEN", defaults.max_input_len),
            supervisor_log_window: defaults.supervisor_log_window,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
