//! Workflow state management.
//!
//! [`WorkflowState`] is the only mutable entity in a run and is owned
//! exclusively by the executor. It is organized into versioned channels,
//! each with a declared merge policy (see [`crate::reducers`]):
//!
//! - **subtopics**: replace
//! - **questions**: append
//! - **retrieval**: replace (enhanced query + search hits + documents)
//! - **log**: append-only audit trail
//! - **metrics**: append/increment
//!
//! Stages receive an immutable [`StateSnapshot`] and return patches; they
//! never mutate state directly.
//!
//! # Examples
//!
//! ```rust
//! use quizsmith::state::WorkflowState;
//!
//! let state = WorkflowState::new_with_topic("Photosynthesis");
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.input_topic, "Photosynthesis");
//! assert!(snapshot.subtopics.is_empty());
//! assert_eq!(snapshot.subtopics_version, 1);
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::channels::errors::{ErrorEvent, WarningEvent};
use crate::channels::{Channel, VersionedChannel};
use crate::question::Question;
use crate::types::RetrievalSet;

/// One entry in the run's append-only audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub stage: String,
    pub message: String,
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
}

impl LogEntry {
    pub fn new<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            when: Utc::now(),
        }
    }
}

/// Counters and recoverable-failure records accumulated across a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// How many times each stage ran, keyed by the stage's encoded name.
    pub stage_invocations: FxHashMap<String, u32>,
    pub errors: Vec<ErrorEvent>,
    pub warnings: Vec<WarningEvent>,
}

impl RunMetrics {
    pub fn record_invocation(&mut self, stage: &str) {
        *self.stage_invocations.entry(stage.to_string()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn invocations(&self, stage: &str) -> u32 {
        self.stage_invocations.get(stage).copied().unwrap_or(0)
    }
}

pub type SubtopicsChannel = VersionedChannel<Vec<String>>;
pub type QuestionsChannel = VersionedChannel<Vec<Question>>;
pub type RetrievalChannel = VersionedChannel<RetrievalSet>;
pub type LogChannel = VersionedChannel<Vec<LogEntry>>;
pub type MetricsChannel = VersionedChannel<RunMetrics>;

/// The main state container for one workflow run.
///
/// Created fresh per invocation; nothing is checkpointed mid-run and the
/// state is dropped when the run completes. `input_topic` is set once at
/// construction and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowState {
    input_topic: String,
    pub subtopics: SubtopicsChannel,
    pub questions: QuestionsChannel,
    pub retrieval: RetrievalChannel,
    pub log: LogChannel,
    pub metrics: MetricsChannel,
}

/// Immutable snapshot of the workflow state at a barrier.
///
/// Snapshots are cloned data: stages can hold them across await points
/// while the executor continues to own the live state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub input_topic: String,
    pub subtopics: Vec<String>,
    pub subtopics_version: u32,
    pub questions: Vec<Question>,
    pub questions_version: u32,
    pub retrieval: RetrievalSet,
    pub retrieval_version: u32,
    pub log: Vec<LogEntry>,
    pub log_version: u32,
    pub metrics: RunMetrics,
    pub metrics_version: u32,
}

impl StateSnapshot {
    /// Concatenated text of all hydrated documents, used as grounding
    /// context by the generation stages. Empty when nothing was retrieved.
    #[must_use]
    pub fn grounding_context(&self) -> String {
        self.retrieval
            .documents
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The last `n` log entries, oldest first.
    #[must_use]
    pub fn log_tail(&self, n: usize) -> &[LogEntry] {
        let start = self.log.len().saturating_sub(n);
        &self.log[start..]
    }
}

impl WorkflowState {
    /// Creates a new state for the given topic or query.
    ///
    /// All accumulators start empty and every channel starts at version 1.
    /// Input validation (non-empty, length bound) happens in the workflow
    /// entry point before this is called.
    pub fn new_with_topic(topic: &str) -> Self {
        Self {
            input_topic: topic.to_string(),
            subtopics: SubtopicsChannel::default(),
            questions: QuestionsChannel::default(),
            retrieval: RetrievalChannel::default(),
            log: LogChannel::default(),
            metrics: MetricsChannel::default(),
        }
    }

    pub fn builder() -> WorkflowStateBuilder {
        WorkflowStateBuilder::default()
    }

    #[must_use]
    pub fn input_topic(&self) -> &str {
        &self.input_topic
    }

    /// Creates an immutable snapshot of the current state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            input_topic: self.input_topic.clone(),
            subtopics: self.subtopics.snapshot(),
            subtopics_version: self.subtopics.version(),
            questions: self.questions.snapshot(),
            questions_version: self.questions.version(),
            retrieval: self.retrieval.snapshot(),
            retrieval_version: self.retrieval.version(),
            log: self.log.snapshot(),
            log_version: self.log.version(),
            metrics: self.metrics.snapshot(),
            metrics_version: self.metrics.version(),
        }
    }
}

/// Builder for constructing pre-populated states, mostly useful in tests.
#[derive(Debug, Default)]
pub struct WorkflowStateBuilder {
    topic: String,
    subtopics: Vec<String>,
    questions: Vec<Question>,
    retrieval: RetrievalSet,
    log: Vec<LogEntry>,
}

impl WorkflowStateBuilder {
    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = topic.to_string();
        self
    }

    pub fn with_subtopics(mut self, subtopics: Vec<String>) -> Self {
        self.subtopics = subtopics;
        self
    }

    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = questions;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalSet) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_log_entry(mut self, entry: LogEntry) -> Self {
        self.log.push(entry);
        self
    }

    pub fn build(self) -> WorkflowState {
        WorkflowState {
            input_topic: self.topic,
            subtopics: SubtopicsChannel::new(self.subtopics, 1),
            questions: QuestionsChannel::new(self.questions, 1),
            retrieval: RetrievalChannel::new(self.retrieval, 1),
            log: LogChannel::new(self.log, 1),
            metrics: MetricsChannel::default(),
        }
    }
}
