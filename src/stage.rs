//! Stage execution framework.
//!
//! This module provides the core abstractions for workflow stages: the
//! [`Stage`] trait, the execution context handed to each stage, the
//! [`StagePartial`] patch type, and stage-level errors.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::channels::errors::{ErrorEvent, WarningEvent};
use crate::event_bus::Event;
use crate::providers::ProviderError;
use crate::question::Question;
use crate::state::{LogEntry, StateSnapshot};
use crate::types::RetrievalSet;

/// Core trait defining one unit of work in the workflow.
///
/// A stage receives the current state snapshot and execution context,
/// performs its work (usually through injected capability providers), and
/// returns a partial state patch. Stages are stateless between invocations;
/// anything they need to remember goes through the state.
///
/// # Error handling
///
/// Returning `Err` is reserved for conditions the stage cannot degrade
/// around (missing required input, a broken event bus). Provider hiccups are
/// handled inside the stage: retried, then degraded into a fallback value or
/// a smaller result, with the failure recorded in the partial's `errors` or
/// `warnings`. The executor treats an `Err` as an empty patch and keeps the
/// run alive either way.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: StageContext,
    ) -> Result<StagePartial, StageError>;
}

/// Execution context passed to stages.
#[derive(Clone, Debug)]
pub struct StageContext {
    /// Encoded name of the stage being run.
    pub stage_id: String,
    /// Current supervisor turn number.
    pub step: u64,
    /// Channel for emitting events to the run's event bus.
    pub event_sender: flume::Sender<Event>,
}

impl StageContext {
    /// Emit a stage-scoped event enriched with this context's metadata.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), StageContextError> {
        self.event_sender
            .send(Event::stage_message_with_meta(
                self.stage_id.clone(),
                self.step,
                scope,
                message,
            ))
            .map_err(|_| StageContextError::EventBusUnavailable)
    }
}

/// Partial state update returned by stage execution.
///
/// All fields are optional; `None` means "no contribution to this channel".
/// The reducer registry merges each present field with the channel's
/// declared policy (replace or append).
#[derive(Clone, Debug, Default)]
pub struct StagePartial {
    /// Replaces the subtopics channel.
    pub subtopics: Option<Vec<String>>,
    /// Appended to the questions channel.
    pub questions: Option<Vec<Question>>,
    /// Replaces the retrieval channel.
    pub retrieval: Option<RetrievalSet>,
    /// Appended to the audit log.
    pub log: Option<Vec<LogEntry>>,
    /// Appended to `metrics.errors`.
    pub errors: Option<Vec<ErrorEvent>>,
    /// Appended to `metrics.warnings`.
    pub warnings: Option<Vec<WarningEvent>>,
}

impl StagePartial {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subtopics(mut self, subtopics: Vec<String>) -> Self {
        self.subtopics = Some(subtopics);
        self
    }

    #[must_use]
    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = Some(questions);
        self
    }

    #[must_use]
    pub fn with_retrieval(mut self, retrieval: RetrievalSet) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: Vec<LogEntry>) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEvent>) -> Self {
        self.errors = Some(errors);
        self
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<WarningEvent>) -> Self {
        self.warnings = Some(warnings);
        self
    }

    /// Push a log entry, creating the vector on first use.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.log.get_or_insert_with(Vec::new).push(entry);
    }

    /// Push an error event, creating the vector on first use.
    pub fn push_error(&mut self, event: ErrorEvent) {
        self.errors.get_or_insert_with(Vec::new).push(event);
    }

    /// Push a warning, creating the vector on first use.
    pub fn push_warning(&mut self, warning: WarningEvent) {
        self.warnings.get_or_insert_with(Vec::new).push(warning);
    }
}

/// Errors that can occur when using [`StageContext`] methods.
#[derive(Debug, Error, Diagnostic)]
pub enum StageContextError {
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(quizsmith::stage::event_bus_unavailable),
        help("The event bus listener may have shut down before the stage finished.")
    )]
    EventBusUnavailable,
}

/// Errors that abort a single stage invocation.
///
/// The executor records these into `metrics.errors` and continues the run
/// with an empty patch; they never abort the workflow.
#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(quizsmith::stage::missing_input),
        help("Check that the supervisor routed the stages in the right order.")
    )]
    MissingInput { what: &'static str },

    /// A provider failure the stage could not degrade around.
    #[error(transparent)]
    #[diagnostic(code(quizsmith::stage::provider))]
    Provider(#[from] ProviderError),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(quizsmith::stage::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Event bus communication error.
    #[error("event bus error: {0}")]
    #[diagnostic(code(quizsmith::stage::event_bus))]
    EventBus(#[from] StageContextError),
}
