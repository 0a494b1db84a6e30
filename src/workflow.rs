//! Workflow assembly and the public entry point.
//!
//! [`WorkflowBuilder`] wires capability providers into stages and a
//! supervisor, and [`Workflow::invoke`] runs one topic or query through the
//! loop. Providers are injected as trait objects; nothing is constructed at
//! module scope, so tests substitute stubs freely.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quizsmith::providers::TextGenerator;
//! use quizsmith::workflow::WorkflowBuilder;
//!
//! # async fn example(generator: Arc<dyn TextGenerator>) -> miette::Result<()> {
//! let workflow = WorkflowBuilder::topic_only()
//!     .with_generator(generator)
//!     .build()?;
//!
//! let outcome = workflow.invoke("Photosynthesis").await?;
//! println!(
//!     "{} questions across {} subtopics (success: {})",
//!     outcome.state.questions.len(),
//!     outcome.state.subtopics.len(),
//!     outcome.success
//! );
//! # Ok(())
//! # }
//! ```

use rustc_hash::FxHashMap;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::config::WorkflowConfig;
use crate::event_bus::{EventBus, EventSink};
use crate::executor::{Executor, RunOutcome};
use crate::providers::{DocumentStore, Embedder, TextGenerator, VectorSearch};
use crate::stage::Stage;
use crate::stages::{DocumentRetrievalStage, QuestionGenerationStage, TopicExpansionStage};
use crate::state::WorkflowState;
use crate::supervisor::{Supervisor, WorkflowVariant};
use crate::types::StageKind;

/// Fatal errors surfaced to the caller.
///
/// Everything else (provider failures, malformed generator output, partial
/// results) degrades inside the run and lands in the outcome's metrics.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    #[error("invalid input: {reason}")]
    #[diagnostic(
        code(quizsmith::workflow::invalid_input),
        help("Provide a non-empty topic within the configured length bound.")
    )]
    InvalidInput { reason: String },
}

/// Errors detected while assembling a workflow.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("no text generator configured")]
    #[diagnostic(
        code(quizsmith::workflow::missing_generator),
        help("Every variant needs a TextGenerator; call with_generator().")
    )]
    MissingGenerator,

    #[error("retrieval-augmented workflow is missing {what}")]
    #[diagnostic(
        code(quizsmith::workflow::missing_retrieval_provider),
        help("The retrieval variant needs an embedder, a vector search, and a document store.")
    )]
    MissingRetrievalProvider { what: &'static str },
}

/// Builder for assembling a [`Workflow`] with fluent API.
pub struct WorkflowBuilder {
    variant: WorkflowVariant,
    config: WorkflowConfig,
    generator: Option<Arc<dyn TextGenerator>>,
    embedder: Option<Arc<dyn Embedder>>,
    search: Option<Arc<dyn VectorSearch>>,
    store: Option<Arc<dyn DocumentStore>>,
    sinks: Vec<Box<dyn EventSink>>,
    supervisor_fallback: bool,
}

impl WorkflowBuilder {
    pub fn new(variant: WorkflowVariant) -> Self {
        Self {
            variant,
            config: WorkflowConfig::default(),
            generator: None,
            embedder: None,
            search: None,
            store: None,
            sinks: Vec::new(),
            supervisor_fallback: true,
        }
    }

    /// Topic in, quiz out; no document grounding.
    pub fn topic_only() -> Self {
        Self::new(WorkflowVariant::TopicOnly)
    }

    /// Retrieval-augmented variant: enhance → retrieve → expand → generate.
    pub fn retrieval_augmented() -> Self {
        Self::new(WorkflowVariant::RetrievalAugmented)
    }

    #[must_use]
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_vector_search(mut self, search: Arc<dyn VectorSearch>) -> Self {
        self.search = Some(search);
        self
    }

    #[must_use]
    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Add an event sink to the run's event bus.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Disable the supervisor's LLM fallback for ambiguous states; they
    /// finish immediately instead.
    #[must_use]
    pub fn without_supervisor_fallback(mut self) -> Self {
        self.supervisor_fallback = false;
        self
    }

    pub fn build(self) -> Result<Workflow, BuildError> {
        let generator = self.generator.ok_or(BuildError::MissingGenerator)?;

        let mut stages: FxHashMap<StageKind, Arc<dyn Stage>> = FxHashMap::default();
        stages.insert(
            StageKind::TopicExpansion,
            Arc::new(TopicExpansionStage::new(Arc::clone(&generator), &self.config)),
        );
        stages.insert(
            StageKind::QuestionGeneration,
            Arc::new(QuestionGenerationStage::new(
                Arc::clone(&generator),
                &self.config,
            )),
        );

        if self.variant == WorkflowVariant::RetrievalAugmented {
            let embedder = self
                .embedder
                .ok_or(BuildError::MissingRetrievalProvider { what: "an embedder" })?;
            let search = self
                .search
                .ok_or(BuildError::MissingRetrievalProvider { what: "a vector search" })?;
            let store = self
                .store
                .ok_or(BuildError::MissingRetrievalProvider { what: "a document store" })?;
            stages.insert(
                StageKind::DocumentRetrieval,
                Arc::new(DocumentRetrievalStage::new(
                    Arc::clone(&generator),
                    embedder,
                    search,
                    store,
                    &self.config,
                )),
            );
        }

        let mut supervisor = Supervisor::new(self.variant, self.config.supervisor_log_window);
        if self.supervisor_fallback {
            supervisor = supervisor.with_fallback(Arc::clone(&generator));
        }

        let event_bus = if self.sinks.is_empty() {
            EventBus::default()
        } else {
            EventBus::with_sinks(self.sinks)
        };

        Ok(Workflow {
            executor: Executor::new(stages, supervisor, self.config.clone()),
            event_bus,
            config: self.config,
        })
    }
}

/// A compiled workflow, ready to invoke.
pub struct Workflow {
    executor: Executor,
    event_bus: EventBus,
    config: WorkflowConfig,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Workflow {
    /// Run one topic or query through the workflow.
    ///
    /// Only input validation can fail here; every other failure mode is
    /// recorded inside the returned [`RunOutcome`].
    pub async fn invoke(&self, topic: &str) -> Result<RunOutcome, WorkflowError> {
        let topic = self.validate_input(topic)?;
        self.event_bus.listen_for_events();
        let state = WorkflowState::new_with_topic(&topic);
        Ok(self.executor.run(state, self.event_bus.sender()).await)
    }

    fn validate_input(&self, topic: &str) -> Result<String, WorkflowError> {
        let trimmed = topic.trim();
        if trimmed.is_empty() {
            return Err(WorkflowError::InvalidInput {
                reason: "topic is empty".to_string(),
            });
        }
        let len = trimmed.chars().count();
        if len > self.config.max_input_len {
            return Err(WorkflowError::InvalidInput {
                reason: format!(
                    "topic is {len} characters, maximum is {}",
                    self.config.max_input_len
                ),
            });
        }
        Ok(trimmed.to_string())
    }
}
