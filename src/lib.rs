//! # Quizsmith: Supervisor-Routed Quiz Generation Workflows
//!
//! Quizsmith turns a topic or query into a multiple-choice quiz through a
//! bounded workflow loop: a supervisor inspects the state, routes to a
//! stage (topic expansion, document retrieval, question generation), the
//! stage's partial output is merged back with a declared per-channel policy,
//! and control returns to the supervisor until the run finishes or hits the
//! turn ceiling.
//!
//! ## Core Concepts
//!
//! - **Stages**: Async units of work that process state snapshots and
//!   return partial updates
//! - **State**: Versioned channels with explicit merge policies (replace or
//!   append)
//! - **Supervisor**: Deterministic-first router with a constrained LLM
//!   fallback for ambiguous states
//! - **Providers**: Injected capabilities (embedding, vector search,
//!   document store, text generation) behind narrow async traits
//! - **Executor**: Drives the loop, merges at barriers, enforces the step
//!   ceiling, and survives partial failures
//!
//! ## Quick Start
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
//! for question in &outcome.state.questions {
//!     println!("[{}] {}", question.correct, question.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure Posture
//!
//! Only invalid input is an error from the caller's point of view. Provider
//! failures retry with backoff and then degrade (placeholder subtopics, a
//! smaller question set, an ungrounded run) while the audit log and
//! metrics record what happened. A run that produced at least one subtopic
//! and one question reports `success = true`.
//!
//! ## Module Guide
//!
//! - [`workflow`] - Builder and invocation entry point
//! - [`state`] - Versioned workflow state and snapshots
//! - [`stage`] - Stage trait and execution primitives
//! - [`stages`] - The built-in stage implementations
//! - [`supervisor`] - Routing policy
//! - [`reducers`] - State merge policies
//! - [`providers`] - Capability interfaces and the in-memory store
//! - [`ingestion`] - Chunking and document ingestion
//! - [`event_bus`] - Observability events and sinks

pub mod channels;
pub mod config;
pub mod event_bus;
pub mod executor;
pub mod ingestion;
pub mod providers;
pub mod question;
pub mod reducers;
pub mod stage;
pub mod stages;
pub mod state;
pub mod supervisor;
pub mod telemetry;
pub mod types;
pub mod workflow;
