//! Core types for the quizsmith workflow.
//!
//! This module defines the fundamental identifiers and value types used
//! throughout the crate: which stage is which ([`StageKind`]), which state
//! channel is which ([`ChannelType`]), and the chunk-shaped values that flow
//! between the retrieval providers and the workflow state.
//!
//! # Examples
//!
//! ```rust
//! use quizsmith::types::{ChannelType, StageKind};
//!
//! let stage = StageKind::TopicExpansion;
//! assert_eq!(stage.encode(), "topic_expansion");
//! assert_eq!(StageKind::decode("topic_expansion"), Some(stage));
//!
//! println!("merging {} channel", ChannelType::Questions);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one named unit of work in the workflow.
///
/// Unlike a general graph framework there is no open-ended custom variant:
/// the supervisor's routing vocabulary is closed, and every decision other
/// than termination maps to exactly one of these stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Expands the input topic into a bounded list of subtopics.
    TopicExpansion,
    /// Enhances the raw query, runs vector search, and hydrates documents.
    DocumentRetrieval,
    /// Fans out per-subtopic question generation and merges the results.
    QuestionGeneration,
}

impl StageKind {
    /// Stable string form used in logs, metrics keys, and error scopes.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            StageKind::TopicExpansion => "topic_expansion",
            StageKind::DocumentRetrieval => "document_retrieval",
            StageKind::QuestionGeneration => "question_generation",
        }
    }

    /// Decode the persisted string form back into a `StageKind`.
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "topic_expansion" => Some(StageKind::TopicExpansion),
            "document_retrieval" => Some(StageKind::DocumentRetrieval),
            "question_generation" => Some(StageKind::QuestionGeneration),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Identifies a state channel and, implicitly, its merge policy.
///
/// Each channel has exactly one declared policy, applied by the reducer
/// registry at every barrier:
///
/// - [`Subtopics`](Self::Subtopics): replace
/// - [`Questions`](Self::Questions): append
/// - [`Retrieval`](Self::Retrieval): replace (query, hits, and documents
///   move together; they describe one retrieval pass)
/// - [`Log`](Self::Log): append
/// - [`Metrics`](Self::Metrics): append/increment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    Subtopics,
    Questions,
    Retrieval,
    Log,
    Metrics,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subtopics => write!(f, "subtopics"),
            Self::Questions => write!(f, "questions"),
            Self::Retrieval => write!(f, "retrieval"),
            Self::Log => write!(f, "log"),
            Self::Metrics => write!(f, "metrics"),
        }
    }
}

/// A vector-search hit: chunk id plus relevance score, descending by score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub score: f32,
}

/// A hydrated document chunk fetched from the document store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// The replace-semantics retrieval slice of the workflow state.
///
/// `enhanced_query` doubles as the "retrieval attempted" marker: the
/// retrieval stage always sets it (to the enhanced query, or to the raw
/// query when enhancement fails), so a `None` here means the stage has not
/// run yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSet {
    pub enhanced_query: Option<String>,
    pub retrieved: Vec<ScoredChunk>,
    pub documents: Vec<DocumentChunk>,
}

impl RetrievalSet {
    /// True once the retrieval stage has run, regardless of result count.
    #[must_use]
    pub fn attempted(&self) -> bool {
        self.enhanced_query.is_some()
    }
}
