//! Capability provider interfaces.
//!
//! The workflow core never talks to an embedding model, a vector index, or
//! an LLM directly; it consumes them through these narrow async traits,
//! injected at build time. That keeps the core deterministic under test
//! (stub providers) and keeps concrete clients out of this crate.

pub mod decode;
pub mod memory;

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryVectorStore;

use crate::types::{DocumentChunk, ScoredChunk};

/// Failures surfaced by capability providers.
///
/// `Request` covers auth, quota, and network failures; `Decode` is the
/// single variant for structured output that did not validate against the
/// requested schema; the core never sees partial or malformed data.
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    #[error("provider request failed ({provider}): {message}")]
    #[diagnostic(code(quizsmith::provider::request))]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("structured output from {provider} failed validation: {message}")]
    #[diagnostic(
        code(quizsmith::provider::decode),
        help("The generator returned output that does not match the requested schema.")
    )]
    Decode {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn request(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            provider,
            message: message.into(),
        }
    }

    pub fn decode(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            provider,
            message: message.into(),
        }
    }

    /// The provider name carried by this error.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Request { provider, .. } | Self::Decode { provider, .. } => provider,
        }
    }
}

/// Declares the shape a structured generation call must return.
///
/// The schema is advisory for the provider (prompt-side constraint); the
/// authoritative validation happens in [`decode`] before the core sees the
/// value.
#[derive(Clone, Debug, Serialize)]
pub struct StructuredSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

impl StructuredSchema {
    pub fn new(name: &'static str, schema: serde_json::Value) -> Self {
        Self { name, schema }
    }
}

/// Turns text into a fixed-dimension embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Optional constraint for a vector search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub file_name: Option<String>,
}

/// Similarity search over stored chunk embeddings.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Returns up to `k` hits ordered by descending score; may return fewer.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredChunk>, ProviderError>;
}

/// A chunk ready for persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewChunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// Persistent chunk storage shared across runs.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Hydrates chunks by id, silently omitting ids that no longer exist.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<DocumentChunk>, ProviderError>;

    /// Stores a chunk and returns its assigned id.
    async fn store_chunk(&self, chunk: NewChunk) -> Result<String, ProviderError>;

    /// Deletes every chunk ingested from the named file; returns the count.
    async fn delete_by_file_name(&self, file_name: &str) -> Result<usize, ProviderError>;
}

/// Text generation, free-form or schema-constrained.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Generate a value constrained by `schema`. Implementations should
    /// return parsed JSON; validation against the expected shape happens in
    /// [`decode`].
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &StructuredSchema,
    ) -> Result<serde_json::Value, ProviderError>;
}
