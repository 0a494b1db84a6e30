//! In-memory chunk store with cosine-similarity search.
//!
//! Backs ingestion and retrieval when no external vector database is
//! wired in, and doubles as the deterministic store for tests. Reads are
//! concurrent; writes take the lock briefly and never across an await.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, NewChunk, ProviderError, SearchFilter, VectorSearch};
use crate::types::{DocumentChunk, ScoredChunk};

#[derive(Debug, Clone)]
struct StoredChunk {
    id: String,
    text: String,
    embedding: Vec<f32>,
    metadata: serde_json::Value,
}

/// Thread-safe in-memory implementation of [`DocumentStore`] and
/// [`VectorSearch`].
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks currently stored.
    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn matches_filter(chunk: &StoredChunk, filter: Option<&SearchFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    match &filter.file_name {
        None => true,
        Some(name) => chunk
            .metadata
            .get("file_name")
            .and_then(|v| v.as_str())
            .is_some_and(|v| v == name),
    }
}

#[async_trait]
impl VectorSearch for InMemoryVectorStore {
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredChunk>, ProviderError> {
        let chunks = self.chunks.read().await;
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|c| matches_filter(c, filter))
            .map(|c| ScoredChunk {
                id: c.id.clone(),
                score: cosine_similarity(query, &c.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait]
impl DocumentStore for InMemoryVectorStore {
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<DocumentChunk>, ProviderError> {
        let chunks = self.chunks.read().await;
        // Preserve the requested id order; missing ids are omitted.
        let documents = ids
            .iter()
            .filter_map(|id| {
                chunks.iter().find(|c| &c.id == id).map(|c| DocumentChunk {
                    id: c.id.clone(),
                    text: c.text.clone(),
                    metadata: c.metadata.clone(),
                })
            })
            .collect();
        Ok(documents)
    }

    async fn store_chunk(&self, chunk: NewChunk) -> Result<String, ProviderError> {
        let id = Uuid::new_v4().to_string();
        self.chunks.write().await.push(StoredChunk {
            id: id.clone(),
            text: chunk.text,
            embedding: chunk.embedding,
            metadata: chunk.metadata,
        });
        Ok(id)
    }

    async fn delete_by_file_name(&self, file_name: &str) -> Result<usize, ProviderError> {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|c| {
            c.metadata
                .get("file_name")
                .and_then(|v| v.as_str())
                .is_none_or(|v| v != file_name)
        });
        Ok(before - chunks.len())
    }
}
