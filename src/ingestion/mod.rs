//! Document ingestion: chunk, embed, and store uploaded text.
//!
//! The workflow core consumes the chunk store through the provider traits;
//! this module is the write side that fills it. Chunking policy is fixed
//! (see [`chunker`]); every non-empty trimmed chunk is embedded and stored
//! with its source metadata.

mod chunker;

pub use chunker::{chunk_text, ChunkerConfig};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::providers::{DocumentStore, Embedder, NewChunk, ProviderError};

/// Metadata stored alongside every ingested chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Summary of one ingestion pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReport {
    pub file_name: String,
    pub stored: usize,
    /// Chunks skipped because embedding failed.
    pub skipped: usize,
    pub chunk_ids: Vec<String>,
}

/// Chunks, embeds, and stores uploaded documents.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    chunker: ChunkerConfig,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            embedder,
            store,
            chunker: ChunkerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// Ingest one document. Chunks whose embedding call fails are skipped
    /// and counted; a storage failure aborts the pass.
    #[instrument(skip(self, text), fields(file_name))]
    pub async fn ingest(
        &self,
        source: &str,
        file_name: &str,
        text: &str,
    ) -> Result<IngestReport, ProviderError> {
        let chunks = chunk_text(text, &self.chunker);
        let total_chunks = chunks.len();
        let uploaded_at = Utc::now();
        tracing::debug!(total_chunks, "chunked document");

        let mut report = IngestReport {
            file_name: file_name.to_string(),
            stored: 0,
            skipped: 0,
            chunk_ids: Vec::with_capacity(total_chunks),
        };

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            let embedding = match self.embedder.embed(&chunk).await {
                Ok(embedding) => embedding,
                Err(err) => {
                    tracing::warn!(chunk_index, error = %err, "embedding failed, skipping chunk");
                    report.skipped += 1;
                    continue;
                }
            };
            let metadata = ChunkMetadata {
                source: source.to_string(),
                file_name: file_name.to_string(),
                uploaded_at,
                chunk_index,
                total_chunks,
            };
            let id = self
                .store
                .store_chunk(NewChunk {
                    text: chunk,
                    embedding,
                    metadata: serde_json::to_value(&metadata)
                        .map_err(|e| ProviderError::request("document_store", e.to_string()))?,
                })
                .await?;
            report.chunk_ids.push(id);
            report.stored += 1;
        }

        tracing::info!(
            stored = report.stored,
            skipped = report.skipped,
            "document ingested"
        );
        Ok(report)
    }

    /// Remove every chunk previously ingested from the named file.
    pub async fn delete_file(&self, file_name: &str) -> Result<usize, ProviderError> {
        self.store.delete_by_file_name(file_name).await
    }
}
