mod common;

use std::sync::Arc;

use common::providers::StubEmbedder;
use quizsmith::ingestion::{chunk_text, ChunkerConfig, IngestionPipeline};
use quizsmith::providers::memory::InMemoryVectorStore;
use quizsmith::providers::DocumentStore;

fn long_document() -> String {
    "Photosynthesis converts light energy into chemical energy. \
     Chlorophyll absorbs red and blue light most strongly. \
     The Calvin cycle fixes carbon dioxide into sugars.\n"
        .repeat(12)
}

#[test]
fn default_chunking_respects_target_and_overlap() {
    let text = long_document();
    let config = ChunkerConfig::default();
    let chunks = chunk_text(&text, &config);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= config.target_size);
        assert!(!chunk.trim().is_empty());
    }
}

#[tokio::test]
async fn ingest_stores_chunks_with_metadata() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = IngestionPipeline::new(Arc::new(StubEmbedder::new()), store.clone());

    let report = pipeline
        .ingest("upload", "bio.txt", &long_document())
        .await
        .unwrap();

    assert!(report.stored > 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.chunk_ids.len(), report.stored);
    assert_eq!(store.len().await, report.stored);

    let documents = store.fetch_by_ids(&report.chunk_ids).await.unwrap();
    for (index, document) in documents.iter().enumerate() {
        assert_eq!(document.metadata["file_name"], "bio.txt");
        assert_eq!(document.metadata["source"], "upload");
        assert_eq!(document.metadata["chunk_index"], index);
        assert_eq!(document.metadata["total_chunks"], report.stored);
        assert!(document.metadata["uploaded_at"].is_string());
    }
}

#[tokio::test]
async fn ingest_skips_chunks_when_embedding_fails() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = IngestionPipeline::new(Arc::new(StubEmbedder::failing()), store.clone());

    let report = pipeline
        .ingest("upload", "bio.txt", &long_document())
        .await
        .unwrap();

    assert_eq!(report.stored, 0);
    assert!(report.skipped > 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn delete_file_removes_previous_ingestion() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = IngestionPipeline::new(Arc::new(StubEmbedder::new()), store.clone());

    let report = pipeline
        .ingest("upload", "bio.txt", &long_document())
        .await
        .unwrap();
    pipeline
        .ingest("upload", "other.txt", "Some other document entirely.")
        .await
        .unwrap();

    let deleted = pipeline.delete_file("bio.txt").await.unwrap();
    assert_eq!(deleted, report.stored);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn empty_document_ingests_nothing() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = IngestionPipeline::new(Arc::new(StubEmbedder::new()), store.clone());

    let report = pipeline.ingest("upload", "empty.txt", "   \n  ").await.unwrap();
    assert_eq!(report.stored, 0);
    assert_eq!(report.skipped, 0);
    assert!(store.is_empty().await);
}
