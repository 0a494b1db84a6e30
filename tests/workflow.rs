mod common;

use std::sync::Arc;

use common::fast_config;
use common::providers::{StubEmbedder, StubGenerator};
use quizsmith::event_bus::{ChannelSink, STREAM_END_SCOPE};
use quizsmith::ingestion::IngestionPipeline;
use quizsmith::providers::memory::InMemoryVectorStore;
use quizsmith::question::OptionKey;
use quizsmith::workflow::{BuildError, WorkflowBuilder};

#[tokio::test]
async fn photosynthesis_end_to_end() {
    let generator = Arc::new(
        StubGenerator::new()
            .with_subtopics(&["Light Reactions", "Dark Reactions", "Chlorophyll"])
            .with_questions_per_subtopic(2),
    );
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(generator)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("Photosynthesis").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.state.subtopics.len(), 3);
    assert_eq!(outcome.state.questions.len(), 6);

    for question in &outcome.state.questions {
        assert_eq!(question.options.len(), 4);
        assert!(question.options.contains_key(&question.correct));
        assert!(question.text.len() >= 10);
        assert!(OptionKey::ALL.iter().all(|k| question.options.contains_key(k)));
    }

    // Questions group by subtopic in list order.
    let subtopic_order: Vec<&str> = outcome
        .state
        .questions
        .iter()
        .map(|q| q.subtopic.as_deref().unwrap())
        .collect();
    assert_eq!(
        subtopic_order,
        vec![
            "Light Reactions",
            "Light Reactions",
            "Dark Reactions",
            "Dark Reactions",
            "Chlorophyll",
            "Chlorophyll"
        ]
    );
}

#[tokio::test]
async fn partial_failure_still_reports_success() {
    let generator = Arc::new(
        StubGenerator::new()
            .with_subtopics(&["North", "South", "East", "West"])
            .failing_for("South"),
    );
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(generator)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("Compass directions").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.state.questions.len(), 6);
    let south_warnings: Vec<_> = outcome
        .state
        .metrics
        .warnings
        .iter()
        .filter(|w| w.message.contains("South"))
        .collect();
    assert_eq!(south_warnings.len(), 1);
}

#[tokio::test]
async fn retrieval_augmented_end_to_end() {
    let store = Arc::new(InMemoryVectorStore::new());
    let embedder = Arc::new(StubEmbedder::new());

    // Seed the store the way uploads do: chunk, embed, store.
    let pipeline = IngestionPipeline::new(embedder.clone(), store.clone());
    pipeline
        .ingest(
            "upload",
            "photosynthesis.txt",
            "Photosynthesis converts light energy into chemical energy. \
             Chlorophyll absorbs red and blue light most strongly. \
             The Calvin cycle fixes carbon dioxide into sugars.",
        )
        .await
        .unwrap();

    let generator = Arc::new(
        StubGenerator::new()
            .with_subtopics(&["Light Reactions", "Calvin Cycle", "Chlorophyll"])
            .with_enhancement("photosynthesis light reactions calvin cycle"),
    );
    let workflow = WorkflowBuilder::retrieval_augmented()
        .with_generator(generator)
        .with_embedder(embedder)
        .with_vector_search(store.clone())
        .with_document_store(store)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("How does photosynthesis work?").await.unwrap();

    assert!(outcome.success);
    assert!(outcome.state.retrieval.attempted());
    assert!(!outcome.state.retrieval.documents.is_empty());
    assert_eq!(
        outcome.state.retrieval.enhanced_query.as_deref(),
        Some("photosynthesis light reactions calvin cycle")
    );
    assert_eq!(outcome.state.subtopics.len(), 3);
    assert_eq!(outcome.state.questions.len(), 6);
    assert_eq!(outcome.state.metrics.invocations("document_retrieval"), 1);
}

#[tokio::test]
async fn retrieval_variant_degrades_when_store_is_empty() {
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(
        StubGenerator::new().with_subtopics(&["Light Reactions", "Calvin Cycle", "Chlorophyll"]),
    );
    let workflow = WorkflowBuilder::retrieval_augmented()
        .with_generator(generator)
        .with_embedder(Arc::new(StubEmbedder::new()))
        .with_vector_search(store.clone())
        .with_document_store(store)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("How does photosynthesis work?").await.unwrap();

    // Zero retrieved chunks is not an error: the run continues without
    // grounding and still succeeds.
    assert!(outcome.success);
    assert!(outcome.state.retrieval.documents.is_empty());
    assert!(outcome
        .state
        .metrics
        .warnings
        .iter()
        .any(|w| w.message.contains("no documents")));
}

#[tokio::test]
async fn retrieval_variant_requires_all_providers() {
    let err = WorkflowBuilder::retrieval_augmented()
        .with_generator(Arc::new(StubGenerator::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingRetrievalProvider { .. }));
}

#[tokio::test]
async fn event_stream_sees_run_lifecycle() {
    let (sender, receiver) = flume::unbounded();
    let generator = Arc::new(
        StubGenerator::new().with_subtopics(&["Light Reactions", "Dark Reactions", "Chlorophyll"]),
    );
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(generator)
        .with_config(fast_config())
        .with_event_sink(Box::new(ChannelSink::new(sender)))
        .build()
        .unwrap();

    workflow.invoke("Photosynthesis").await.unwrap();

    // Give the listener task a beat to drain.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let events: Vec<_> = receiver.drain().collect();
    assert!(!events.is_empty());
    assert!(events.iter().any(|e| e.scope_label() == STREAM_END_SCOPE));
    assert!(events.iter().any(|e| e.scope_label() == "expansion"));
    assert!(events.iter().any(|e| e.scope_label() == "generation"));
}

#[tokio::test]
async fn run_outcome_serializes_for_callers() {
    let generator = Arc::new(
        StubGenerator::new().with_subtopics(&["Light Reactions", "Dark Reactions", "Chlorophyll"]),
    );
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(generator)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("Photosynthesis").await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["state"]["subtopics"].as_array().unwrap().len(), 3);
    assert!(json["state"]["log"].as_array().unwrap().len() >= 3);
}
