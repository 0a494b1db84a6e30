mod common;

use std::sync::Arc;

use common::fast_config;
use common::providers::StubGenerator;
use quizsmith::workflow::{WorkflowBuilder, WorkflowError};

/// A generator that expands topics fine but never produces a valid question
/// batch, while its routing fallback insists on generate_questions forever.
/// The supervisor therefore never chooses Finish on its own; only the
/// executor's turn ceiling can end the run.
fn adversarial_generator() -> Arc<StubGenerator> {
    Arc::new(
        StubGenerator::new()
            .with_subtopics(&["Alpha waves", "Beta waves", "Gamma waves"])
            .invalid_questions_for("Alpha waves")
            .invalid_questions_for("Beta waves")
            .invalid_questions_for("Gamma waves")
            .with_routing("generate_questions"),
    )
}

#[tokio::test]
async fn turn_ceiling_forces_termination_with_warning() {
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(adversarial_generator())
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("Brain waves").await.unwrap();

    assert_eq!(outcome.steps, fast_config().max_supervisor_turns);
    assert!(!outcome.success);
    assert!(outcome
        .state
        .metrics
        .warnings
        .iter()
        .any(|w| w.message.contains("recursion limit")));
    assert!(outcome
        .state
        .log
        .iter()
        .any(|e| e.stage == "executor" && e.message.contains("forcing finish")));
}

#[tokio::test]
async fn stage_invocations_are_counted() {
    let generator = Arc::new(
        StubGenerator::new().with_subtopics(&["Light Reactions", "Dark Reactions", "Chlorophyll"]),
    );
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(generator)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("Photosynthesis").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.state.metrics.invocations("topic_expansion"), 1);
    assert_eq!(outcome.state.metrics.invocations("question_generation"), 1);
    // expand + generate + final finish decision
    assert_eq!(outcome.steps, 3);
}

#[tokio::test]
async fn stage_failure_is_recorded_and_run_continues() {
    // Subtopic generation fails every attempt: the stage degrades to
    // fallback subtopics and the run still completes with questions.
    let generator = Arc::new(StubGenerator::new().with_routing("finish"));
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(generator)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("Photosynthesis").await.unwrap();

    // No subtopics configured on the stub, so expansion fell back.
    assert_eq!(outcome.state.subtopics.len(), 3);
    assert!(!outcome.state.metrics.errors.is_empty());
    assert!(outcome
        .state
        .subtopics
        .iter()
        .all(|s| s.starts_with("Photosynthesis - ")));
}

#[tokio::test]
async fn empty_input_aborts_before_the_loop() {
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(Arc::new(StubGenerator::new()))
        .build()
        .unwrap();

    let err = workflow.invoke("   ").await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput { .. }));
}

#[tokio::test]
async fn oversized_input_aborts_before_the_loop() {
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(Arc::new(StubGenerator::new()))
        .build()
        .unwrap();

    let err = workflow.invoke(&"x".repeat(4096)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput { .. }));
}

#[tokio::test]
async fn channel_versions_track_barrier_updates() {
    let generator = Arc::new(
        StubGenerator::new().with_subtopics(&["Light Reactions", "Dark Reactions", "Chlorophyll"]),
    );
    let workflow = WorkflowBuilder::topic_only()
        .with_generator(generator)
        .with_config(fast_config())
        .build()
        .unwrap();

    let outcome = workflow.invoke("Photosynthesis").await.unwrap();

    // Subtopics replaced once, questions appended once; the log moved at
    // every supervisor turn and stage barrier.
    assert_eq!(outcome.state.subtopics_version, 2);
    assert_eq!(outcome.state.questions_version, 2);
    assert!(outcome.state.log_version > outcome.state.subtopics_version);
}
