//! Per-subtopic question generation with concurrent fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::json;

use super::RetryPolicy;
use crate::channels::errors::{CauseChain, ErrorEvent, WarningEvent};
use crate::config::WorkflowConfig;
use crate::providers::decode::{decode_question_batch, question_batch_schema, QuestionBatch};
use crate::providers::{ProviderError, TextGenerator};
use crate::stage::{Stage, StageContext, StageError, StagePartial};
use crate::state::{LogEntry, StateSnapshot};

/// Generates a batch of questions for every subtopic.
///
/// Each subtopic gets its own concurrent task with an independent retry
/// budget. Tasks are joined in subtopic order, so the merged question list
/// groups by subtopic in list order no matter which task finishes first.
/// A task that exhausts its retries contributes zero questions and one
/// warning; the other tasks are unaffected. Partial success is a
/// first-class outcome.
pub struct QuestionGenerationStage {
    generator: Arc<dyn TextGenerator>,
    questions_per_subtopic: usize,
    retry: RetryPolicy,
}

impl QuestionGenerationStage {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &WorkflowConfig) -> Self {
        Self {
            generator,
            questions_per_subtopic: config.questions_per_subtopic,
            retry: RetryPolicy {
                attempts: config.max_retries,
                base_delay: config.retry_backoff,
            },
        }
    }

    fn prompt(&self, topic: &str, subtopic: &str, context: &str) -> String {
        let mut prompt = format!(
            "Write {count} multiple-choice quiz questions about \"{subtopic}\" \
             (part of the broader topic \"{topic}\"). Each question needs four \
             options keyed A-D, the correct option key, and an explanation of \
             at least one sentence. Respond with a JSON array of question \
             objects.",
            count = self.questions_per_subtopic,
        );
        if !context.is_empty() {
            prompt.push_str("\n\nBase the questions on this source material:\n");
            prompt.push_str(context);
        }
        prompt
    }

    /// One task: generate, decode, and validate the batch for a subtopic.
    /// An envelope that decodes to zero valid questions counts as a failed
    /// attempt so the retry budget gets a chance to recover it.
    async fn generate_for_subtopic(
        &self,
        topic: &str,
        subtopic: &str,
        context: &str,
    ) -> Result<QuestionBatch, ProviderError> {
        let prompt = self.prompt(topic, subtopic, context);
        let schema = question_batch_schema(self.questions_per_subtopic);

        self.retry
            .run(|_attempt| {
                let generator = Arc::clone(&self.generator);
                let prompt = prompt.clone();
                let schema = schema.clone();
                let subtopic = subtopic.to_string();
                async move {
                    let value = generator.generate_structured(&prompt, &schema).await?;
                    let batch = decode_question_batch(&value, &subtopic)?;
                    if batch.questions.is_empty() {
                        return Err(ProviderError::decode(
                            "text_generator",
                            format!("no structurally valid questions for \"{subtopic}\""),
                        ));
                    }
                    Ok(batch)
                }
            })
            .await
    }
}

#[async_trait]
impl Stage for QuestionGenerationStage {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: StageContext,
    ) -> Result<StagePartial, StageError> {
        if snapshot.subtopics.is_empty() {
            return Err(StageError::MissingInput { what: "subtopics" });
        }

        ctx.emit(
            "generation",
            format!("generating questions for {} subtopics", snapshot.subtopics.len()),
        )?;

        let context = snapshot.grounding_context();
        let topic = snapshot.input_topic.as_str();

        // join_all resolves in input order, which fixes the merge order to
        // the subtopic list regardless of completion timing.
        let outcomes = join_all(
            snapshot
                .subtopics
                .iter()
                .map(|subtopic| self.generate_for_subtopic(topic, subtopic, &context)),
        )
        .await;

        let mut partial = StagePartial::new();
        let mut questions = Vec::new();
        let mut failed_subtopics = 0usize;
        let mut dropped = 0usize;

        for (subtopic, outcome) in snapshot.subtopics.iter().zip(outcomes) {
            match outcome {
                Ok(batch) => {
                    dropped += batch.dropped;
                    questions.extend(batch.questions);
                }
                Err(err) => {
                    failed_subtopics += 1;
                    partial.push_warning(WarningEvent::new(
                        ctx.stage_id.clone(),
                        format!("no questions generated for subtopic \"{subtopic}\""),
                    ));
                    partial.push_error(
                        ErrorEvent::stage(
                            ctx.stage_id.clone(),
                            ctx.step,
                            CauseChain::msg(err.to_string()),
                        )
                        .with_tag("provider")
                        .with_context(json!({"subtopic": subtopic})),
                    );
                }
            }
        }

        let expected = snapshot.subtopics.len() * self.questions_per_subtopic;
        if questions.len() < expected {
            partial.push_warning(WarningEvent::new(
                ctx.stage_id.clone(),
                format!(
                    "generated {} of {} expected questions ({} subtopic tasks failed, {} invalid questions dropped)",
                    questions.len(),
                    expected,
                    failed_subtopics,
                    dropped
                ),
            ));
        }

        ctx.emit(
            "generation",
            format!(
                "generated {} questions across {} subtopics",
                questions.len(),
                snapshot.subtopics.len() - failed_subtopics
            ),
        )?;
        partial.push_log(LogEntry::new(
            ctx.stage_id.clone(),
            format!(
                "generated {} questions across {} of {} subtopics",
                questions.len(),
                snapshot.subtopics.len() - failed_subtopics,
                snapshot.subtopics.len()
            ),
        ));
        if !questions.is_empty() {
            partial.questions = Some(questions);
        }
        Ok(partial)
    }
}
