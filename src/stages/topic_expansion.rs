//! Topic expansion: input topic → bounded list of distinct subtopics.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::RetryPolicy;
use crate::channels::errors::{CauseChain, ErrorEvent};
use crate::config::WorkflowConfig;
use crate::providers::decode::{decode_subtopics, subtopic_list_schema};
use crate::providers::TextGenerator;
use crate::stage::{Stage, StageContext, StageError, StagePartial};
use crate::state::{LogEntry, StateSnapshot};

/// Generates `min_subtopics..=max_subtopics` subtopics for the input topic.
///
/// Provider or validation failures are retried with backoff; once retries
/// are exhausted the stage synthesizes three deterministic placeholder
/// subtopics so downstream stages always have input. Forward progress wins
/// over subtopic quality here.
pub struct TopicExpansionStage {
    generator: Arc<dyn TextGenerator>,
    min_subtopics: usize,
    max_subtopics: usize,
    retry: RetryPolicy,
}

impl TopicExpansionStage {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &WorkflowConfig) -> Self {
        Self {
            generator,
            min_subtopics: config.min_subtopics,
            max_subtopics: config.max_subtopics,
            retry: RetryPolicy {
                attempts: config.max_retries,
                base_delay: config.retry_backoff,
            },
        }
    }

    fn prompt(&self, snapshot: &StateSnapshot) -> String {
        let mut prompt = format!(
            "Break the topic \"{}\" into {} to {} distinct subtopics suitable \
             for scoping quiz questions. Respond with a JSON array of strings.",
            snapshot.input_topic, self.min_subtopics, self.max_subtopics
        );
        let context = snapshot.grounding_context();
        if !context.is_empty() {
            prompt.push_str("\n\nGround the subtopics in this source material:\n");
            prompt.push_str(&context);
        }
        prompt
    }

    fn fallback_subtopics(topic: &str) -> Vec<String> {
        vec![
            format!("{topic} - Fundamentals"),
            format!("{topic} - Advanced Concepts"),
            format!("{topic} - Practical Applications"),
        ]
    }
}

#[async_trait]
impl Stage for TopicExpansionStage {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: StageContext,
    ) -> Result<StagePartial, StageError> {
        ctx.emit("expansion", format!("expanding topic \"{}\"", snapshot.input_topic))?;

        let prompt = self.prompt(&snapshot);
        let schema = subtopic_list_schema(self.min_subtopics, self.max_subtopics);

        let generated = self
            .retry
            .run(|_attempt| {
                let generator = Arc::clone(&self.generator);
                let prompt = prompt.clone();
                let schema = schema.clone();
                let (min, max) = (self.min_subtopics, self.max_subtopics);
                async move {
                    let value = generator.generate_structured(&prompt, &schema).await?;
                    decode_subtopics(&value, min, max)
                }
            })
            .await;

        let mut partial = StagePartial::new();
        match generated {
            Ok(subtopics) => {
                ctx.emit("expansion", format!("generated {} subtopics", subtopics.len()))?;
                partial.push_log(LogEntry::new(
                    ctx.stage_id.clone(),
                    format!("generated {} subtopics", subtopics.len()),
                ));
                partial.subtopics = Some(subtopics);
            }
            Err(err) => {
                let fallback = Self::fallback_subtopics(&snapshot.input_topic);
                ctx.emit(
                    "expansion",
                    format!("generation failed, falling back to {} placeholder subtopics", fallback.len()),
                )?;
                partial.push_log(LogEntry::new(
                    ctx.stage_id.clone(),
                    format!(
                        "subtopic generation failed after {} attempts, using {} fallback subtopics",
                        self.retry.attempts,
                        fallback.len()
                    ),
                ));
                partial.push_error(
                    ErrorEvent::stage(ctx.stage_id.clone(), ctx.step, CauseChain::msg(err.to_string()))
                        .with_tag("provider")
                        .with_context(json!({"topic": snapshot.input_topic})),
                );
                partial.subtopics = Some(fallback);
            }
        }
        Ok(partial)
    }
}
