//! Query enhancement, vector search, and document hydration.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::channels::errors::{CauseChain, ErrorEvent, WarningEvent};
use crate::config::WorkflowConfig;
use crate::providers::{DocumentStore, Embedder, TextGenerator, VectorSearch};
use crate::stage::{Stage, StageContext, StageError, StagePartial};
use crate::state::{LogEntry, StateSnapshot};
use crate::types::RetrievalSet;

/// Rewrites the raw query into a denser search query, fetches the top-K
/// most similar stored chunks, and hydrates them into full documents.
///
/// Enhancement is best-effort with no retry: on failure the raw query is
/// used unmodified, and the log says so explicitly. Provider failures in
/// the search path degrade to an empty result set rather than failing the
/// stage; the retrieval set is still marked attempted so the supervisor
/// moves on. Zero retrieved chunks is not an error; downstream stages run
/// without grounding context.
pub struct DocumentRetrievalStage {
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn VectorSearch>,
    store: Arc<dyn DocumentStore>,
    top_k: usize,
}

impl DocumentRetrievalStage {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn VectorSearch>,
        store: Arc<dyn DocumentStore>,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            generator,
            embedder,
            search,
            store,
            top_k: config.top_k,
        }
    }

    fn enhancement_prompt(query: &str) -> String {
        format!(
            "Rewrite this search query to be denser and more specific. Expand \
             abbreviations and add close synonyms, but preserve the intent. \
             Respond with the rewritten query only.\n\nQuery: {query}"
        )
    }

    /// Best-effort enhancement. Returns the query to search with plus the
    /// log entry describing which path was taken.
    async fn enhance(&self, ctx: &StageContext, raw: &str) -> (String, LogEntry, Option<ErrorEvent>) {
        match self.generator.generate(&Self::enhancement_prompt(raw)).await {
            Ok(enhanced) if !enhanced.trim().is_empty() => {
                let enhanced = enhanced.trim().to_string();
                let log = LogEntry::new(
                    ctx.stage_id.clone(),
                    format!("query enhanced: \"{raw}\" -> \"{enhanced}\""),
                );
                (enhanced, log, None)
            }
            Ok(_) => {
                let log = LogEntry::new(
                    ctx.stage_id.clone(),
                    "query enhancement returned empty output, using raw query unmodified",
                );
                (raw.to_string(), log, None)
            }
            Err(err) => {
                let log = LogEntry::new(
                    ctx.stage_id.clone(),
                    "query enhancement failed, using raw query unmodified",
                );
                let event = ErrorEvent::stage(
                    ctx.stage_id.clone(),
                    ctx.step,
                    CauseChain::msg(err.to_string()),
                )
                .with_tag("provider")
                .with_context(json!({"operation": "enhance_query"}));
                (raw.to_string(), log, Some(event))
            }
        }
    }
}

#[async_trait]
impl Stage for DocumentRetrievalStage {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: StageContext,
    ) -> Result<StagePartial, StageError> {
        let raw = snapshot.input_topic.clone();
        let mut partial = StagePartial::new();

        let (query, enhance_log, enhance_error) = self.enhance(&ctx, &raw).await;
        partial.push_log(enhance_log);
        if let Some(event) = enhance_error {
            partial.push_error(event);
        }

        let hits = match self.embedder.embed(&query).await {
            Ok(vector) => match self.search.search(&vector, self.top_k, None).await {
                Ok(hits) => hits,
                Err(err) => {
                    partial.push_error(
                        ErrorEvent::stage(ctx.stage_id.clone(), ctx.step, CauseChain::msg(err.to_string()))
                            .with_tag("provider")
                            .with_context(json!({"operation": "vector_search"})),
                    );
                    Vec::new()
                }
            },
            Err(err) => {
                partial.push_error(
                    ErrorEvent::stage(ctx.stage_id.clone(), ctx.step, CauseChain::msg(err.to_string()))
                        .with_tag("provider")
                        .with_context(json!({"operation": "embed_query"})),
                );
                Vec::new()
            }
        };

        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let documents = if ids.is_empty() {
            Vec::new()
        } else {
            // Hydration drops tombstoned ids without error.
            match self.store.fetch_by_ids(&ids).await {
                Ok(documents) => documents,
                Err(err) => {
                    partial.push_error(
                        ErrorEvent::stage(ctx.stage_id.clone(), ctx.step, CauseChain::msg(err.to_string()))
                            .with_tag("provider")
                            .with_context(json!({"operation": "fetch_by_ids"})),
                    );
                    Vec::new()
                }
            }
        };

        if documents.is_empty() {
            ctx.emit("retrieval", "no documents retrieved, continuing without grounding")?;
            partial.push_log(LogEntry::new(
                ctx.stage_id.clone(),
                "no documents retrieved, downstream stages run without grounding context",
            ));
            partial.push_warning(WarningEvent::new(
                ctx.stage_id.clone(),
                "retrieval produced no documents",
            ));
        } else {
            ctx.emit(
                "retrieval",
                format!("retrieved {} of up to {} chunks", documents.len(), self.top_k),
            )?;
            partial.push_log(LogEntry::new(
                ctx.stage_id.clone(),
                format!("retrieved {} chunks for query \"{query}\"", documents.len()),
            ));
        }

        partial.retrieval = Some(RetrievalSet {
            enhanced_query: Some(query),
            retrieved: hits,
            documents,
        });
        Ok(partial)
    }
}
