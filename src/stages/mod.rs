//! Workflow stage implementations.

mod question_generation;
mod retrieval;
mod topic_expansion;

pub use question_generation::QuestionGenerationStage;
pub use retrieval::DocumentRetrievalStage;
pub use topic_expansion::TopicExpansionStage;

use std::future::Future;
use std::time::Duration;

use crate::providers::ProviderError;

/// Bounded retry with linearly increasing backoff.
///
/// Attempt `n` (1-based) is followed, on failure, by a `n * base_delay`
/// sleep before the next attempt. The last error is returned when every
/// attempt fails.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub(crate) async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.attempts.max(1);
        let mut last_error: Option<ProviderError> = None;
        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::warn!(attempt, attempts, error = %err, "provider call failed");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(self.base_delay * attempt).await;
                    }
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| ProviderError::request("retry", "no attempts configured")))
    }
}
