//! Supervisor routing policy.
//!
//! The supervisor is a decision function `StateSnapshot -> RoutingDecision`
//! with a two-tier policy: deterministic rules first, and an LLM-backed
//! fallback only for states the rules decline. The rule tier is pure
//! (identical snapshots always produce identical decisions) and the
//! fallback is constrained to a closed decision set, bounded by the
//! executor's step ceiling regardless of what it answers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::providers::decode::routing_decision_schema;
use crate::providers::TextGenerator;
use crate::state::{LogEntry, StateSnapshot};
use crate::types::StageKind;

/// Where the run goes next. Recomputed on every supervisor turn; never
/// stored in a state channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingDecision {
    ExpandTopics,
    RetrieveDocuments,
    GenerateQuestions,
    Finish,
}

impl RoutingDecision {
    /// The stage bound to this decision, if any.
    #[must_use]
    pub fn stage_kind(&self) -> Option<StageKind> {
        match self {
            RoutingDecision::ExpandTopics => Some(StageKind::TopicExpansion),
            RoutingDecision::RetrieveDocuments => Some(StageKind::DocumentRetrieval),
            RoutingDecision::GenerateQuestions => Some(StageKind::QuestionGeneration),
            RoutingDecision::Finish => None,
        }
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoutingDecision::ExpandTopics => "expand_topics",
            RoutingDecision::RetrieveDocuments => "retrieve_documents",
            RoutingDecision::GenerateQuestions => "generate_questions",
            RoutingDecision::Finish => "finish",
        };
        write!(f, "{s}")
    }
}

/// Which workflow shape is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowVariant {
    /// Topic in, quiz out; no document grounding.
    TopicOnly,
    /// Fixed forward order: enhance → retrieve → expand → generate.
    RetrievalAugmented,
}

/// A routing decision plus the supervisor's log entry explaining it.
#[derive(Clone, Debug)]
pub struct Routing {
    pub decision: RoutingDecision,
    pub log: LogEntry,
}

const SUPERVISOR: &str = "supervisor";

/// Deterministic-first router over the workflow state.
pub struct Supervisor {
    variant: WorkflowVariant,
    log_window: usize,
    fallback: Option<Arc<dyn TextGenerator>>,
}

impl Supervisor {
    pub fn new(variant: WorkflowVariant, log_window: usize) -> Self {
        Self {
            variant,
            log_window,
            fallback: None,
        }
    }

    /// Attach the generator used for the ambiguous-state fallback. Without
    /// one, ambiguous states finish immediately.
    #[must_use]
    pub fn with_fallback(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.fallback = Some(generator);
        self
    }

    #[must_use]
    pub fn variant(&self) -> WorkflowVariant {
        self.variant
    }

    /// Decide the next step for the given snapshot.
    ///
    /// Rule priority (first match wins):
    /// 1. any questions exist → finish
    /// 2. (retrieval variant) retrieval not yet attempted → retrieve
    /// 3. no subtopics → expand
    /// 4. subtopics present, no questions, generation not yet attempted →
    ///    generate
    /// 5. otherwise ambiguous (generation already ran and produced nothing)
    ///    → constrained LLM fallback; on provider failure, finish
    pub async fn decide(&self, snapshot: &StateSnapshot) -> Routing {
        if let Some((decision, reason)) = self.rule_tier(snapshot) {
            tracing::debug!(decision = %decision, reason, "supervisor rule matched");
            return Routing {
                decision,
                log: LogEntry::new(SUPERVISOR, format!("{decision}: {reason}")),
            };
        }

        let (decision, reason) = self.fallback_tier(snapshot).await;
        tracing::debug!(decision = %decision, reason = %reason, "supervisor fallback decided");
        Routing {
            decision,
            log: LogEntry::new(SUPERVISOR, format!("{decision}: {reason}")),
        }
    }

    fn rule_tier(&self, snapshot: &StateSnapshot) -> Option<(RoutingDecision, &'static str)> {
        if !snapshot.questions.is_empty() {
            return Some((RoutingDecision::Finish, "questions present, run complete"));
        }
        if self.variant == WorkflowVariant::RetrievalAugmented && !snapshot.retrieval.attempted() {
            return Some((
                RoutingDecision::RetrieveDocuments,
                "retrieval not yet attempted",
            ));
        }
        if snapshot.subtopics.is_empty() {
            return Some((RoutingDecision::ExpandTopics, "no subtopics yet"));
        }
        if snapshot
            .metrics
            .invocations(StageKind::QuestionGeneration.encode())
            == 0
        {
            return Some((
                RoutingDecision::GenerateQuestions,
                "subtopics ready, no questions yet",
            ));
        }
        // Generation already ran and still no questions: the rules have no
        // opinion, hand over to the fallback tier.
        None
    }

    async fn fallback_tier(&self, snapshot: &StateSnapshot) -> (RoutingDecision, String) {
        let Some(generator) = &self.fallback else {
            return (
                RoutingDecision::Finish,
                "ambiguous state and no fallback generator configured".to_string(),
            );
        };

        let prompt = self.fallback_prompt(snapshot);
        let decided = generator
            .generate_structured(&prompt, &routing_decision_schema())
            .await
            .ok()
            .and_then(|value| decode_fallback_decision(&value));

        match decided {
            Some(decision) => (decision, "ambiguous state, generator decided".to_string()),
            None => (
                RoutingDecision::Finish,
                "ambiguous state and fallback generator failed, finishing".to_string(),
            ),
        }
    }

    fn fallback_prompt(&self, snapshot: &StateSnapshot) -> String {
        let mut prompt = String::from(
            "You are routing a quiz-generation workflow. Based on the recent \
             execution log, answer with one of: expand_topics, \
             generate_questions, finish.\n\nRecent log:\n",
        );
        for entry in snapshot.log_tail(self.log_window) {
            prompt.push_str(&format!("- [{}] {}\n", entry.stage, entry.message));
        }
        prompt.push_str(&format!(
            "\nSubtopics: {}. Questions so far: {}.\n",
            snapshot.subtopics.len(),
            snapshot.questions.len()
        ));
        prompt
    }
}

/// Decode the fallback's constrained decision. `RetrieveDocuments` is
/// deliberately not accepted; the fallback only ever runs after retrieval
/// and expansion have been attempted.
fn decode_fallback_decision(value: &serde_json::Value) -> Option<RoutingDecision> {
    match value.get("decision")?.as_str()? {
        "expand_topics" => Some(RoutingDecision::ExpandTopics),
        "generate_questions" => Some(RoutingDecision::GenerateQuestions),
        "finish" => Some(RoutingDecision::Finish),
        _ => None,
    }
}
