use super::Reducer;
use crate::channels::Channel;
use crate::stage::StagePartial;
use crate::state::WorkflowState;

/// Replace policy for the subtopics channel.
///
/// The topic stage produces the full subtopic list in one shot; a later
/// invocation replaces it wholesale rather than accumulating.
pub struct ReplaceSubtopics;

impl Reducer for ReplaceSubtopics {
    fn apply(&self, state: &mut WorkflowState, update: &StagePartial) {
        if let Some(subtopics) = &update.subtopics {
            *state.subtopics.get_mut() = subtopics.clone();
        }
    }
}

/// Append policy for the questions channel.
///
/// Question batches accumulate across stage invocations and across the
/// parallel per-subtopic branches merged within one invocation.
pub struct AppendQuestions;

impl Reducer for AppendQuestions {
    fn apply(&self, state: &mut WorkflowState, update: &StagePartial) {
        if let Some(questions) = &update.questions {
            state.questions.get_mut().extend(questions.iter().cloned());
        }
    }
}

/// Replace policy for the retrieval channel.
///
/// Enhanced query, search hits, and hydrated documents describe a single
/// retrieval pass over the current query; they are never accumulated.
pub struct ReplaceRetrieval;

impl Reducer for ReplaceRetrieval {
    fn apply(&self, state: &mut WorkflowState, update: &StagePartial) {
        if let Some(retrieval) = &update.retrieval {
            *state.retrieval.get_mut() = retrieval.clone();
        }
    }
}

/// Append policy for the audit log.
pub struct AppendLog;

impl Reducer for AppendLog {
    fn apply(&self, state: &mut WorkflowState, update: &StagePartial) {
        if let Some(entries) = &update.log {
            state.log.get_mut().extend(entries.iter().cloned());
        }
    }
}

/// Append policy for metrics errors and warnings.
///
/// Stage invocation counters are incremented by the executor at the
/// barrier, not through partials.
pub struct MergeMetrics;

impl Reducer for MergeMetrics {
    fn apply(&self, state: &mut WorkflowState, update: &StagePartial) {
        let metrics = state.metrics.get_mut();
        if let Some(errors) = &update.errors {
            metrics.errors.extend(errors.iter().cloned());
        }
        if let Some(warnings) = &update.warnings {
            metrics.warnings.extend(warnings.iter().cloned());
        }
    }
}
