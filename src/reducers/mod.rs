//! State merge policies.
//!
//! Each channel has exactly one declared merge policy, applied at every
//! barrier by the [`ReducerRegistry`]:
//!
//! | channel   | policy            | reducer             |
//! |-----------|-------------------|---------------------|
//! | subtopics | replace           | [`ReplaceSubtopics`] |
//! | questions | append            | [`AppendQuestions`] |
//! | retrieval | replace           | [`ReplaceRetrieval`] |
//! | log       | append            | [`AppendLog`]       |
//! | metrics   | append/increment  | [`MergeMetrics`]    |
//!
//! Reducers mutate the state payloads only; version bumps happen once per
//! barrier in the executor, after change detection.

mod policies;
mod registry;

pub use policies::{AppendLog, AppendQuestions, MergeMetrics, ReplaceRetrieval, ReplaceSubtopics};
pub use registry::ReducerRegistry;

use crate::stage::StagePartial;
use crate::state::WorkflowState;
use crate::types::ChannelType;
use std::fmt;

/// Unified reducer trait: every reducer mutates `WorkflowState` using a
/// `StagePartial` delta.
pub trait Reducer: Send + Sync {
    fn apply(&self, state: &mut WorkflowState, update: &StagePartial);
}

#[derive(Debug)]
pub enum ReducerError {
    UnknownChannel(ChannelType),
}

impl fmt::Display for ReducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerError::UnknownChannel(channel) => {
                write!(f, "no reducers registered for channel: {channel}")
            }
        }
    }
}

impl std::error::Error for ReducerError {}
