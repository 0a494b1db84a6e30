use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::{
    AppendLog, AppendQuestions, MergeMetrics, Reducer, ReducerError, ReplaceRetrieval,
    ReplaceSubtopics,
};
use crate::stage::StagePartial;
use crate::state::WorkflowState;
use crate::types::ChannelType;

/// Maps each channel to its merge policy.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ChannelType, Vec<Arc<dyn Reducer>>>,
}

/// Guard that checks whether a StagePartial actually has meaningful data
/// for the specified channel, so the registry can skip reducers with
/// nothing to do.
pub(crate) fn channel_guard(channel: &ChannelType, partial: &StagePartial) -> bool {
    match channel {
        ChannelType::Subtopics => partial.subtopics.is_some(),
        ChannelType::Questions => partial
            .questions
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false),
        ChannelType::Retrieval => partial.retrieval.is_some(),
        ChannelType::Log => partial
            .log
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false),
        ChannelType::Metrics => {
            let errors = partial
                .errors
                .as_ref()
                .map(|v| !v.is_empty())
                .unwrap_or(false);
            let warnings = partial
                .warnings
                .as_ref()
                .map(|v| !v.is_empty())
                .unwrap_or(false);
            errors || warnings
        }
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register(ChannelType::Subtopics, Arc::new(ReplaceSubtopics))
            .register(ChannelType::Questions, Arc::new(AppendQuestions))
            .register(ChannelType::Retrieval, Arc::new(ReplaceRetrieval))
            .register(ChannelType::Log, Arc::new(AppendLog))
            .register(ChannelType::Metrics, Arc::new(MergeMetrics));
        registry
    }
}

impl ReducerRegistry {
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Registers a reducer for a channel. Multiple reducers on one channel
    /// are applied in registration order.
    pub fn register(&mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducer_map.entry(channel).or_default().push(reducer);
        self
    }

    /// Which channels a partial would touch, per the guard.
    pub fn touched_channels(&self, partial: &StagePartial) -> Vec<ChannelType> {
        [
            ChannelType::Subtopics,
            ChannelType::Questions,
            ChannelType::Retrieval,
            ChannelType::Log,
            ChannelType::Metrics,
        ]
        .into_iter()
        .filter(|c| channel_guard(c, partial))
        .collect()
    }

    pub fn try_update(
        &self,
        channel_type: ChannelType,
        state: &mut WorkflowState,
        to_update: &StagePartial,
    ) -> Result<(), ReducerError> {
        // Skip if the partial has no applicable data for this channel.
        if !channel_guard(&channel_type, to_update) {
            return Ok(());
        }

        if let Some(reducers) = self.reducer_map.get(&channel_type) {
            for reducer in reducers {
                reducer.apply(state, to_update);
            }
            Ok(())
        } else {
            Err(ReducerError::UnknownChannel(channel_type))
        }
    }

    pub fn apply_all(
        &self,
        state: &mut WorkflowState,
        merged_updates: &StagePartial,
    ) -> Result<(), ReducerError> {
        // Iterate all registered channels; try_update skips via guard when
        // there is no data.
        for channel in self.reducer_map.keys() {
            self.try_update(*channel, state, merged_updates)?;
        }
        Ok(())
    }
}
