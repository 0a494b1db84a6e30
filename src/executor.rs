//! The supervisor/stage execution loop.
//!
//! The executor owns the workflow state for the duration of one run and
//! drives repeated (supervisor → stage → barrier) cycles until the
//! supervisor finishes the run or the turn ceiling forces it. Stage output
//! is merged at a barrier with each channel's declared policy, channel
//! versions are bumped once per barrier, and stage failures are recorded
//! and survived rather than propagated.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::channels::errors::{CauseChain, ErrorEvent, WarningEvent};
use crate::channels::Channel;
use crate::config::WorkflowConfig;
use crate::event_bus::{Event, STREAM_END_SCOPE};
use crate::reducers::ReducerRegistry;
use crate::stage::{Stage, StageContext, StagePartial};
use crate::state::{LogEntry, StateSnapshot, WorkflowState};
use crate::supervisor::Supervisor;
use crate::types::{ChannelType, StageKind};

const EXECUTOR: &str = "executor";

/// Result of one workflow run, always structured: provider hiccups show up
/// in `state.metrics`, not as errors from the caller's point of view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    /// Minimum viable output exists: at least one subtopic and one question.
    pub success: bool,
    /// Supervisor turns consumed.
    pub steps: u64,
    /// Final state snapshot, including the audit log and metrics.
    pub state: StateSnapshot,
}

pub(crate) struct Executor {
    stages: FxHashMap<StageKind, Arc<dyn Stage>>,
    supervisor: Supervisor,
    registry: ReducerRegistry,
    config: WorkflowConfig,
}

impl Executor {
    pub(crate) fn new(
        stages: FxHashMap<StageKind, Arc<dyn Stage>>,
        supervisor: Supervisor,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            stages,
            supervisor,
            registry: ReducerRegistry::default(),
            config,
        }
    }

    /// Run the loop to completion and return the final state.
    #[instrument(skip(self, state, events), fields(topic = %state.input_topic()))]
    pub(crate) async fn run(
        &self,
        mut state: WorkflowState,
        events: flume::Sender<Event>,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4().to_string();
        tracing::info!(run = %run_id, "workflow run started");
        let _ = events.send(Event::diagnostic("run", format!("run {run_id} started")));

        let mut steps: u64 = 0;
        let mut finished = false;

        while steps < self.config.max_supervisor_turns {
            steps += 1;
            let snapshot = state.snapshot();
            let routing = self.supervisor.decide(&snapshot).await;
            self.apply_barrier(
                &mut state,
                None,
                StagePartial::new().with_log(vec![routing.log.clone()]),
            );

            let kind = match routing.decision.stage_kind() {
                None => {
                    finished = true;
                    break;
                }
                Some(kind) => kind,
            };

            let partial = match self.stages.get(&kind) {
                Some(stage) => self.run_stage(kind, stage.as_ref(), snapshot, steps, &events).await,
                None => {
                    // A decision with no bound stage cannot make progress;
                    // record it and stop rather than spinning to the ceiling.
                    tracing::error!(stage = %kind, "no stage bound to routing decision");
                    finished = true;
                    StagePartial::new().with_errors(vec![ErrorEvent::executor(
                        run_id.clone(),
                        steps,
                        CauseChain::msg(format!("no stage bound to decision {}", routing.decision)),
                    )])
                }
            };
            self.apply_barrier(&mut state, Some(kind), partial);
            if finished {
                break;
            }
        }

        if !finished {
            tracing::warn!(
                run = %run_id,
                ceiling = self.config.max_supervisor_turns,
                "supervisor turn ceiling reached, forcing finish"
            );
            self.apply_barrier(
                &mut state,
                None,
                StagePartial::new()
                    .with_log(vec![LogEntry::new(
                        EXECUTOR,
                        "recursion limit reached, forcing finish",
                    )])
                    .with_warnings(vec![WarningEvent::new(
                        EXECUTOR,
                        format!(
                            "recursion limit of {} supervisor turns reached, run terminated",
                            self.config.max_supervisor_turns
                        ),
                    )]),
            );
        }

        let success =
            !state.subtopics.get().is_empty() && !state.questions.get().is_empty();
        tracing::info!(run = %run_id, steps, success, "workflow run finished");
        let _ = events.send(Event::diagnostic(
            STREAM_END_SCOPE,
            format!("run={run_id} status=completed steps={steps} success={success}"),
        ));

        RunOutcome {
            run_id,
            success,
            steps,
            state: state.snapshot(),
        }
    }

    /// Execute a stage, converting a stage error into an error-only patch so
    /// the run continues.
    async fn run_stage(
        &self,
        kind: StageKind,
        stage: &dyn Stage,
        snapshot: StateSnapshot,
        step: u64,
        events: &flume::Sender<Event>,
    ) -> StagePartial {
        let ctx = StageContext {
            stage_id: kind.encode().to_string(),
            step,
            event_sender: events.clone(),
        };
        match stage.run(snapshot, ctx).await {
            Ok(partial) => partial,
            Err(err) => {
                tracing::error!(stage = %kind, step, error = %err, "stage failed");
                StagePartial::new()
                    .with_log(vec![LogEntry::new(
                        kind.encode(),
                        format!("stage failed: {err}"),
                    )])
                    .with_errors(vec![ErrorEvent::stage(
                        kind.encode(),
                        step,
                        CauseChain::msg(err.to_string()),
                    )
                    .with_tag("stage")])
            }
        }
    }

    /// Merge a partial into the state, bump the touched channel versions,
    /// and count the stage invocation when one ran.
    fn apply_barrier(
        &self,
        state: &mut WorkflowState,
        ran: Option<StageKind>,
        partial: StagePartial,
    ) {
        let touched = self.registry.touched_channels(&partial);
        if let Err(err) = self.registry.apply_all(state, &partial) {
            tracing::error!(error = %err, "reducer application failed");
        }
        for channel in &touched {
            match channel {
                ChannelType::Subtopics => state.subtopics.bump_version(),
                ChannelType::Questions => state.questions.bump_version(),
                ChannelType::Retrieval => state.retrieval.bump_version(),
                ChannelType::Log => state.log.bump_version(),
                ChannelType::Metrics => state.metrics.bump_version(),
            }
        }
        if let Some(kind) = ran {
            state.metrics.get_mut().record_invocation(kind.encode());
            if !touched.contains(&ChannelType::Metrics) {
                state.metrics.bump_version();
            }
        }
        tracing::debug!(?touched, ran = ran.map(|k| k.encode()), "barrier applied");
    }
}
