//! Event bus utilities: a flume-backed channel with pluggable sinks.
//!
//! Stages and the executor emit [`Event`]s through a cloneable sender; a
//! listener task drains them into the configured [`EventSink`]s. The default
//! sink logs through `tracing`; a [`ChannelSink`] forwards events to an
//! external consumer (SSE handler, test harness), and a [`MemorySink`]
//! captures them for assertions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Scope label of the diagnostic event emitted when a run finishes.
pub const STREAM_END_SCOPE: &str = "__quizsmith_stream_end__";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Stage(StageEvent),
    Diagnostic(DiagnosticEvent),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageEvent {
    pub stage_id: Option<String>,
    pub step: Option<u64>,
    pub scope: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
}

impl Event {
    pub fn stage_message(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Stage(StageEvent {
            stage_id: None,
            step: None,
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn stage_message_with_meta(
        stage_id: impl Into<String>,
        step: u64,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Stage(StageEvent {
            stage_id: Some(stage_id.into()),
            step: Some(step),
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn scope_label(&self) -> &str {
        match self {
            Event::Stage(e) => &e.scope,
            Event::Diagnostic(e) => &e.scope,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Stage(e) => &e.message,
            Event::Diagnostic(e) => &e.message,
        }
    }
}

/// Receives every event drained by the bus listener.
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &Event);
}

/// Logs events through `tracing` at info level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn handle(&self, event: &Event) {
        tracing::info!(
            target: "quizsmith::events",
            scope = %event.scope_label(),
            message = %event.message(),
            "event"
        );
    }
}

/// Captures events in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().expect("memory sink poisoned"))
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().expect("memory sink poisoned").clone()
    }
}

impl EventSink for Arc<MemorySink> {
    fn handle(&self, event: &Event) {
        self.events
            .lock()
            .expect("memory sink poisoned")
            .push(event.clone());
    }
}

/// Forwards events to an external flume channel.
pub struct ChannelSink {
    sender: flume::Sender<Event>,
}

impl ChannelSink {
    pub fn new(sender: flume::Sender<Event>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn handle(&self, event: &Event) {
        // Receiver may have hung up; losing observability events is fine.
        let _ = self.sender.send(event.clone());
    }
}

/// Owns the event channel and fans incoming events out to sinks.
pub struct EventBus {
    sender: flume::Sender<Event>,
    receiver: flume::Receiver<Event>,
    sinks: Arc<Vec<Box<dyn EventSink>>>,
    listener_started: AtomicBool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sinks(vec![Box::new(TracingSink)])
    }
}

impl EventBus {
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            sinks: Arc::new(sinks),
            listener_started: AtomicBool::new(false),
        }
    }

    /// Cloneable sender handed to stage contexts.
    pub fn sender(&self) -> flume::Sender<Event> {
        self.sender.clone()
    }

    /// Start the drain task. Idempotent; must be called from within a tokio
    /// runtime. The task ends when every sender is dropped.
    pub fn listen_for_events(&self) {
        if self.listener_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let receiver = self.receiver.clone();
        let sinks = Arc::clone(&self.sinks);
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                for sink in sinks.iter() {
                    sink.handle(&event);
                }
            }
        });
    }
}
