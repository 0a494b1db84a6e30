use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a recoverable failure recorded during a workflow run.
///
/// Error events never abort a run by themselves; they accumulate in the
/// metrics channel and are returned to the caller for inspection. Fatal
/// conditions (invalid input) surface as `WorkflowError` instead.
///
/// # JSON Serialization Format
///
/// ```json
/// {
///   "when": "2026-08-06T10:30:00Z",
///   "scope": {
///     "scope": "stage",
///     "stage": "topic_expansion",
///     "step": 2
///   },
///   "error": {
///     "message": "provider request failed",
///     "cause": { "message": "connection refused", "cause": null, "details": null },
///     "details": { "attempts": 2 }
///   },
///   "tags": ["provider", "retried"],
///   "context": { "topic": "Photosynthesis" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub scope: ErrorScope,
    #[serde(default)]
    pub error: CauseChain,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl ErrorEvent {
    /// Create a stage-scoped error event.
    pub fn stage<S: Into<String>>(stage: S, step: u64, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Stage {
                stage: stage.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create a supervisor-scoped error event.
    pub fn supervisor(step: u64, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Supervisor { step },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create an executor-scoped error event.
    pub fn executor<S: Into<String>>(run: S, step: u64, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Executor {
                run: run.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create a provider-scoped error event.
    pub fn provider<S: Into<String>>(provider: S, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Provider {
                provider: provider.into(),
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Stage {
        stage: String,
        step: u64,
    },
    Supervisor {
        step: u64,
    },
    Executor {
        run: String,
        step: u64,
    },
    Provider {
        provider: String,
    },
    #[default]
    App,
}

/// Error message with an optional chain of causes and structured details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CauseChain {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<CauseChain>>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Default for CauseChain {
    fn default() -> Self {
        CauseChain {
            message: String::new(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for CauseChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CauseChain {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &dyn std::error::Error)
    }
}

impl CauseChain {
    pub fn msg<M: Into<String>>(m: M) -> Self {
        CauseChain {
            message: m.into(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_cause(mut self, cause: CauseChain) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// A non-fatal degradation notice: the run carried on, but produced less
/// than it was asked for (fallback subtopics, a failed subtopic, a shortfall
/// against the expected question count, the forced recursion stop).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarningEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    pub stage: String,
    pub message: String,
}

impl WarningEvent {
    pub fn new<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self {
            when: Utc::now(),
            stage: stage.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_event_serializes_with_tagged_scope() {
        let event = ErrorEvent::stage("topic_expansion", 2, CauseChain::msg("boom"))
            .with_tag("provider")
            .with_context(json!({"topic": "Photosynthesis"}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["scope"]["scope"], "stage");
        assert_eq!(value["scope"]["stage"], "topic_expansion");
        assert_eq!(value["error"]["message"], "boom");
        assert_eq!(value["tags"][0], "provider");
    }

    #[test]
    fn cause_chain_source_walks_causes() {
        let chain = CauseChain::msg("outer").with_cause(CauseChain::msg("inner"));
        let source = std::error::Error::source(&chain).unwrap();
        assert_eq!(source.to_string(), "inner");
    }
}
