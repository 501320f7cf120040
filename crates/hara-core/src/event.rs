//! Pipeline event types for progress reporting.
//!
//! The orchestrator emits these as a run moves through its stages.
//! Consumers (terminal renderer, JSONL logger) subscribe and render them.
//!
//! These are pure data types with no async runtime dependency; the
//! broadcast bus lives in `hara-runner`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// A timestamped pipeline event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl PipelineEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Coarse pipeline stage, reported with a progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    LoadScenarios,
    LoadRiskAssessment,
    Extract,
    Match,
    Determine,
    Complete,
}

impl Stage {
    /// Progress milestone reached when this stage starts.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::LoadScenarios => 20,
            Stage::LoadRiskAssessment => 30,
            Stage::Extract => 40,
            Stage::Match => 60,
            Stage::Determine => 80,
            Stage::Complete => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::LoadScenarios => write!(f, "load scenarios"),
            Stage::LoadRiskAssessment => write!(f, "load risk assessment"),
            Stage::Extract => write!(f, "extract"),
            Stage::Match => write!(f, "match"),
            Stage::Determine => write!(f, "determine"),
            Stage::Complete => write!(f, "complete"),
        }
    }
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// The specific kind of pipeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A stage started; `percent` is the overall progress milestone.
    Progress { stage: Stage, percent: u8 },

    /// Human-readable log line.
    Log { level: LogLevel, message: String },

    /// Run finished with this many result rows.
    Completed { rows: usize },

    /// Run aborted; `message` is the error as reported to the caller.
    Failed { message: String },
}

impl EventKind {
    pub fn progress(stage: Stage) -> Self {
        EventKind::Progress {
            stage,
            percent: stage.percent(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        EventKind::Log {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        EventKind::Log {
            level: LogLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        EventKind::Log {
            level: LogLevel::Error,
            message: message.into(),
        }
    }

    /// Whether this event ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Completed { .. } | EventKind::Failed { .. })
    }
}

/// Receiver of pipeline events.
///
/// Implementations must never block the pipeline for long; emitting with no
/// listener is fine.
pub trait EventSink: Send + Sync {
    fn emit(&self, kind: EventKind);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _kind: EventKind) {}
}

/// Collects events in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the kinds recorded so far.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events
            .lock()
            .map(|events| events.iter().map(|e| e.kind.clone()).collect())
            .unwrap_or_default()
    }

    /// Progress percentages in emission order.
    pub fn progress(&self) -> Vec<u8> {
        self.kinds()
            .into_iter()
            .filter_map(|k| match k {
                EventKind::Progress { percent, .. } => Some(percent),
                _ => None,
            })
            .collect()
    }

    /// Log messages in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.kinds()
            .into_iter()
            .filter_map(|k| match k {
                EventKind::Log { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, kind: EventKind) {
        if let Ok(mut events) = self.events.lock() {
            events.push(PipelineEvent::new(kind));
        }
    }
}
