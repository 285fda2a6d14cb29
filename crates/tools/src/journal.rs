//! Bounded journal of tool invocations.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// Default number of records retained.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallOutcome {
    Ok { result: Value },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub at: DateTime<Utc>,
    pub tool: String,
    pub input: Value,
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

impl ToolCallRecord {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, CallOutcome::Error { .. })
    }

    /// One-line rendering: `12:00:01 add_todo({...}) → {...}`.
    pub fn summary_line(&self) -> String {
        let time = self.at.format("%H:%M:%S");
        match &self.outcome {
            CallOutcome::Ok { result } => {
                let rendered = match result {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{time} {}({}) → {rendered}", self.tool, self.input)
            }
            CallOutcome::Error { message } => {
                format!("{time} {}({}) → ERROR: {message}", self.tool, self.input)
            }
        }
    }
}

/// Cloneable handle to a newest-first, capacity-bounded call log.
///
/// Every record is also emitted through `tracing`, so the journal works as
/// an in-process view of what the log already contains.
#[derive(Debug, Clone)]
pub struct CallJournal {
    inner: Arc<Mutex<VecDeque<ToolCallRecord>>>,
    capacity: usize,
}

impl Default for CallJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl CallJournal {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn record_ok(&self, tool: &str, input: Value, result: Value) {
        info!(tool, input = %input, result = %result, "tool call succeeded");
        self.push(ToolCallRecord {
            at: Utc::now(),
            tool: tool.to_string(),
            input,
            outcome: CallOutcome::Ok { result },
        });
    }

    pub fn record_error(&self, tool: &str, input: Value, message: impl Into<String>) {
        let message = message.into();
        warn!(tool, input = %input, error = %message, "tool call failed");
        self.push(ToolCallRecord {
            at: Utc::now(),
            tool: tool.to_string(),
            input,
            outcome: CallOutcome::Error { message },
        });
    }

    fn push(&self, record: ToolCallRecord) {
        let mut entries = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        entries.push_front(record);
        entries.truncate(self.capacity);
    }

    /// Records, newest first.
    pub fn entries(&self) -> Vec<ToolCallRecord> {
        let entries = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
