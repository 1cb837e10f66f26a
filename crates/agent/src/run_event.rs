//! Observable run events.
//!
//! The loop forwards these to the caller as they are produced, so a
//! consumer can render text and tool activity incrementally. The wire
//! shape is a discriminated record keyed on `type`.

use serde::{Deserialize, Serialize};

/// One observable event in a run's output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A fragment of assistant text, emitted as it streams.
    Response { content: String },

    /// The model requested a tool call.
    ToolCall {
        name: String,
        args: serde_json::Value,
        id: String,
    },

    /// A tool call finished; `result` is the full dispatch outcome.
    ToolResult {
        name: String,
        result: serde_json::Value,
        id: String,
    },

    /// An unrecoverable transport or protocol failure.
    Error { message: String },

    /// The run ended. Always the final event, exactly once per run.
    Done { iterations: u32 },
}

impl RunEvent {
    /// The discriminant string as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            RunEvent::Response { .. } => "response",
            RunEvent::ToolCall { .. } => "tool_call",
            RunEvent::ToolResult { .. } => "tool_result",
            RunEvent::Error { .. } => "error",
            RunEvent::Done { .. } => "done",
        }
    }
}
