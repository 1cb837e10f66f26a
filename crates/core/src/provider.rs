//! Provider trait — the abstraction over streaming LLM backends.
//!
//! A Provider sends one conversation turn to a model endpoint and
//! normalizes that endpoint's wire format into the canonical
//! [`ModelEvent`] stream. Each wire format (OpenAI-compatible SSE,
//! Anthropic typed SSE, Ollama NDJSON) is one implementation behind this
//! trait; the agent loop never branches on which one it is talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// Sentinel error text placed into [`ToolCallRequest::arguments`] when the
/// streamed argument fragments do not decode as JSON (typically a response
/// truncated mid-stream). Downstream logic reacts to this instead of the
/// normalizer raising.
pub const ARGUMENT_DECODE_ERROR: &str = "Failed to parse tool call arguments";

/// One model turn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514", "gpt-4o")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

pub(crate) fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A finalized tool call requested by the model.
///
/// Built incrementally from streaming fragments; immutable once flushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned opaque call ID
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Decoded arguments. Carries the decode-failure sentinel object
    /// (`{"error": ..., "raw": ...}`) when the argument text was
    /// unparsable.
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    /// Whether the arguments carry the decode-failure sentinel.
    pub fn arguments_failed_to_decode(&self) -> bool {
        self.arguments
            .get("error")
            .and_then(|e| e.as_str())
            .is_some_and(|e| e == ARGUMENT_DECODE_ERROR)
    }

    /// Arguments re-encoded as a JSON string, for wire formats that
    /// replay tool calls with string-encoded arguments.
    pub fn arguments_text(&self) -> String {
        serde_json::to_string(&self.arguments).unwrap_or_else(|_| "{}".into())
    }
}

/// A canonical event in a normalized model turn stream.
///
/// Every supported wire format is translated into this event model.
/// Ordering is preserved; text is emitted as soon as a fragment decodes.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A partial content fragment.
    Text { delta: String },

    /// A tool call began streaming at the given per-call index.
    ToolCallStart {
        index: u32,
        id: String,
        name: String,
    },

    /// Argument text fragment for the call at the given index.
    ToolCallDelta { index: u32, fragment: String },

    /// A tool call was flushed: name concatenated, arguments decoded.
    ToolCallComplete { call: ToolCallRequest },
}

/// The core Provider trait — one streaming wire protocol per implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send one turn and get a lazy, single-pass stream of canonical
    /// events until the transport closes.
    ///
    /// Transport failures before the stream opens are returned as `Err`;
    /// mid-stream failures arrive as `Err` items on the channel. Providers
    /// never retry a failed connection themselves.
    async fn stream_turn(
        &self,
        request: TurnRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ModelEvent, ProviderError>>,
        ProviderError,
    >;
}

/// Build the sentinel arguments object for undecodable argument text.
pub fn sentinel_arguments(raw: &str) -> serde_json::Value {
    serde_json::json!({
        "error": ARGUMENT_DECODE_ERROR,
        "raw": raw,
    })
}
