//! Run configuration.
//!
//! A [`RunConfig`] is fixed for the duration of one run: which provider
//! and model to talk to, sampling settings, the iteration budget, and
//! any seed conversation history.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;
use crate::provider::default_temperature;

/// Default iteration budget: a run never makes more than this many model
/// turns.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Immutable configuration for one run of the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Which provider implementation to use ("anthropic", "openai", "ollama")
    pub provider: String,

    /// Endpoint override (base URL); provider default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// The model to request
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per model response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Iteration budget for the run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Seed messages prepended to the conversation (system prompt,
    /// prior context). Never persisted by the core.
    #[serde(default)]
    pub conversation_history: Vec<Message>,

    /// Opaque run identifier, passed through to tool handlers
    pub run_id: String,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl RunConfig {
    /// Create a config with defaults for the given provider and model.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            endpoint: None,
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            conversation_history: Vec::new(),
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Override the iteration budget.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Override the endpoint base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Seed the conversation with history messages.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.conversation_history = history;
        self
    }
}
