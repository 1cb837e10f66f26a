//! GraphTool trait, registry, and dispatcher.
//!
//! Tools are the agent's capabilities over the knowledge graph. Each
//! handler validates its arguments against the *current* projection and
//! returns a structured payload describing the mutation it performed
//! (tagged with a declarative `"action"` for the projector). The
//! dispatcher converts every failure into a `ToolOutcome { ok: false }`
//! so one bad tool call never crashes a run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::ToolError;
use crate::graph::WorldStateProjection;
use crate::provider::ToolDefinition;

/// Starts the background side-effect processor (e.g. a persistence
/// scheduler). Invoked before every dispatch; the callee must make
/// process-wide startup idempotent.
pub type EffectStarter = Arc<dyn Fn() + Send + Sync>;

/// An effect starter that does nothing — for tests and callers that run
/// without a side-effect processor.
pub fn noop_effect_starter() -> EffectStarter {
    Arc::new(|| {})
}

/// The result of dispatching one tool call. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the tool executed successfully
    pub ok: bool,

    /// Structured success payload describing the mutation performed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    /// Failure description when `ok` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(value: serde_json::Value) -> Self {
        Self {
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            error: Some(error.into()),
        }
    }

    /// The JSON encoding folded into the conversation as a tool message.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"ok":false,"error":"unserializable tool outcome"}"#.into())
    }

    /// The declarative action tag of a success payload, if present.
    pub fn action(&self) -> Option<&str> {
        self.value
            .as_ref()
            .and_then(|v| v.get("action"))
            .and_then(|a| a.as_str())
    }
}

/// The core tool trait.
///
/// Handlers receive the current projection (already reflecting prior tool
/// calls in the same run) read-only for validation and name→id
/// resolution; the projector applies the declared mutation afterwards.
#[async_trait]
pub trait GraphTool: Send + Sync {
    /// The unique name of this tool (e.g., "createNode").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool against the current world-state projection.
    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        run_id: &str,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools — the static lookup table the
/// dispatcher resolves names against.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn GraphTool>>,
    /// Registration order, so tool definitions reach the model stably.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn GraphTool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn GraphTool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM), in
    /// registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Dispatch one tool call.
    ///
    /// The effect starter runs first so the background side-effect
    /// processor is guaranteed to be up before any mutation is described.
    /// A missing tool name is a configuration failure surfaced as an
    /// `ok:false` outcome — never silently ignored, never a panic.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        run_id: &str,
        effect_starter: &EffectStarter,
    ) -> ToolOutcome {
        effect_starter();

        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "Tool not registered");
            return ToolOutcome::failure(ToolError::NotFound(name.to_string()).to_string());
        };

        match tool.execute(arguments, world, run_id).await {
            Ok(value) => ToolOutcome::success(value),
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolOutcome::failure(e.to_string())
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A trivial tool that echoes its "text" argument back in a payload.
    struct EchoTool;

    #[async_trait]
    impl GraphTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: &serde_json::Value,
            _world: &WorldStateProjection,
            _run_id: &str,
        ) -> std::result::Result<serde_json::Value, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
            Ok(serde_json::json!({"action": "echo", "text": text}))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn dispatch_success() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let world = WorldStateProjection::new();
        let outcome = registry
            .dispatch(
                "echo",
                &serde_json::json!({"text": "hello"}),
                &world,
                "run-1",
                &noop_effect_starter(),
            )
            .await;
        assert!(outcome.ok);
        assert_eq!(outcome.action(), Some("echo"));
    }

    #[tokio::test]
    async fn dispatch_missing_tool_is_captured() {
        let registry = ToolRegistry::new();
        let world = WorldStateProjection::new();
        let outcome = registry
            .dispatch(
                "nonexistent",
                &serde_json::json!({}),
                &world,
                "run-1",
                &noop_effect_starter(),
            )
            .await;
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("nonexistent"));
    }

    #[tokio::test]
    async fn dispatch_invalid_arguments_is_captured() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let world = WorldStateProjection::new();
        let outcome = registry
            .dispatch(
                "echo",
                &serde_json::json!({"wrong": 1}),
                &world,
                "run-1",
                &noop_effect_starter(),
            )
            .await;
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("text"));
    }

    #[tokio::test]
    async fn effect_starter_runs_before_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let starter: EffectStarter = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let world = WorldStateProjection::new();
        registry
            .dispatch("echo", &serde_json::json!({"text": "a"}), &world, "run-1", &starter)
            .await;
        // Starter runs even for unknown tools.
        registry
            .dispatch("nope", &serde_json::json!({}), &world, "run-1", &starter)
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn outcome_json_encoding() {
        let ok = ToolOutcome::success(serde_json::json!({"action": "createNode"}));
        assert!(ok.to_json_string().contains(r#""ok":true"#));

        let err = ToolOutcome::failure("boom");
        let json = err.to_json_string();
        assert!(json.contains(r#""ok":false"#));
        assert!(json.contains("boom"));
    }
}
