//! Built-in graph tool implementations for loomweave.
//!
//! Tools give the agent the ability to reshape the knowledge graph:
//! create and populate graphs, place and edit nodes, connect them with
//! edges, and organize them into groups.
//!
//! Handlers validate against the current world-state projection and
//! return a declarative payload tagged with an `"action"`; the projector
//! applies the mutation after dispatch.

pub mod edges;
pub mod effects;
pub mod graphs;
pub mod groups;
pub mod nodes;

use loomweave_core::error::ToolError;
use loomweave_core::graph::{GraphRecord, WorldStateProjection};
use loomweave_core::tool::ToolRegistry;

pub use effects::persistence_starter;

/// Deserialize tool arguments, mapping failures (including the sentinel
/// error object a truncated stream produces) to `InvalidArguments`.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(
    arguments: &serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Resolve the graph a tool call targets: an explicit `graph` reference
/// if given, otherwise the active graph.
pub(crate) fn target_graph<'a>(
    world: &'a WorldStateProjection,
    reference: Option<&str>,
) -> Result<&'a GraphRecord, ToolError> {
    match reference {
        Some(r) => world.resolve_graph(r).ok_or_else(|| ToolError::UnknownEntity {
            kind: "graph".into(),
            reference: r.into(),
        }),
        None => world.active_graph().ok_or_else(|| ToolError::UnknownEntity {
            kind: "graph".into(),
            reference: "(no active graph)".into(),
        }),
    }
}

/// Create a default tool registry with all built-in graph tools.
///
/// Registration order is the order tool definitions reach the model.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(graphs::CreateGraphTool));
    registry.register(Box::new(graphs::CreatePopulatedGraphTool));
    registry.register(Box::new(graphs::ExpandGraphTool));
    registry.register(Box::new(nodes::CreateNodeTool));
    registry.register(Box::new(nodes::UpdateNodeTool));
    registry.register(Box::new(nodes::DeleteNodeTool));
    registry.register(Box::new(edges::CreateEdgeTool));
    registry.register(Box::new(edges::UpdateEdgeTool));
    registry.register(Box::new(edges::DeleteEdgeTool));
    registry.register(Box::new(groups::CreateGroupTool));
    registry.register(Box::new(groups::UpdateGroupTool));
    registry.register(Box::new(groups::DeleteGroupTool));
    registry
}
