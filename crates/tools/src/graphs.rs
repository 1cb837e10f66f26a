//! Graph tools — create graphs, populate them in bulk, and expand a
//! node into its own definition graph.

use async_trait::async_trait;
use loomweave_core::error::ToolError;
use loomweave_core::graph::WorldStateProjection;
use loomweave_core::tool::GraphTool;
use serde::Deserialize;
use uuid::Uuid;

use crate::parse_args;

/// Create a new, empty graph and make it active.
pub struct CreateGraphTool;

#[derive(Debug, Deserialize)]
struct CreateGraphArgs {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl GraphTool for CreateGraphTool {
    fn name(&self) -> &str {
        "createGraph"
    }

    fn description(&self) -> &str {
        "Create a new empty graph and switch to it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name of the new graph"
                },
                "description": {
                    "type": "string",
                    "description": "Optional description of what the graph is about"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        _world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: CreateGraphArgs = parse_args(arguments)?;

        Ok(serde_json::json!({
            "action": "createGraph",
            "graphId": Uuid::new_v4().to_string(),
            "name": args.name,
            "description": args.description.unwrap_or_default(),
        }))
    }
}

/// Create a graph pre-populated with nodes and edges in one call.
pub struct CreatePopulatedGraphTool;

#[derive(Debug, Deserialize)]
struct PopulatedNodeArgs {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PopulatedEdgeArgs {
    /// Name of a node in the `nodes` list.
    source: String,
    /// Name of a node in the `nodes` list.
    target: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePopulatedGraphArgs {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    nodes: Vec<PopulatedNodeArgs>,
    #[serde(default)]
    edges: Vec<PopulatedEdgeArgs>,
}

#[async_trait]
impl GraphTool for CreatePopulatedGraphTool {
    fn name(&self) -> &str {
        "createPopulatedGraph"
    }

    fn description(&self) -> &str {
        "Create a new graph together with an initial set of nodes and the edges between them, then switch to it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name of the new graph"
                },
                "description": {
                    "type": "string",
                    "description": "Optional description of the graph"
                },
                "nodes": {
                    "type": "array",
                    "description": "Nodes to create on the new graph",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "description": { "type": "string" },
                            "color": { "type": "string" },
                            "x": { "type": "number" },
                            "y": { "type": "number" }
                        },
                        "required": ["name"]
                    }
                },
                "edges": {
                    "type": "array",
                    "description": "Edges between nodes in the nodes list, referenced by name",
                    "items": {
                        "type": "object",
                        "properties": {
                            "source": { "type": "string" },
                            "target": { "type": "string" },
                            "label": { "type": "string" }
                        },
                        "required": ["source", "target"]
                    }
                }
            },
            "required": ["name", "nodes"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        _world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: CreatePopulatedGraphArgs = parse_args(arguments)?;
        let graph_id = Uuid::new_v4().to_string();

        let mut nodes = Vec::with_capacity(args.nodes.len());
        for (position, node) in args.nodes.iter().enumerate() {
            nodes.push(serde_json::json!({
                "prototypeId": Uuid::new_v4().to_string(),
                "instanceId": Uuid::new_v4().to_string(),
                "name": node.name,
                "description": node.description.clone().unwrap_or_default(),
                "color": node.color,
                "x": node.x.unwrap_or(position as f64 * 150.0),
                "y": node.y.unwrap_or(0.0),
            }));
        }

        // Edges refer to nodes by name within this same payload.
        let instance_for = |name: &str| -> Option<&str> {
            nodes
                .iter()
                .find(|n| n["name"].as_str().is_some_and(|s| s.eq_ignore_ascii_case(name)))
                .and_then(|n| n["instanceId"].as_str())
        };

        let mut edges = Vec::with_capacity(args.edges.len());
        for edge in &args.edges {
            let source_id =
                instance_for(&edge.source).ok_or_else(|| ToolError::UnknownEntity {
                    kind: "node".into(),
                    reference: edge.source.clone(),
                })?;
            let target_id =
                instance_for(&edge.target).ok_or_else(|| ToolError::UnknownEntity {
                    kind: "node".into(),
                    reference: edge.target.clone(),
                })?;
            edges.push(serde_json::json!({
                "edgeId": Uuid::new_v4().to_string(),
                "sourceId": source_id,
                "targetId": target_id,
                "label": edge.label,
            }));
        }

        Ok(serde_json::json!({
            "action": "createPopulatedGraph",
            "graphId": graph_id,
            "name": args.name,
            "description": args.description.unwrap_or_default(),
            "nodes": nodes,
            "edges": edges,
        }))
    }
}

/// Expand a node into its own definition graph and switch to it.
pub struct ExpandGraphTool;

#[derive(Debug, Deserialize)]
struct ExpandGraphArgs {
    /// Node name or prototype id to expand.
    node: String,
    #[serde(default)]
    name: Option<String>,
}

#[async_trait]
impl GraphTool for ExpandGraphTool {
    fn name(&self) -> &str {
        "expandGraph"
    }

    fn description(&self) -> &str {
        "Open a node's interior as its own graph, creating the definition graph if it does not exist yet."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": {
                    "type": "string",
                    "description": "The name or id of the node to expand"
                },
                "name": {
                    "type": "string",
                    "description": "Optional name for the definition graph; defaults to the node's name"
                }
            },
            "required": ["node"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: ExpandGraphArgs = parse_args(arguments)?;
        let prototype = world
            .resolve_prototype(&args.node)
            .ok_or_else(|| ToolError::UnknownEntity {
                kind: "node".into(),
                reference: args.node.clone(),
            })?;

        // Reuse an existing definition graph instead of forking a new one.
        if let Some(existing) = prototype
            .definition_graph_ids
            .first()
            .and_then(|id| world.graphs.get(id))
        {
            return Ok(serde_json::json!({
                "action": "expandGraph",
                "prototypeId": prototype.id,
                "graphId": existing.id,
                "name": existing.name,
                "created": false,
            }));
        }

        let name = args.name.unwrap_or_else(|| prototype.name.clone());
        Ok(serde_json::json!({
            "action": "expandGraph",
            "prototypeId": prototype.id,
            "graphId": Uuid::new_v4().to_string(),
            "name": name,
            "created": true,
        }))
    }
}
