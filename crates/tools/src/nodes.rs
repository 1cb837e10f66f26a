//! Node tools — create, update, and delete node prototypes and their
//! placements on a graph.

use async_trait::async_trait;
use loomweave_core::error::ToolError;
use loomweave_core::graph::WorldStateProjection;
use loomweave_core::tool::GraphTool;
use serde::Deserialize;
use uuid::Uuid;

use crate::{parse_args, target_graph};

/// Create a node prototype and place one instance of it on a graph.
pub struct CreateNodeTool;

#[derive(Debug, Deserialize)]
struct CreateNodeArgs {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    /// Graph name or id; defaults to the active graph.
    #[serde(default)]
    graph: Option<String>,
}

#[async_trait]
impl GraphTool for CreateNodeTool {
    fn name(&self) -> &str {
        "createNode"
    }

    fn description(&self) -> &str {
        "Create a new node with the given name and place it on the current graph."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name of the new node"
                },
                "description": {
                    "type": "string",
                    "description": "Optional description of the node"
                },
                "color": {
                    "type": "string",
                    "description": "Optional hex color, e.g. #ff8800"
                },
                "x": { "type": "number", "description": "X position on the canvas" },
                "y": { "type": "number", "description": "Y position on the canvas" },
                "graph": {
                    "type": "string",
                    "description": "Graph name or id; defaults to the active graph"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: CreateNodeArgs = parse_args(arguments)?;
        let graph = target_graph(world, args.graph.as_deref())?;

        let prototype_id = Uuid::new_v4().to_string();
        let instance_id = Uuid::new_v4().to_string();

        // Default placement spreads new nodes instead of stacking them.
        let placed = world.instance_count(&graph.id) as f64;
        let x = args.x.unwrap_or(placed * 150.0);
        let y = args.y.unwrap_or(0.0);

        Ok(serde_json::json!({
            "action": "createNode",
            "name": args.name,
            "prototypeId": prototype_id,
            "instanceId": instance_id,
            "graphId": graph.id,
            "description": args.description.unwrap_or_default(),
            "color": args.color,
            "x": x,
            "y": y,
        }))
    }
}

/// Update a node prototype's name, description, or color.
pub struct UpdateNodeTool;

#[derive(Debug, Deserialize)]
struct UpdateNodeArgs {
    /// Node name or prototype id to update.
    node: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

#[async_trait]
impl GraphTool for UpdateNodeTool {
    fn name(&self) -> &str {
        "updateNode"
    }

    fn description(&self) -> &str {
        "Update an existing node's name, description, or color."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": {
                    "type": "string",
                    "description": "The name or id of the node to update"
                },
                "name": { "type": "string", "description": "New name" },
                "description": { "type": "string", "description": "New description" },
                "color": { "type": "string", "description": "New hex color" }
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
        let args: UpdateNodeArgs = parse_args(arguments)?;
        let prototype = world
            .resolve_prototype(&args.node)
            .ok_or_else(|| ToolError::UnknownEntity {
                kind: "node".into(),
                reference: args.node.clone(),
            })?;

        Ok(serde_json::json!({
            "action": "updateNode",
            "prototypeId": prototype.id,
            "name": args.name,
            "description": args.description,
            "color": args.color,
        }))
    }
}

/// Delete a node prototype, its instances, and everything hanging off
/// them.
pub struct DeleteNodeTool;

#[derive(Debug, Deserialize)]
struct DeleteNodeArgs {
    /// Node name or prototype id to delete.
    node: String,
}

#[async_trait]
impl GraphTool for DeleteNodeTool {
    fn name(&self) -> &str {
        "deleteNode"
    }

    fn description(&self) -> &str {
        "Delete a node. All of its placements, connected edges, and group memberships are removed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": {
                    "type": "string",
                    "description": "The name or id of the node to delete"
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
        let args: DeleteNodeArgs = parse_args(arguments)?;
        let prototype = world
            .resolve_prototype(&args.node)
            .ok_or_else(|| ToolError::UnknownEntity {
                kind: "node".into(),
                reference: args.node.clone(),
            })?;

        // Report the cascade so the projector can apply it exactly.
        let removed_instance_ids: Vec<&str> = world
            .instances
            .values()
            .filter(|i| i.prototype_id == prototype.id)
            .map(|i| i.id.as_str())
            .collect();

        let removed_edge_ids: Vec<&str> = world
            .edges
            .values()
            .filter(|e| {
                removed_instance_ids.contains(&e.source_id.as_str())
                    || removed_instance_ids.contains(&e.target_id.as_str())
            })
            .map(|e| e.id.as_str())
            .collect();

        Ok(serde_json::json!({
            "action": "deleteNode",
            "prototypeId": prototype.id,
            "name": prototype.name,
            "removedInstanceIds": removed_instance_ids,
            "removedEdgeIds": removed_edge_ids,
        }))
    }
}
