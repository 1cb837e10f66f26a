//! Group tools — organize node instances into named groups on a graph.

use async_trait::async_trait;
use loomweave_core::error::ToolError;
use loomweave_core::graph::WorldStateProjection;
use loomweave_core::tool::GraphTool;
use serde::Deserialize;
use uuid::Uuid;

use crate::{parse_args, target_graph};

/// Resolve node references to instance ids on the given graph.
fn member_instance_ids(
    world: &WorldStateProjection,
    members: &[String],
    graph_id: &str,
) -> Result<Vec<String>, ToolError> {
    members
        .iter()
        .map(|reference| {
            if let Some(instance) = world.instances.get(reference) {
                if instance.graph_id == graph_id {
                    return Ok(instance.id.clone());
                }
            }
            let prototype = world
                .resolve_prototype(reference)
                .ok_or_else(|| ToolError::UnknownEntity {
                    kind: "node".into(),
                    reference: reference.clone(),
                })?;
            world
                .instance_of(&prototype.id, graph_id)
                .map(|i| i.id.clone())
                .ok_or_else(|| ToolError::UnknownEntity {
                    kind: "node instance".into(),
                    reference: reference.clone(),
                })
        })
        .collect()
}

/// Create a named group of nodes.
pub struct CreateGroupTool;

#[derive(Debug, Deserialize)]
struct CreateGroupArgs {
    name: String,
    /// Node names or ids to include.
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    graph: Option<String>,
}

#[async_trait]
impl GraphTool for CreateGroupTool {
    fn name(&self) -> &str {
        "createGroup"
    }

    fn description(&self) -> &str {
        "Create a named group containing the given nodes on the current graph."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name of the group"
                },
                "members": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Names or ids of the nodes to include"
                },
                "color": {
                    "type": "string",
                    "description": "Optional hex color for the group"
                },
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
        let args: CreateGroupArgs = parse_args(arguments)?;
        let graph = target_graph(world, args.graph.as_deref())?;
        let members = member_instance_ids(world, &args.members, &graph.id)?;

        Ok(serde_json::json!({
            "action": "createGroup",
            "groupId": Uuid::new_v4().to_string(),
            "graphId": graph.id,
            "name": args.name,
            "memberInstanceIds": members,
            "color": args.color,
        }))
    }
}

/// Update a group's name, color, or membership.
pub struct UpdateGroupTool;

#[derive(Debug, Deserialize)]
struct UpdateGroupArgs {
    /// Group name or id to update.
    group: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default, rename = "addMembers")]
    add_members: Vec<String>,
    #[serde(default, rename = "removeMembers")]
    remove_members: Vec<String>,
}

#[async_trait]
impl GraphTool for UpdateGroupTool {
    fn name(&self) -> &str {
        "updateGroup"
    }

    fn description(&self) -> &str {
        "Update a group's name, color, or membership."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "group": {
                    "type": "string",
                    "description": "The name or id of the group to update"
                },
                "name": { "type": "string", "description": "New group name" },
                "color": { "type": "string", "description": "New hex color" },
                "addMembers": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Nodes to add to the group"
                },
                "removeMembers": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Nodes to remove from the group"
                }
            },
            "required": ["group"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: UpdateGroupArgs = parse_args(arguments)?;
        let group = world
            .resolve_group(&args.group)
            .ok_or_else(|| ToolError::UnknownEntity {
                kind: "group".into(),
                reference: args.group.clone(),
            })?;

        let added = member_instance_ids(world, &args.add_members, &group.graph_id)?;
        let removed = member_instance_ids(world, &args.remove_members, &group.graph_id)?;

        Ok(serde_json::json!({
            "action": "updateGroup",
            "groupId": group.id,
            "name": args.name,
            "color": args.color,
            "addInstanceIds": added,
            "removeInstanceIds": removed,
        }))
    }
}

/// Delete a group (the member nodes stay on the graph).
pub struct DeleteGroupTool;

#[derive(Debug, Deserialize)]
struct DeleteGroupArgs {
    group: String,
}

#[async_trait]
impl GraphTool for DeleteGroupTool {
    fn name(&self) -> &str {
        "deleteGroup"
    }

    fn description(&self) -> &str {
        "Delete a group. Its member nodes remain on the graph."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "group": {
                    "type": "string",
                    "description": "The name or id of the group to delete"
                }
            },
            "required": ["group"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: DeleteGroupArgs = parse_args(arguments)?;
        let group = world
            .resolve_group(&args.group)
            .ok_or_else(|| ToolError::UnknownEntity {
                kind: "group".into(),
                reference: args.group.clone(),
            })?;

        Ok(serde_json::json!({
            "action": "deleteGroup",
            "groupId": group.id,
        }))
    }
}
