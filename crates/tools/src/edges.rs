//! Edge tools — connect node instances on a graph.

use async_trait::async_trait;
use loomweave_core::error::ToolError;
use loomweave_core::graph::{NodeInstance, WorldStateProjection};
use loomweave_core::tool::GraphTool;
use serde::Deserialize;
use uuid::Uuid;

use crate::{parse_args, target_graph};

/// Resolve a node reference to its instance on the given graph.
fn instance_on_graph<'a>(
    world: &'a WorldStateProjection,
    reference: &str,
    graph_id: &str,
) -> Result<&'a NodeInstance, ToolError> {
    // Direct instance id first, then prototype name/id scoped to the graph.
    if let Some(instance) = world.instances.get(reference) {
        if instance.graph_id == graph_id {
            return Ok(instance);
        }
    }

    let prototype = world
        .resolve_prototype(reference)
        .ok_or_else(|| ToolError::UnknownEntity {
            kind: "node".into(),
            reference: reference.into(),
        })?;

    world
        .instance_of(&prototype.id, graph_id)
        .ok_or_else(|| ToolError::UnknownEntity {
            kind: "node instance".into(),
            reference: reference.into(),
        })
}

/// Create a directed edge between two nodes on a graph.
pub struct CreateEdgeTool;

#[derive(Debug, Deserialize)]
struct CreateEdgeArgs {
    /// Source node name, prototype id, or instance id.
    source: String,
    /// Target node name, prototype id, or instance id.
    target: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    graph: Option<String>,
}

#[async_trait]
impl GraphTool for CreateEdgeTool {
    fn name(&self) -> &str {
        "createEdge"
    }

    fn description(&self) -> &str {
        "Create a directed edge between two nodes on the current graph."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "source": {
                    "type": "string",
                    "description": "The name or id of the source node"
                },
                "target": {
                    "type": "string",
                    "description": "The name or id of the target node"
                },
                "label": {
                    "type": "string",
                    "description": "Optional relationship label, e.g. 'father of'"
                },
                "graph": {
                    "type": "string",
                    "description": "Graph name or id; defaults to the active graph"
                }
            },
            "required": ["source", "target"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: CreateEdgeArgs = parse_args(arguments)?;
        let graph = target_graph(world, args.graph.as_deref())?;
        let source = instance_on_graph(world, &args.source, &graph.id)?;
        let target = instance_on_graph(world, &args.target, &graph.id)?;

        Ok(serde_json::json!({
            "action": "createEdge",
            "edgeId": Uuid::new_v4().to_string(),
            "graphId": graph.id,
            "sourceId": source.id,
            "targetId": target.id,
            "label": args.label,
        }))
    }
}

/// Update an edge's label.
pub struct UpdateEdgeTool;

#[derive(Debug, Deserialize)]
struct UpdateEdgeArgs {
    #[serde(rename = "edgeId")]
    edge_id: String,
    #[serde(default)]
    label: Option<String>,
}

#[async_trait]
impl GraphTool for UpdateEdgeTool {
    fn name(&self) -> &str {
        "updateEdge"
    }

    fn description(&self) -> &str {
        "Update the label of an existing edge."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "edgeId": {
                    "type": "string",
                    "description": "The id of the edge to update"
                },
                "label": {
                    "type": "string",
                    "description": "The new relationship label"
                }
            },
            "required": ["edgeId"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: UpdateEdgeArgs = parse_args(arguments)?;
        let edge = world
            .resolve_edge(&args.edge_id)
            .ok_or_else(|| ToolError::UnknownEntity {
                kind: "edge".into(),
                reference: args.edge_id.clone(),
            })?;

        Ok(serde_json::json!({
            "action": "updateEdge",
            "edgeId": edge.id,
            "label": args.label,
        }))
    }
}

/// Delete an edge.
pub struct DeleteEdgeTool;

#[derive(Debug, Deserialize)]
struct DeleteEdgeArgs {
    #[serde(rename = "edgeId")]
    edge_id: String,
}

#[async_trait]
impl GraphTool for DeleteEdgeTool {
    fn name(&self) -> &str {
        "deleteEdge"
    }

    fn description(&self) -> &str {
        "Delete an edge between two nodes."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "edgeId": {
                    "type": "string",
                    "description": "The id of the edge to delete"
                }
            },
            "required": ["edgeId"]
        })
    }

    async fn execute(
        &self,
        arguments: &serde_json::Value,
        world: &WorldStateProjection,
        _run_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        let args: DeleteEdgeArgs = parse_args(arguments)?;
        let edge = world
            .resolve_edge(&args.edge_id)
            .ok_or_else(|| ToolError::UnknownEntity {
                kind: "edge".into(),
                reference: args.edge_id.clone(),
            })?;

        Ok(serde_json::json!({
            "action": "deleteEdge",
            "edgeId": edge.id,
            "graphId": edge.graph_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomweave_core::graph::{EdgeRecord, GraphRecord, NodeInstance, NodePrototype};

    fn world_with_pair() -> WorldStateProjection {
        let mut world = WorldStateProjection::new();
        world.graphs.insert(
            "g1".into(),
            GraphRecord {
                id: "g1".into(),
                name: "Mythology".into(),
                ..Default::default()
            },
        );
        world.active_graph_id = Some("g1".into());

        for (pid, iid, name) in [("p1", "i1", "Zeus"), ("p2", "i2", "Ares")] {
            world.node_prototypes.insert(
                pid.into(),
                NodePrototype {
                    id: pid.into(),
                    name: name.into(),
                    ..Default::default()
                },
            );
            world.instances.insert(
                iid.into(),
                NodeInstance {
                    id: iid.into(),
                    prototype_id: pid.into(),
                    graph_id: "g1".into(),
                    ..Default::default()
                },
            );
        }
        world
    }

    #[tokio::test]
    async fn create_edge_resolves_names_to_instances() {
        let world = world_with_pair();
        let result = CreateEdgeTool
            .execute(
                &serde_json::json!({"source": "Zeus", "target": "ares", "label": "father of"}),
                &world,
                "run-1",
            )
            .await
            .unwrap();

        assert_eq!(result["action"], "createEdge");
        assert_eq!(result["sourceId"], "i1");
        assert_eq!(result["targetId"], "i2");
        assert_eq!(result["label"], "father of");
    }

    #[tokio::test]
    async fn create_edge_unknown_target_fails() {
        let world = world_with_pair();
        let err = CreateEdgeTool
            .execute(
                &serde_json::json!({"source": "Zeus", "target": "Hades"}),
                &world,
                "run-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownEntity { .. }));
    }

    #[tokio::test]
    async fn update_and_delete_edge() {
        let mut world = world_with_pair();
        world.edges.insert(
            "e1".into(),
            EdgeRecord {
                id: "e1".into(),
                graph_id: "g1".into(),
                source_id: "i1".into(),
                target_id: "i2".into(),
                label: None,
            },
        );

        let updated = UpdateEdgeTool
            .execute(
                &serde_json::json!({"edgeId": "e1", "label": "parent of"}),
                &world,
                "run-1",
            )
            .await
            .unwrap();
        assert_eq!(updated["label"], "parent of");

        let deleted = DeleteEdgeTool
            .execute(&serde_json::json!({"edgeId": "e1"}), &world, "run-1")
            .await
            .unwrap();
        assert_eq!(deleted["action"], "deleteEdge");
        assert_eq!(deleted["edgeId"], "e1");
    }

    #[tokio::test]
    async fn delete_unknown_edge_fails() {
        let world = world_with_pair();
        let err = DeleteEdgeTool
            .execute(&serde_json::json!({"edgeId": "nope"}), &world, "run-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownEntity { .. }));
    }
}
