//! World-state projection.
//!
//! Applies the declarative effect of a completed tool call to the
//! in-memory graph mirror so later calls in the same run resolve names
//! and ids the earlier calls just created. Dispatches purely on the
//! `"action"` tag in the outcome payload; error outcomes and unknown
//! tags are no-ops. Mutations are local replacements, never commits to
//! the authoritative store.

use loomweave_core::graph::{
    EdgeRecord, GraphRecord, GroupRecord, NodeInstance, NodePrototype, WorldStateProjection,
};
use loomweave_core::tool::ToolOutcome;
use serde_json::Value;
use tracing::trace;

/// Apply one tool outcome to the projection, in place.
pub fn apply(
    world: &mut WorldStateProjection,
    tool_name: &str,
    _arguments: &Value,
    outcome: &ToolOutcome,
) {
    if !outcome.ok {
        trace!(tool = tool_name, "Skipping projection of failed tool call");
        return;
    }
    let Some(value) = outcome.value.as_ref() else {
        return;
    };
    let Some(action) = value.get("action").and_then(|a| a.as_str()) else {
        return;
    };

    trace!(tool = tool_name, action, "Projecting tool outcome");

    match action {
        "createGraph" => create_graph(world, value),
        "createNode" => create_node(world, value),
        "updateNode" => update_node(world, value),
        "deleteNode" => delete_node(world, value),
        "createEdge" => create_edge(world, value),
        "updateEdge" => update_edge(world, value),
        "deleteEdge" => delete_edge(world, value),
        "createGroup" => create_group(world, value),
        "updateGroup" => update_group(world, value),
        "deleteGroup" => delete_group(world, value),
        "createPopulatedGraph" => create_populated_graph(world, value),
        "expandGraph" => expand_graph(world, value),
        other => {
            trace!(action = other, "No projection for action");
        }
    }
}

fn field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn id_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn create_graph(world: &mut WorldStateProjection, value: &Value) {
    let Some(id) = field(value, "graphId") else {
        return;
    };
    world.graphs.insert(
        id.clone(),
        GraphRecord {
            id: id.clone(),
            name: field(value, "name").unwrap_or_default(),
            description: field(value, "description").unwrap_or_default(),
            instance_ids: Vec::new(),
            edge_ids: Vec::new(),
        },
    );
    world.active_graph_id = Some(id);
}

fn create_node(world: &mut WorldStateProjection, value: &Value) {
    let (Some(prototype_id), Some(instance_id), Some(graph_id)) = (
        field(value, "prototypeId"),
        field(value, "instanceId"),
        field(value, "graphId"),
    ) else {
        return;
    };

    world.node_prototypes.insert(
        prototype_id.clone(),
        NodePrototype {
            id: prototype_id.clone(),
            name: field(value, "name").unwrap_or_default(),
            description: field(value, "description").unwrap_or_default(),
            color: field(value, "color"),
            definition_graph_ids: Vec::new(),
        },
    );
    world.instances.insert(
        instance_id.clone(),
        NodeInstance {
            id: instance_id.clone(),
            prototype_id,
            graph_id: graph_id.clone(),
            x: value.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0),
            y: value.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0),
        },
    );
    if let Some(graph) = world.graphs.get_mut(&graph_id) {
        if !graph.instance_ids.contains(&instance_id) {
            graph.instance_ids.push(instance_id);
        }
    }
}

fn update_node(world: &mut WorldStateProjection, value: &Value) {
    let Some(prototype_id) = field(value, "prototypeId") else {
        return;
    };
    let Some(prototype) = world.node_prototypes.get_mut(&prototype_id) else {
        return;
    };
    if let Some(name) = field(value, "name") {
        prototype.name = name;
    }
    if let Some(description) = field(value, "description") {
        prototype.description = description;
    }
    if let Some(color) = field(value, "color") {
        prototype.color = Some(color);
    }
}

fn delete_node(world: &mut WorldStateProjection, value: &Value) {
    let Some(prototype_id) = field(value, "prototypeId") else {
        return;
    };
    world.node_prototypes.remove(&prototype_id);

    let removed_instances = id_list(value, "removedInstanceIds");
    let removed_edges = id_list(value, "removedEdgeIds");

    for instance_id in &removed_instances {
        world.instances.remove(instance_id);
    }
    for edge_id in &removed_edges {
        world.edges.remove(edge_id);
    }

    for graph in world.graphs.values_mut() {
        graph.instance_ids.retain(|i| !removed_instances.contains(i));
        graph.edge_ids.retain(|e| !removed_edges.contains(e));
    }
    for group in world.groups.values_mut() {
        group
            .member_instance_ids
            .retain(|i| !removed_instances.contains(i));
    }
}

fn create_edge(world: &mut WorldStateProjection, value: &Value) {
    let (Some(edge_id), Some(graph_id), Some(source_id), Some(target_id)) = (
        field(value, "edgeId"),
        field(value, "graphId"),
        field(value, "sourceId"),
        field(value, "targetId"),
    ) else {
        return;
    };

    world.edges.insert(
        edge_id.clone(),
        EdgeRecord {
            id: edge_id.clone(),
            graph_id: graph_id.clone(),
            source_id,
            target_id,
            label: field(value, "label"),
        },
    );
    if let Some(graph) = world.graphs.get_mut(&graph_id) {
        if !graph.edge_ids.contains(&edge_id) {
            graph.edge_ids.push(edge_id);
        }
    }
}

fn update_edge(world: &mut WorldStateProjection, value: &Value) {
    let Some(edge_id) = field(value, "edgeId") else {
        return;
    };
    if let Some(edge) = world.edges.get_mut(&edge_id) {
        edge.label = field(value, "label");
    }
}

fn delete_edge(world: &mut WorldStateProjection, value: &Value) {
    let Some(edge_id) = field(value, "edgeId") else {
        return;
    };
    world.edges.remove(&edge_id);
    for graph in world.graphs.values_mut() {
        graph.edge_ids.retain(|e| e != &edge_id);
    }
}

fn create_group(world: &mut WorldStateProjection, value: &Value) {
    let (Some(group_id), Some(graph_id)) = (field(value, "groupId"), field(value, "graphId"))
    else {
        return;
    };
    world.groups.insert(
        group_id.clone(),
        GroupRecord {
            id: group_id,
            graph_id,
            name: field(value, "name").unwrap_or_default(),
            member_instance_ids: id_list(value, "memberInstanceIds"),
            color: field(value, "color"),
        },
    );
}

fn update_group(world: &mut WorldStateProjection, value: &Value) {
    let Some(group_id) = field(value, "groupId") else {
        return;
    };
    let Some(group) = world.groups.get_mut(&group_id) else {
        return;
    };
    if let Some(name) = field(value, "name") {
        group.name = name;
    }
    if let Some(color) = field(value, "color") {
        group.color = Some(color);
    }
    for added in id_list(value, "addInstanceIds") {
        if !group.member_instance_ids.contains(&added) {
            group.member_instance_ids.push(added);
        }
    }
    let removed = id_list(value, "removeInstanceIds");
    group.member_instance_ids.retain(|i| !removed.contains(i));
}

fn delete_group(world: &mut WorldStateProjection, value: &Value) {
    if let Some(group_id) = field(value, "groupId") {
        world.groups.remove(&group_id);
    }
}

fn create_populated_graph(world: &mut WorldStateProjection, value: &Value) {
    let Some(graph_id) = field(value, "graphId") else {
        return;
    };

    let mut graph = GraphRecord {
        id: graph_id.clone(),
        name: field(value, "name").unwrap_or_default(),
        description: field(value, "description").unwrap_or_default(),
        instance_ids: Vec::new(),
        edge_ids: Vec::new(),
    };

    for node in value.get("nodes").and_then(|n| n.as_array()).into_iter().flatten() {
        let (Some(prototype_id), Some(instance_id)) =
            (field(node, "prototypeId"), field(node, "instanceId"))
        else {
            continue;
        };
        world.node_prototypes.insert(
            prototype_id.clone(),
            NodePrototype {
                id: prototype_id.clone(),
                name: field(node, "name").unwrap_or_default(),
                description: field(node, "description").unwrap_or_default(),
                color: field(node, "color"),
                definition_graph_ids: Vec::new(),
            },
        );
        world.instances.insert(
            instance_id.clone(),
            NodeInstance {
                id: instance_id.clone(),
                prototype_id,
                graph_id: graph_id.clone(),
                x: node.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0),
                y: node.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0),
            },
        );
        graph.instance_ids.push(instance_id);
    }

    for edge in value.get("edges").and_then(|e| e.as_array()).into_iter().flatten() {
        let (Some(edge_id), Some(source_id), Some(target_id)) = (
            field(edge, "edgeId"),
            field(edge, "sourceId"),
            field(edge, "targetId"),
        ) else {
            continue;
        };
        world.edges.insert(
            edge_id.clone(),
            EdgeRecord {
                id: edge_id.clone(),
                graph_id: graph_id.clone(),
                source_id,
                target_id,
                label: field(edge, "label"),
            },
        );
        graph.edge_ids.push(edge_id);
    }

    world.graphs.insert(graph_id.clone(), graph);
    world.active_graph_id = Some(graph_id);
}

fn expand_graph(world: &mut WorldStateProjection, value: &Value) {
    let (Some(graph_id), Some(prototype_id)) =
        (field(value, "graphId"), field(value, "prototypeId"))
    else {
        return;
    };

    if value.get("created").and_then(|c| c.as_bool()).unwrap_or(false) {
        world.graphs.entry(graph_id.clone()).or_insert_with(|| GraphRecord {
            id: graph_id.clone(),
            name: field(value, "name").unwrap_or_default(),
            description: String::new(),
            instance_ids: Vec::new(),
            edge_ids: Vec::new(),
        });
        if let Some(prototype) = world.node_prototypes.get_mut(&prototype_id) {
            if !prototype.definition_graph_ids.contains(&graph_id) {
                prototype.definition_graph_ids.push(graph_id.clone());
            }
        }
    }

    world.active_graph_id = Some(graph_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_ok(world: &mut WorldStateProjection, payload: Value) {
        let outcome = ToolOutcome::success(payload);
        let tool = outcome.action().unwrap_or("unknown").to_string();
        apply(world, &tool, &serde_json::json!({}), &outcome);
    }

    fn world_with_node() -> WorldStateProjection {
        let mut world = WorldStateProjection::new();
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createGraph",
                "graphId": "g1",
                "name": "Mythology",
                "description": ""
            }),
        );
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createNode",
                "prototypeId": "p1",
                "instanceId": "i1",
                "graphId": "g1",
                "name": "Zeus",
                "x": 10.0,
                "y": 20.0
            }),
        );
        world
    }

    #[test]
    fn create_graph_activates_it() {
        let world = world_with_node();
        assert_eq!(world.active_graph_id.as_deref(), Some("g1"));
        assert_eq!(world.graphs["g1"].name, "Mythology");
    }

    #[test]
    fn create_node_registers_prototype_and_instance() {
        let world = world_with_node();
        assert_eq!(world.node_prototypes["p1"].name, "Zeus");
        assert_eq!(world.instances["i1"].graph_id, "g1");
        assert_eq!(world.graphs["g1"].instance_ids, vec!["i1"]);
        assert!(world.resolve_prototype("zeus").is_some());
    }

    #[test]
    fn update_node_replaces_fields() {
        let mut world = world_with_node();
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "updateNode",
                "prototypeId": "p1",
                "name": "Jupiter",
                "color": "#ffcc00"
            }),
        );
        let prototype = &world.node_prototypes["p1"];
        assert_eq!(prototype.name, "Jupiter");
        assert_eq!(prototype.color.as_deref(), Some("#ffcc00"));
    }

    #[test]
    fn delete_node_cascades() {
        let mut world = world_with_node();
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createNode",
                "prototypeId": "p2",
                "instanceId": "i2",
                "graphId": "g1",
                "name": "Ares"
            }),
        );
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createEdge",
                "edgeId": "e1",
                "graphId": "g1",
                "sourceId": "i1",
                "targetId": "i2"
            }),
        );
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createGroup",
                "groupId": "gr1",
                "graphId": "g1",
                "name": "Olympians",
                "memberInstanceIds": ["i1", "i2"]
            }),
        );

        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "deleteNode",
                "prototypeId": "p1",
                "removedInstanceIds": ["i1"],
                "removedEdgeIds": ["e1"]
            }),
        );

        assert!(!world.node_prototypes.contains_key("p1"));
        assert!(!world.instances.contains_key("i1"));
        assert!(!world.edges.contains_key("e1"));
        assert_eq!(world.graphs["g1"].instance_ids, vec!["i2"]);
        assert!(world.graphs["g1"].edge_ids.is_empty());
        assert_eq!(world.groups["gr1"].member_instance_ids, vec!["i2"]);
    }

    #[test]
    fn edge_lifecycle() {
        let mut world = world_with_node();
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createNode",
                "prototypeId": "p2",
                "instanceId": "i2",
                "graphId": "g1",
                "name": "Ares"
            }),
        );
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createEdge",
                "edgeId": "e1",
                "graphId": "g1",
                "sourceId": "i1",
                "targetId": "i2",
                "label": "father of"
            }),
        );
        assert_eq!(world.edges["e1"].label.as_deref(), Some("father of"));

        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "updateEdge",
                "edgeId": "e1",
                "label": "parent of"
            }),
        );
        assert_eq!(world.edges["e1"].label.as_deref(), Some("parent of"));

        apply_ok(
            &mut world,
            serde_json::json!({"action": "deleteEdge", "edgeId": "e1"}),
        );
        assert!(world.edges.is_empty());
        assert!(world.graphs["g1"].edge_ids.is_empty());
    }

    #[test]
    fn group_lifecycle() {
        let mut world = world_with_node();
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createGroup",
                "groupId": "gr1",
                "graphId": "g1",
                "name": "Olympians",
                "memberInstanceIds": ["i1"]
            }),
        );
        assert!(world.resolve_group("olympians").is_some());

        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "updateGroup",
                "groupId": "gr1",
                "name": "Gods",
                "removeInstanceIds": ["i1"]
            }),
        );
        assert_eq!(world.groups["gr1"].name, "Gods");
        assert!(world.groups["gr1"].member_instance_ids.is_empty());

        apply_ok(
            &mut world,
            serde_json::json!({"action": "deleteGroup", "groupId": "gr1"}),
        );
        assert!(world.groups.is_empty());
    }

    #[test]
    fn populated_graph_bulk_insert() {
        let mut world = WorldStateProjection::new();
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "createPopulatedGraph",
                "graphId": "g1",
                "name": "Mythology",
                "nodes": [
                    {"prototypeId": "p1", "instanceId": "i1", "name": "Zeus"},
                    {"prototypeId": "p2", "instanceId": "i2", "name": "Ares"}
                ],
                "edges": [
                    {"edgeId": "e1", "sourceId": "i1", "targetId": "i2", "label": "father of"}
                ]
            }),
        );

        assert_eq!(world.active_graph_id.as_deref(), Some("g1"));
        assert_eq!(world.instance_count("g1"), 2);
        assert_eq!(world.graphs["g1"].edge_ids, vec!["e1"]);
        assert!(world.resolve_prototype("ares").is_some());
    }

    #[test]
    fn expand_graph_creates_and_activates_definition() {
        let mut world = world_with_node();
        apply_ok(
            &mut world,
            serde_json::json!({
                "action": "expandGraph",
                "prototypeId": "p1",
                "graphId": "g-def",
                "name": "Zeus",
                "created": true
            }),
        );

        assert_eq!(world.active_graph_id.as_deref(), Some("g-def"));
        assert_eq!(
            world.node_prototypes["p1"].definition_graph_ids,
            vec!["g-def"]
        );
    }

    #[test]
    fn failed_outcome_is_noop() {
        let mut world = world_with_node();
        let before = world.clone();
        let outcome = ToolOutcome::failure("Unknown node: Hades");
        apply(&mut world, "deleteNode", &serde_json::json!({}), &outcome);
        assert_eq!(world, before);
    }

    #[test]
    fn unknown_action_is_noop() {
        let mut world = world_with_node();
        let before = world.clone();
        apply_ok(
            &mut world,
            serde_json::json!({"action": "teleportNode", "prototypeId": "p1"}),
        );
        assert_eq!(world, before);
    }

    #[test]
    fn projection_is_idempotent() {
        let payload = serde_json::json!({
            "action": "createNode",
            "prototypeId": "p9",
            "instanceId": "i9",
            "graphId": "g1",
            "name": "Hera"
        });
        let mut world = world_with_node();
        apply_ok(&mut world, payload.clone());
        let once = world.clone();
        apply_ok(&mut world, payload);
        assert_eq!(world, once);
    }
}
