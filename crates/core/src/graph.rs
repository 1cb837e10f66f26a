//! The in-memory knowledge-graph projection.
//!
//! [`WorldStateProjection`] mirrors the authoritative graph store for the
//! duration of one run so that later tool calls see entities earlier calls
//! just created or renamed, before the real store round-trips. It is a
//! same-run preview, never a source of truth: an external collaborator
//! reconciles it against the persistent store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A graph: a canvas of node instances, edges, and groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Instance ids placed on this graph, in insertion order.
    #[serde(default)]
    pub instance_ids: Vec<String>,
    /// Edge ids belonging to this graph.
    #[serde(default)]
    pub edge_ids: Vec<String>,
}

/// A node prototype: the shared identity behind one or more instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePrototype {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Graphs that define this prototype's interior (set by expandGraph).
    #[serde(default)]
    pub definition_graph_ids: Vec<String>,
}

/// A placement of a prototype on a specific graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: String,
    pub prototype_id: String,
    pub graph_id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A directed edge between two instances on a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub graph_id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// A named grouping of instances on a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub graph_id: String,
    pub name: String,
    #[serde(default)]
    pub member_instance_ids: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// The in-memory mirror of graph state for one run.
///
/// Owned by the caller for the run's duration, passed by reference, and
/// mutated in place by the projector after each successful tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldStateProjection {
    pub graphs: HashMap<String, GraphRecord>,
    pub node_prototypes: HashMap<String, NodePrototype>,
    pub active_graph_id: Option<String>,
    pub instances: HashMap<String, NodeInstance>,
    pub edges: HashMap<String, EdgeRecord>,
    pub groups: HashMap<String, GroupRecord>,
}

impl WorldStateProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active graph, if any.
    pub fn active_graph(&self) -> Option<&GraphRecord> {
        self.active_graph_id
            .as_deref()
            .and_then(|id| self.graphs.get(id))
    }

    /// Resolve a graph by id, or by case-insensitive name.
    pub fn resolve_graph(&self, reference: &str) -> Option<&GraphRecord> {
        self.graphs.get(reference).or_else(|| {
            self.graphs
                .values()
                .find(|g| g.name.eq_ignore_ascii_case(reference))
        })
    }

    /// Resolve a prototype by id, or by case-insensitive name.
    pub fn resolve_prototype(&self, reference: &str) -> Option<&NodePrototype> {
        self.node_prototypes.get(reference).or_else(|| {
            self.node_prototypes
                .values()
                .find(|p| p.name.eq_ignore_ascii_case(reference))
        })
    }

    /// Find an instance of the given prototype on the given graph.
    pub fn instance_of(&self, prototype_id: &str, graph_id: &str) -> Option<&NodeInstance> {
        self.instances
            .values()
            .find(|i| i.prototype_id == prototype_id && i.graph_id == graph_id)
    }

    /// Resolve an edge by id.
    pub fn resolve_edge(&self, reference: &str) -> Option<&EdgeRecord> {
        self.edges.get(reference)
    }

    /// Resolve a group by id, or by case-insensitive name.
    pub fn resolve_group(&self, reference: &str) -> Option<&GroupRecord> {
        self.groups.get(reference).or_else(|| {
            self.groups
                .values()
                .find(|g| g.name.eq_ignore_ascii_case(reference))
        })
    }

    /// Number of instances placed on the given graph.
    pub fn instance_count(&self, graph_id: &str) -> usize {
        self.instances
            .values()
            .filter(|i| i.graph_id == graph_id)
            .count()
    }
}
