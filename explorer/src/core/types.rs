//! Shared deterministic types for the roadmap core.
//!
//! These types define stable contracts between core components. They carry no
//! I/O and serialize to the snapshot format.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::position::Position;

/// Identifier of a roadmap node. Allocated from a single monotonic counter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifier of a roadmap edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Identifier of an agent operating on the roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something an agent is able to do. Each node and edge kind requires one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Move between visited waypoints.
    Traverse,
    /// Move onto unvisited frontiers.
    Explore,
    /// Inspect perceived world objects.
    Inspect,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Traverse,
        Capability::Explore,
        Capability::Inspect,
    ];
}

/// Capabilities held by one agent.
pub type CapabilitySet = BTreeSet<Capability>;

/// Every capability; the default for a single general-purpose agent.
pub fn all_capabilities() -> CapabilitySet {
    Capability::ALL.into_iter().collect()
}

/// Lifecycle of a perceived world object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    Pending,
    Inspected,
    Unreachable,
}

/// Node payload, one variant per node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A place the agent has physically visited.
    Waypoint,
    /// An observed but unvisited place, attached to the waypoint it was seen from.
    Frontier { parent: NodeId },
    /// A perceived point of interest.
    WorldObject { label: String, status: ObjectStatus },
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Waypoint => NodeTag::Waypoint,
            NodeKind::Frontier { .. } => NodeTag::Frontier,
            NodeKind::WorldObject { .. } => NodeTag::WorldObject,
        }
    }
}

/// Payload-free node type, used in snapshots and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTag {
    Waypoint,
    Frontier,
    WorldObject,
}

impl NodeTag {
    pub fn required_capability(self) -> Capability {
        match self {
            NodeTag::Waypoint => Capability::Traverse,
            NodeTag::Frontier => Capability::Explore,
            NodeTag::WorldObject => Capability::Inspect,
        }
    }
}

/// A roadmap node. Only [`crate::core::graph::RoadmapGraph`] creates or mutates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }

    pub fn is_waypoint(&self) -> bool {
        matches!(self.kind, NodeKind::Waypoint)
    }

    pub fn is_frontier(&self) -> bool {
        matches!(self.kind, NodeKind::Frontier { .. })
    }

    pub fn is_world_object(&self) -> bool {
        matches!(self.kind, NodeKind::WorldObject { .. })
    }
}

/// Edge type. Determines which behavior traverses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Waypoint,
    Frontier,
    WorldObject,
}

impl EdgeKind {
    pub fn required_capability(self) -> Capability {
        match self {
            EdgeKind::Waypoint => Capability::Traverse,
            EdgeKind::Frontier => Capability::Explore,
            EdgeKind::WorldObject => Capability::Inspect,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EdgeKind::Waypoint => "waypoint_edge",
            EdgeKind::Frontier => "frontier_edge",
            EdgeKind::WorldObject => "world_object_edge",
        };
        f.write_str(name)
    }
}

/// Undirected typed relation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub a: NodeId,
    pub b: NodeId,
}

impl Edge {
    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.a == node {
            Some(self.b)
        } else if self.b == node {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }
}

/// Identifier of an objective in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectiveId(pub String);

impl ObjectiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveCategory {
    Explore,
    Inspect,
}

/// Immutable catalog entry describing why a task is worth doing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub category: ObjectiveCategory,
    pub reward: f64,
}

/// Identifier of a task. Derived from the target node, so the same target
/// always yields the same task id across planning cycles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn for_target(target: NodeId) -> Self {
        Self(target.0)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A unit of intent: reach (and act on) `target` for `objective`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub target: NodeId,
    pub objective: ObjectiveId,
    pub category: ObjectiveCategory,
}

/// Name of an external behavior, as published by the behavior table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorId(pub String);

impl BehaviorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
