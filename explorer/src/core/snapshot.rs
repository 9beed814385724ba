//! Read-only graph snapshot exchanged with persistence and display consumers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{AgentId, Edge, EdgeId, Node, NodeId};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to rebuild a roadmap with identical identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    /// Quantization resolution the graph was built with.
    pub resolution: f64,
    pub next_node_id: u64,
    pub next_edge_id: u64,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub agents: Vec<AgentRecord>,
}

/// Current waypoint of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent: AgentId,
    pub waypoint: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("duplicate edge id {0}")]
    DuplicateEdge(EdgeId),
    #[error("roadmap invariants failed: {}", .0.join("; "))]
    Invariants(Vec<String>),
}

impl GraphSnapshot {
    pub fn frontier_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_frontier()).count()
    }

    pub fn waypoint_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_waypoint()).count()
    }

    pub fn world_object_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_world_object()).count()
    }
}
