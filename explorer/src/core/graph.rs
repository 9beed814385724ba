//! The roadmap: an undirected multigraph of waypoints, frontiers, and world objects.
//!
//! [`RoadmapGraph`] is the single owner of node and edge data. Every mutation
//! goes through one of its methods, which keep three invariants:
//!
//! - every frontier has exactly one incident edge, a frontier edge to the
//!   waypoint it was observed from;
//! - no two waypoints share a (quantized) position;
//! - node and edge ids are never reused.
//!
//! Iteration order is by id everywhere, so selection and search built on top
//! of the graph stay deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;
use tracing::debug;

use crate::core::invariants::validate_invariants;
use crate::core::position::{Position, PositionKey, Quantizer};
use crate::core::snapshot::{AgentRecord, GraphSnapshot, SNAPSHOT_VERSION, SnapshotError};
use crate::core::types::{
    AgentId, CapabilitySet, Edge, EdgeId, EdgeKind, Node, NodeId, NodeKind, ObjectStatus,
};
use crate::core::view::GraphView;

/// Errors raised by roadmap mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("a waypoint already occupies this position ({existing})")]
    DuplicatePosition { existing: NodeId },
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("node {0} is not a waypoint")]
    NotAWaypoint(NodeId),
    #[error("node {0} is not a frontier")]
    NotAFrontier(NodeId),
    #[error("node {0} is not a world object")]
    NotAWorldObject(NodeId),
    #[error("roadmap has no waypoint")]
    NoWaypoint,
}

/// The belief graph shared by every agent of a mission.
#[derive(Debug, Clone)]
pub struct RoadmapGraph {
    quantizer: Quantizer,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    adjacency: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    positions: HashMap<PositionKey, BTreeSet<NodeId>>,
    agents: BTreeMap<AgentId, NodeId>,
    next_node: u64,
    next_edge: u64,
}

impl RoadmapGraph {
    /// The id of the seed waypoint every roadmap starts with.
    pub const SEED: NodeId = NodeId(0);

    /// Create a roadmap holding a single seed waypoint at `seed`.
    pub fn new(seed: Position, quantizer: Quantizer) -> Self {
        let mut graph = Self {
            quantizer,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            positions: HashMap::new(),
            agents: BTreeMap::new(),
            next_node: 0,
            next_edge: 0,
        };
        graph.insert_node(seed, NodeKind::Waypoint);
        graph
    }

    pub fn quantizer(&self) -> Quantizer {
        self.quantizer
    }

    /// Place `agent` on waypoint `at`. Re-registering moves the pointer.
    pub fn register_agent(&mut self, agent: AgentId, at: NodeId) -> Result<(), GraphError> {
        self.require_waypoint(at)?;
        self.agents.insert(agent, at);
        Ok(())
    }

    /// Move the "current waypoint" pointer of a registered (or new) agent.
    pub fn set_agent_waypoint(&mut self, agent: &AgentId, at: NodeId) -> Result<(), GraphError> {
        self.register_agent(agent.clone(), at)
    }

    pub fn agent_waypoint(&self, agent: &AgentId) -> Option<NodeId> {
        self.agents.get(agent).copied()
    }

    pub fn agents(&self) -> impl Iterator<Item = (&AgentId, NodeId)> {
        self.agents.iter().map(|(agent, node)| (agent, *node))
    }

    /// Insert a waypoint linked to `parent`.
    ///
    /// Fails with [`GraphError::DuplicatePosition`] when a waypoint already
    /// occupies `position`; the graph is left untouched in that case.
    pub fn try_add_waypoint(
        &mut self,
        position: Position,
        parent: NodeId,
    ) -> Result<NodeId, GraphError> {
        self.require_waypoint(parent)?;
        if let Some(existing) = self.find_waypoint_at(&position) {
            return Err(GraphError::DuplicatePosition { existing });
        }
        let id = self.insert_node(position, NodeKind::Waypoint);
        self.link(EdgeKind::Waypoint, parent, id);
        debug!(node = %id, parent = %parent, %position, "waypoint added");
        Ok(id)
    }

    /// Insert a waypoint linked to `parent`, treating a duplicate position as a no-op.
    ///
    /// A duplicate returns the existing waypoint id. If the existing waypoint
    /// is not yet adjacent to `parent`, the two are linked (loop closure).
    pub fn add_waypoint(&mut self, position: Position, parent: NodeId) -> Result<NodeId, GraphError> {
        match self.try_add_waypoint(position, parent) {
            Ok(id) => Ok(id),
            Err(GraphError::DuplicatePosition { existing }) => {
                if existing != parent && !self.adjacent(existing, parent) {
                    self.link(EdgeKind::Waypoint, parent, existing);
                    debug!(node = %existing, parent = %parent, "loop closed on revisited waypoint");
                }
                Ok(existing)
            }
            Err(err) => Err(err),
        }
    }

    /// Insert a frontier observed from `parent_waypoint`, with its single frontier edge.
    pub fn add_frontier(
        &mut self,
        position: Position,
        parent_waypoint: NodeId,
    ) -> Result<NodeId, GraphError> {
        self.require_waypoint(parent_waypoint)?;
        let id = self.insert_node(
            position,
            NodeKind::Frontier {
                parent: parent_waypoint,
            },
        );
        self.link(EdgeKind::Frontier, parent_waypoint, id);
        debug!(node = %id, parent = %parent_waypoint, %position, "frontier added");
        Ok(id)
    }

    /// Insert a world object linked to the nearest waypoint.
    ///
    /// A pending or finished object with the same label at the same position
    /// is returned instead of inserting a duplicate.
    pub fn add_world_object(
        &mut self,
        position: Position,
        label: &str,
    ) -> Result<NodeId, GraphError> {
        let key = self.quantizer.key(&position);
        if let Some(existing) = self.nodes_at_key(&key).find(|node| {
            matches!(&node.kind, NodeKind::WorldObject { label: l, .. } if l == label)
        }) {
            return Ok(existing.id);
        }
        let anchor = self.nearest_waypoint(&position).ok_or(GraphError::NoWaypoint)?;
        let id = self.insert_node(
            position,
            NodeKind::WorldObject {
                label: label.to_string(),
                status: ObjectStatus::Pending,
            },
        );
        self.link(EdgeKind::WorldObject, anchor, id);
        debug!(node = %id, anchor = %anchor, label, %position, "world object added");
        Ok(id)
    }

    /// Update the lifecycle status of a world object.
    pub fn mark_world_object(&mut self, id: NodeId, status: ObjectStatus) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        match &mut node.kind {
            NodeKind::WorldObject { status: current, .. } => {
                *current = status;
                Ok(())
            }
            _ => Err(GraphError::NotAWorldObject(id)),
        }
    }

    /// Remove a frontier and its edge.
    pub fn retire_frontier(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::NotAFrontier(id))?;
        if !node.is_frontier() {
            return Err(GraphError::NotAFrontier(id));
        }
        self.remove_node(id);
        debug!(node = %id, remaining = self.frontier_count(), "frontier retired");
        Ok(())
    }

    /// Convert a visited frontier into a waypoint linked to the frontier's parent,
    /// then retire the frontier. Returns the waypoint id.
    pub fn promote_frontier(&mut self, id: NodeId) -> Result<NodeId, GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::NotAFrontier(id))?;
        let NodeKind::Frontier { parent } = node.kind else {
            return Err(GraphError::NotAFrontier(id));
        };
        let position = node.position;
        let waypoint = self.add_waypoint(position, parent)?;
        self.retire_frontier(id)?;
        Ok(waypoint)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges incident to `id`, in edge id order.
    pub fn edges_of(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.adjacency
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|edge_id| self.edges.get(edge_id))
    }

    /// Nodes adjacent to `id`, in edge id order (a neighbor reached by two
    /// parallel edges appears once).
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = BTreeSet::new();
        self.edges_of(id)
            .filter_map(|edge| edge.other(id))
            .filter(|other| seen.insert(*other))
            .collect()
    }

    pub fn adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.edges_of(a).any(|edge| edge.other(a) == Some(b))
    }

    /// Any node at `position`, preferring a waypoint, otherwise the lowest id.
    pub fn find_by_position(&self, position: &Position) -> Option<NodeId> {
        let key = self.quantizer.key(position);
        self.find_waypoint_at(position)
            .or_else(|| self.positions.get(&key)?.first().copied())
    }

    pub fn find_waypoint_at(&self, position: &Position) -> Option<NodeId> {
        let key = self.quantizer.key(position);
        self.nodes_at_key(&key)
            .find(|node| node.is_waypoint())
            .map(|node| node.id)
    }

    /// A waypoint or frontier at `position`. World objects do not mark a place as known.
    pub fn find_place_at(&self, position: &Position) -> Option<NodeId> {
        self.find_waypoint_at(position).or_else(|| {
            let key = self.quantizer.key(position);
            self.nodes_at_key(&key)
                .find(|node| node.is_frontier())
                .map(|node| node.id)
        })
    }

    pub fn all_frontiers(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.is_frontier())
            .map(|node| node.id)
            .collect()
    }

    pub fn frontier_count(&self) -> usize {
        self.nodes.values().filter(|node| node.is_frontier()).count()
    }

    /// Exploration is complete exactly when no frontier remains.
    pub fn has_no_frontiers(&self) -> bool {
        !self.nodes.values().any(Node::is_frontier)
    }

    /// Read-only projection restricted to what `capabilities` allow.
    pub fn filtered_view(&self, capabilities: &CapabilitySet) -> GraphView<'_> {
        GraphView::new(self, capabilities.clone())
    }

    /// Export ids, payloads, and agent pointers for persistence or display.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            version: SNAPSHOT_VERSION,
            resolution: self.quantizer.resolution(),
            next_node_id: self.next_node,
            next_edge_id: self.next_edge,
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().copied().collect(),
            agents: self
                .agents
                .iter()
                .map(|(agent, node)| AgentRecord {
                    agent: agent.clone(),
                    waypoint: *node,
                })
                .collect(),
        }
    }

    /// Rebuild a roadmap from a snapshot, preserving every identifier.
    ///
    /// The rebuilt graph is checked against the roadmap invariants.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        let mut graph = Self {
            quantizer: Quantizer::new(snapshot.resolution),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            positions: HashMap::new(),
            agents: BTreeMap::new(),
            next_node: snapshot.next_node_id,
            next_edge: snapshot.next_edge_id,
        };
        for node in &snapshot.nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(SnapshotError::DuplicateNode(node.id));
            }
            graph.index_node(node.clone());
        }
        for edge in &snapshot.edges {
            if graph.edges.contains_key(&edge.id) {
                return Err(SnapshotError::DuplicateEdge(edge.id));
            }
            graph.index_edge(*edge);
        }
        for record in &snapshot.agents {
            graph.agents.insert(record.agent.clone(), record.waypoint);
        }
        let errors = validate_invariants(&graph);
        if !errors.is_empty() {
            return Err(SnapshotError::Invariants(errors));
        }
        Ok(graph)
    }

    pub(crate) fn next_ids(&self) -> (u64, u64) {
        (self.next_node, self.next_edge)
    }

    fn require_waypoint(&self, id: NodeId) -> Result<(), GraphError> {
        match self.nodes.get(&id) {
            Some(node) if node.is_waypoint() => Ok(()),
            Some(_) => Err(GraphError::NotAWaypoint(id)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    fn nodes_at_key(&self, key: &PositionKey) -> impl Iterator<Item = &Node> {
        self.positions
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
    }

    fn nearest_waypoint(&self, position: &Position) -> Option<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.is_waypoint())
            .min_by(|a, b| {
                a.position
                    .distance_to(position)
                    .total_cmp(&b.position.distance_to(position))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|node| node.id)
    }

    fn insert_node(&mut self, position: Position, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.index_node(Node { id, position, kind });
        id
    }

    fn index_node(&mut self, node: Node) {
        let key = self.quantizer.key(&node.position);
        self.positions.entry(key).or_default().insert(node.id);
        self.adjacency.entry(node.id).or_default();
        self.nodes.insert(node.id, node);
    }

    fn link(&mut self, kind: EdgeKind, a: NodeId, b: NodeId) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.index_edge(Edge { id, kind, a, b });
        id
    }

    fn index_edge(&mut self, edge: Edge) {
        self.adjacency.entry(edge.a).or_default().insert(edge.id);
        self.adjacency.entry(edge.b).or_default().insert(edge.id);
        self.edges.insert(edge.id, edge);
    }

    fn remove_node(&mut self, id: NodeId) {
        let incident = self.adjacency.remove(&id).unwrap_or_default();
        for edge_id in incident {
            let Some(edge) = self.edges.remove(&edge_id) else {
                continue;
            };
            let other = edge.other(id).unwrap_or(id);
            if let Some(set) = self.adjacency.get_mut(&other) {
                set.remove(&edge_id);
            }
        }
        if let Some(node) = self.nodes.remove(&id) {
            let key = self.quantizer.key(&node.position);
            if let Some(ids) = self.positions.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.positions.remove(&key);
                }
            }
        }
    }
}
