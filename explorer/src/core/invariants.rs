//! Structural invariants of the roadmap.

use std::collections::HashMap;

use crate::core::graph::RoadmapGraph;
use crate::core::types::{EdgeKind, NodeKind, NodeTag};

/// Check roadmap invariants:
/// - Edge endpoints exist, differ, and match the edge kind
/// - Every frontier has exactly one incident edge, a frontier edge to its parent
/// - Every world object has exactly one incident world object edge
/// - No two waypoints share a quantized position
/// - Agent pointers reference waypoints
/// - Ids are below the allocation counters
pub fn validate_invariants(graph: &RoadmapGraph) -> Vec<String> {
    let mut errors = Vec::new();
    let (next_node, next_edge) = graph.next_ids();

    for edge in graph.edges() {
        if edge.id.0 >= next_edge {
            errors.push(format!("{}: id is not below next_edge_id {}", edge.id, next_edge));
        }
        if edge.a == edge.b {
            errors.push(format!("{}: self loop on {}", edge.id, edge.a));
            continue;
        }
        let (Some(a), Some(b)) = (graph.node(edge.a), graph.node(edge.b)) else {
            errors.push(format!(
                "{}: endpoint missing ({} - {})",
                edge.id, edge.a, edge.b
            ));
            continue;
        };
        let mut tags = [a.tag(), b.tag()];
        tags.sort();
        let expected = match edge.kind {
            EdgeKind::Waypoint => [NodeTag::Waypoint, NodeTag::Waypoint],
            EdgeKind::Frontier => [NodeTag::Waypoint, NodeTag::Frontier],
            EdgeKind::WorldObject => [NodeTag::Waypoint, NodeTag::WorldObject],
        };
        if tags != expected {
            errors.push(format!(
                "{}: {} connects {:?} and {:?}",
                edge.id,
                edge.kind,
                a.tag(),
                b.tag()
            ));
        }
    }

    let mut waypoint_keys = HashMap::new();
    for node in graph.nodes() {
        if node.id.0 >= next_node {
            errors.push(format!("{}: id is not below next_node_id {}", node.id, next_node));
        }
        let incident: Vec<_> = graph.edges_of(node.id).collect();
        match &node.kind {
            NodeKind::Waypoint => {
                let key = graph.quantizer().key(&node.position);
                if let Some(other) = waypoint_keys.insert(key, node.id) {
                    errors.push(format!(
                        "{}: shares position {} with waypoint {}",
                        node.id, node.position, other
                    ));
                }
            }
            NodeKind::Frontier { parent } => {
                if incident.len() != 1 {
                    errors.push(format!(
                        "{}: frontier has {} incident edges, expected 1",
                        node.id,
                        incident.len()
                    ));
                }
                for edge in &incident {
                    if edge.kind != EdgeKind::Frontier || edge.other(node.id) != Some(*parent) {
                        errors.push(format!(
                            "{}: frontier must connect to parent {} via a frontier edge",
                            node.id, parent
                        ));
                    }
                }
            }
            NodeKind::WorldObject { .. } => {
                let linked = incident
                    .iter()
                    .filter(|edge| edge.kind == EdgeKind::WorldObject)
                    .count();
                if incident.len() != 1 || linked != 1 {
                    errors.push(format!(
                        "{}: world object must have exactly one world object edge",
                        node.id
                    ));
                }
            }
        }
    }

    for (agent, waypoint) in graph.agents() {
        match graph.node(waypoint) {
            Some(node) if node.is_waypoint() => {}
            _ => errors.push(format!("agent {}: {} is not a waypoint", agent, waypoint)),
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::{Position, Quantizer};
    use crate::core::snapshot::AgentRecord;
    use crate::core::types::{AgentId, Edge, EdgeId, NodeId};

    fn sample() -> RoadmapGraph {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::new(0.5));
        let w = g
            .add_waypoint(Position::new(1.0, 0.0), RoadmapGraph::SEED)
            .expect("waypoint");
        g.add_frontier(Position::new(2.0, 0.0), w).expect("frontier");
        g.add_world_object(Position::new(1.0, 1.0), "door").expect("object");
        g
    }

    #[test]
    fn built_graph_satisfies_invariants() {
        assert!(validate_invariants(&sample()).is_empty());
    }

    #[test]
    fn frontier_with_two_edges_is_reported() {
        let mut snapshot = sample().snapshot();
        let frontier = snapshot
            .nodes
            .iter()
            .find(|node| node.is_frontier())
            .map(|node| node.id)
            .expect("frontier");
        snapshot.edges.push(Edge {
            id: EdgeId(snapshot.next_edge_id),
            kind: EdgeKind::Frontier,
            a: RoadmapGraph::SEED,
            b: frontier,
        });
        snapshot.next_edge_id += 1;

        let err = RoadmapGraph::from_snapshot(&snapshot).expect_err("invalid");
        assert!(err.to_string().contains("incident edges"));
    }

    #[test]
    fn duplicate_waypoint_position_is_reported() {
        let mut snapshot = sample().snapshot();
        let mut dup = snapshot.nodes[0].clone();
        dup.id = NodeId(snapshot.next_node_id);
        dup.position = Position::new(0.1, 0.0);
        snapshot.nodes.push(dup.clone());
        snapshot.edges.push(Edge {
            id: EdgeId(snapshot.next_edge_id),
            kind: EdgeKind::Waypoint,
            a: RoadmapGraph::SEED,
            b: dup.id,
        });
        snapshot.next_node_id += 1;
        snapshot.next_edge_id += 1;

        let err = RoadmapGraph::from_snapshot(&snapshot).expect_err("invalid");
        assert!(err.to_string().contains("shares position"));
    }

    #[test]
    fn agent_on_frontier_is_reported() {
        let mut snapshot = sample().snapshot();
        let frontier = snapshot
            .nodes
            .iter()
            .find(|node| node.is_frontier())
            .map(|node| node.id)
            .expect("frontier");
        snapshot.agents.push(AgentRecord {
            agent: AgentId::new("a"),
            waypoint: frontier,
        });
        let err = RoadmapGraph::from_snapshot(&snapshot).expect_err("invalid");
        assert!(err.to_string().contains("is not a waypoint"));
    }

    #[test]
    fn mismatched_edge_kind_is_reported() {
        let mut snapshot = sample().snapshot();
        for edge in &mut snapshot.edges {
            if edge.kind == EdgeKind::Waypoint {
                edge.kind = EdgeKind::WorldObject;
            }
        }
        let err = RoadmapGraph::from_snapshot(&snapshot).expect_err("invalid");
        assert!(err.to_string().contains("world_object_edge connects"));
    }
}
