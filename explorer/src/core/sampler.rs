//! Turns local observations into frontier and world-object nodes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::graph::{GraphError, RoadmapGraph};
use crate::core::position::Position;
use crate::core::types::NodeId;

/// A perceived point of interest reported by the perception collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObjectSighting {
    pub position: Position,
    pub label: String,
}

/// Insert a frontier for every observed position not already held by a waypoint or frontier.
///
/// Positions are processed in the order they were reported. Occupancy is
/// decided by quantized position, so two observations of the same cell in one
/// batch yield one frontier. A world object sighted at a position does not
/// count as knowing the place. Returns the new frontier ids in insertion order.
pub fn sample(
    observed_positions: &[Position],
    agent_at: NodeId,
    graph: &mut RoadmapGraph,
) -> Result<Vec<NodeId>, GraphError> {
    let mut added = Vec::new();
    for position in observed_positions {
        if graph.find_place_at(position).is_some() {
            continue;
        }
        added.push(graph.add_frontier(*position, agent_at)?);
    }
    if !added.is_empty() {
        debug!(count = added.len(), from = %agent_at, "frontiers sampled");
    }
    Ok(added)
}

/// Record world-object sightings; repeated sightings resolve to the existing node.
pub fn record_sightings(
    sightings: &[WorldObjectSighting],
    graph: &mut RoadmapGraph,
) -> Result<Vec<NodeId>, GraphError> {
    sightings
        .iter()
        .map(|sighting| graph.add_world_object(sighting.position, &sighting.label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::Quantizer;

    #[test]
    fn sample_adds_frontier_parented_to_agent_waypoint() {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        let added = sample(&[Position::new(4.0, 0.0)], RoadmapGraph::SEED, &mut g).expect("sample");
        assert_eq!(added.len(), 1);
        assert_eq!(g.frontier_count(), 1);
        assert_eq!(g.neighbors(added[0]), vec![RoadmapGraph::SEED]);
    }

    #[test]
    fn sample_skips_known_positions_and_in_batch_duplicates() {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::new(0.1));
        let observed = [
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.01, 0.02),
            Position::new(0.0, 1.0),
        ];
        let added = sample(&observed, RoadmapGraph::SEED, &mut g).expect("sample");
        assert_eq!(added.len(), 2);

        let again = sample(&observed, RoadmapGraph::SEED, &mut g).expect("resample");
        assert!(again.is_empty());
        assert_eq!(g.frontier_count(), 2);
    }

    #[test]
    fn sighted_object_does_not_hide_its_cell() {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        let object = g
            .add_world_object(Position::new(2.0, 0.0), "valve")
            .expect("object");
        let added = sample(&[Position::new(2.0, 0.0)], RoadmapGraph::SEED, &mut g).expect("sample");
        assert_eq!(added.len(), 1);
        assert_ne!(added[0], object);
        assert_eq!(g.find_place_at(&Position::new(2.0, 0.0)), Some(added[0]));
    }

    #[test]
    fn repeated_sightings_do_not_duplicate_objects() {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        let sighting = WorldObjectSighting {
            position: Position::new(1.0, 1.0),
            label: "fiducial".to_string(),
        };
        let first = record_sightings(std::slice::from_ref(&sighting), &mut g).expect("first");
        let second = record_sightings(&[sighting], &mut g).expect("second");
        assert_eq!(first, second);
        assert_eq!(g.node_count(), 2);
    }
}
