//! Capability-filtered projection of the roadmap.
//!
//! A [`GraphView`] borrows the live graph; it never copies it. Nodes and edges
//! whose kind requires a capability the agent lacks are invisible, and an edge
//! is only visible when both endpoints are.

use std::collections::BTreeSet;

use crate::core::graph::RoadmapGraph;
use crate::core::types::{CapabilitySet, Edge, Node, NodeId};

#[derive(Debug, Clone)]
pub struct GraphView<'g> {
    graph: &'g RoadmapGraph,
    capabilities: CapabilitySet,
}

impl<'g> GraphView<'g> {
    pub fn new(graph: &'g RoadmapGraph, capabilities: CapabilitySet) -> Self {
        Self {
            graph,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn node(&self, id: NodeId) -> Option<&'g Node> {
        self.graph
            .node(id)
            .filter(|node| self.capabilities.contains(&node.tag().required_capability()))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &'g Node> + '_ {
        self.graph
            .nodes()
            .filter(|node| self.capabilities.contains(&node.tag().required_capability()))
    }

    fn edge_visible(&self, edge: &Edge) -> bool {
        self.capabilities.contains(&edge.kind.required_capability())
            && self.contains_node(edge.a)
            && self.contains_node(edge.b)
    }

    /// Visible edges incident to `id`; empty when `id` itself is hidden.
    pub fn edges_of(&self, id: NodeId) -> impl Iterator<Item = &'g Edge> + '_ {
        let visible = self.contains_node(id);
        self.graph
            .edges_of(id)
            .filter(move |edge| visible && self.edge_visible(edge))
    }

    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = BTreeSet::new();
        self.edges_of(id)
            .filter_map(|edge| edge.other(id))
            .filter(|other| seen.insert(*other))
            .collect()
    }

    pub fn frontiers(&self) -> impl Iterator<Item = &'g Node> + '_ {
        self.nodes().filter(|node| node.is_frontier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::{Position, Quantizer};
    use crate::core::types::{Capability, all_capabilities};

    #[test]
    fn view_hides_nodes_and_edges_without_capability() {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        let f = g
            .add_frontier(Position::new(1.0, 0.0), RoadmapGraph::SEED)
            .expect("frontier");
        let obj = g
            .add_world_object(Position::new(0.0, 1.0), "door")
            .expect("object");

        let full = g.filtered_view(&all_capabilities());
        assert_eq!(full.neighbors(RoadmapGraph::SEED), vec![f, obj]);

        let walker: CapabilitySet = [Capability::Traverse, Capability::Explore]
            .into_iter()
            .collect();
        let view = g.filtered_view(&walker);
        assert!(view.contains_node(f));
        assert!(!view.contains_node(obj));
        assert_eq!(view.neighbors(RoadmapGraph::SEED), vec![f]);
        assert_eq!(view.edges_of(obj).count(), 0);
        assert_eq!(view.frontiers().count(), 1);
    }
}
