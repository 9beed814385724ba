//! Roadmap shared between concurrently running agents.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::graph::RoadmapGraph;
use crate::core::snapshot::GraphSnapshot;

/// A [`RoadmapGraph`] behind a reader/writer lock.
///
/// Every mutation happens under the write guard, so readers never observe a
/// half-applied change. Hold guards only for graph work, never across robot calls.
#[derive(Debug)]
pub struct SharedRoadmap {
    graph: RwLock<RoadmapGraph>,
}

impl SharedRoadmap {
    pub fn new(graph: RoadmapGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, RoadmapGraph> {
        self.graph.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, RoadmapGraph> {
        self.graph.write()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.read().snapshot()
    }

    pub fn into_inner(self) -> RoadmapGraph {
        self.graph.into_inner()
    }
}
