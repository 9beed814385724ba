//! Objective catalog and derivation of candidate tasks from roadmap content.

use std::collections::BTreeMap;

use crate::core::types::{
    NodeKind, ObjectStatus, Objective, ObjectiveCategory, ObjectiveId, Task, TaskId,
};
use crate::core::view::GraphView;

pub const DEFAULT_EXPLORE_REWARD: f64 = 1.0;
pub const DEFAULT_INSPECT_REWARD: f64 = 2.0;

/// Immutable set of objectives tasks can be created for.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveCatalog {
    objectives: BTreeMap<ObjectiveId, Objective>,
    explore: ObjectiveId,
    inspect: ObjectiveId,
    labels: BTreeMap<String, ObjectiveId>,
}

impl ObjectiveCatalog {
    pub fn new(explore_reward: f64, inspect_reward: f64) -> Self {
        let explore = Objective {
            id: ObjectiveId::new("explore"),
            category: ObjectiveCategory::Explore,
            reward: explore_reward,
        };
        let inspect = Objective {
            id: ObjectiveId::new("inspect"),
            category: ObjectiveCategory::Inspect,
            reward: inspect_reward,
        };
        let mut objectives = BTreeMap::new();
        let explore_id = explore.id.clone();
        let inspect_id = inspect.id.clone();
        objectives.insert(explore_id.clone(), explore);
        objectives.insert(inspect_id.clone(), inspect);
        Self {
            objectives,
            explore: explore_id,
            inspect: inspect_id,
            labels: BTreeMap::new(),
        }
    }

    /// Register a label-specific inspection objective (`inspect:<label>`).
    pub fn with_label(mut self, label: &str, reward: f64) -> Self {
        let objective = Objective {
            id: ObjectiveId::new(format!("inspect:{label}")),
            category: ObjectiveCategory::Inspect,
            reward,
        };
        self.labels.insert(label.to_string(), objective.id.clone());
        self.objectives.insert(objective.id.clone(), objective);
        self
    }

    pub fn get(&self, id: &ObjectiveId) -> Option<&Objective> {
        self.objectives.get(id)
    }

    pub fn explore(&self) -> &ObjectiveId {
        &self.explore
    }

    /// Objective for inspecting an object with `label`, falling back to the generic one.
    pub fn for_label(&self, label: &str) -> &ObjectiveId {
        self.labels.get(label).unwrap_or(&self.inspect)
    }

    pub fn reward(&self, id: &ObjectiveId) -> f64 {
        self.get(id).map_or(0.0, |objective| objective.reward)
    }
}

impl Default for ObjectiveCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_EXPLORE_REWARD, DEFAULT_INSPECT_REWARD)
    }
}

/// Enumerate candidate tasks visible in `view`, ordered by task id:
/// one exploration task per frontier and one inspection task per pending world object.
pub fn candidate_tasks(view: &GraphView<'_>, catalog: &ObjectiveCatalog) -> Vec<Task> {
    let mut tasks: Vec<Task> = view
        .nodes()
        .filter_map(|node| match &node.kind {
            NodeKind::Frontier { .. } => Some(Task {
                id: TaskId::for_target(node.id),
                target: node.id,
                objective: catalog.explore().clone(),
                category: ObjectiveCategory::Explore,
            }),
            NodeKind::WorldObject {
                label,
                status: ObjectStatus::Pending,
            } => Some(Task {
                id: TaskId::for_target(node.id),
                target: node.id,
                objective: catalog.for_label(label).clone(),
                category: ObjectiveCategory::Inspect,
            }),
            _ => None,
        })
        .collect();
    tasks.sort_by_key(|task| task.id);
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::RoadmapGraph;
    use crate::core::position::{Position, Quantizer};
    use crate::core::types::{Capability, CapabilitySet, all_capabilities};

    fn graph() -> RoadmapGraph {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        g.add_frontier(Position::new(1.0, 0.0), RoadmapGraph::SEED)
            .expect("frontier");
        g.add_world_object(Position::new(0.0, 1.0), "door")
            .expect("door");
        let done = g
            .add_world_object(Position::new(0.0, -1.0), "sign")
            .expect("sign");
        g.mark_world_object(done, ObjectStatus::Inspected)
            .expect("mark");
        g
    }

    #[test]
    fn candidates_cover_frontiers_and_pending_objects() {
        let g = graph();
        let catalog = ObjectiveCatalog::default().with_label("door", 5.0);
        let tasks = candidate_tasks(&g.filtered_view(&all_capabilities()), &catalog);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].category, ObjectiveCategory::Explore);
        assert_eq!(tasks[0].objective, ObjectiveId::new("explore"));
        assert_eq!(tasks[1].objective, ObjectiveId::new("inspect:door"));
        assert_eq!(catalog.reward(&tasks[1].objective), 5.0);
    }

    #[test]
    fn candidates_respect_capability_filter() {
        let g = graph();
        let explorer: CapabilitySet = [Capability::Traverse, Capability::Explore]
            .into_iter()
            .collect();
        let tasks = candidate_tasks(&g.filtered_view(&explorer), &ObjectiveCatalog::default());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].category, ObjectiveCategory::Explore);
    }
}
