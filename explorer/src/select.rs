//! One-shot task selection for `explorer select`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::behavior::BehaviorTable;
use crate::core::allocator::{Allocation, ClaimRegistry, TaskAllocator};
use crate::core::graph::RoadmapGraph;
use crate::core::planner::find_plan_for_task;
use crate::core::types::{AgentId, NodeId, Task};
use crate::io::config::MissionConfig;
use crate::io::snapshot_store::load_snapshot;

/// Structured selection outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// No frontiers remain.
    Complete,
    /// A task would be claimed.
    Selected(SelectedTask),
    /// Frontiers remain but the agent can reach none of them.
    Stalled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTask {
    pub task: Task,
    /// Waypoint the agent would start from.
    pub from: NodeId,
    /// Edges in the plan toward the target.
    pub steps: usize,
}

/// Select the next task for `agent` on an in-memory roadmap.
///
/// Uses a private claim registry, so nothing is reserved. Agents missing from
/// the roadmap start at the seed waypoint.
pub fn select_task(
    graph: &RoadmapGraph,
    config: &MissionConfig,
    agent: &AgentId,
) -> Result<SelectOutcome> {
    if graph.has_no_frontiers() {
        return Ok(SelectOutcome::Complete);
    }
    let from = graph.agent_waypoint(agent).unwrap_or_else(|| {
        debug!(%agent, "agent not on roadmap; starting from seed");
        RoadmapGraph::SEED
    });
    let view = graph.filtered_view(&config.capabilities());
    let catalog = config.objectives.catalog();
    let mut allocator = TaskAllocator::new(
        config.allocation.strategy,
        config.allocation.seed,
        Arc::new(ClaimRegistry::new()),
    );
    let task = match allocator.allocate(agent, from, &view, &catalog) {
        Allocation::Claimed(task) => task,
        Allocation::AllClaimed | Allocation::NoneEligible => return Ok(SelectOutcome::Stalled),
    };
    let plan = find_plan_for_task(from, &view, &task, &BehaviorTable::standard())
        .with_context(|| format!("plan toward {}", task.target))?;
    Ok(SelectOutcome::Selected(SelectedTask {
        task,
        from,
        steps: plan.len(),
    }))
}

/// Load a snapshot from disk and select the next task.
pub fn select_from_snapshot(
    path: &Path,
    config: &MissionConfig,
    agent: &AgentId,
) -> Result<SelectOutcome> {
    let graph = load_snapshot(path).context("load snapshot for selection")?;
    select_task(&graph, config, agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::{Position, Quantizer};
    use crate::core::types::Capability;
    use crate::test_support::path_roadmap;

    #[test]
    fn select_reports_complete_without_frontiers() {
        let graph = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        let outcome =
            select_task(&graph, &MissionConfig::default(), &AgentId::new("a")).expect("select");
        assert_eq!(outcome, SelectOutcome::Complete);
    }

    #[test]
    fn select_plans_from_agent_waypoint() {
        let (mut graph, ids) = path_roadmap(3);
        graph
            .register_agent(AgentId::new("a"), ids[2])
            .expect("register");
        let outcome =
            select_task(&graph, &MissionConfig::default(), &AgentId::new("a")).expect("select");
        let SelectOutcome::Selected(selected) = outcome else {
            panic!("expected a selection, got {outcome:?}");
        };
        assert_eq!(selected.task.target, ids[4]);
        assert_eq!(selected.from, ids[2]);
        assert_eq!(selected.steps, 2);
    }

    #[test]
    fn select_stalls_without_explore_capability() {
        let (graph, _) = path_roadmap(1);
        let mut config = MissionConfig::default();
        config.agent.capabilities = vec![Capability::Traverse];
        let outcome = select_task(&graph, &config, &AgentId::new("a")).expect("select");
        assert_eq!(outcome, SelectOutcome::Stalled);
    }
}
