//! Shortest-path planning over a filtered roadmap view.
//!
//! Path cost is accumulated Euclidean edge length; equal lengths are broken by
//! hop count and then by node id, so plans are reproducible. Frontiers and
//! world objects are leaves: the search never routes through them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::graph::RoadmapGraph;
use crate::core::types::{BehaviorId, EdgeId, EdgeKind, NodeId, Task, TaskId};
use crate::core::view::GraphView;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("target node {0} not found in graph view")]
    TargetNodeNotFound(NodeId),
    #[error("start node {0} not found in graph view")]
    StartNodeNotFound(NodeId),
    #[error("could not find plan from {from} to {target}")]
    CouldNotFindPlan { from: NodeId, target: NodeId },
    #[error("no behavior registered for {0}")]
    MissingBehavior(EdgeKind),
}

/// Maps edge types to the behavior that traverses them.
///
/// Supplied by the execution side; the planner only records the ids.
pub trait BehaviorLookup {
    fn behavior_for(&self, kind: EdgeKind) -> Option<BehaviorId>;
}

impl BehaviorLookup for BTreeMap<EdgeKind, BehaviorId> {
    fn behavior_for(&self, kind: EdgeKind) -> Option<BehaviorId> {
        self.get(&kind).cloned()
    }
}

/// One edge traversal of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub edge: EdgeId,
    pub kind: EdgeKind,
    pub from: NodeId,
    pub to: NodeId,
    pub behavior: BehaviorId,
}

/// Ordered edge sequence from the agent's node to a task target, with a cursor
/// at the next unexecuted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub task: TaskId,
    pub target: NodeId,
    steps: Vec<PlanStep>,
    cursor: usize,
}

impl Plan {
    pub fn new(task: TaskId, target: NodeId, steps: Vec<PlanStep>) -> Self {
        Self {
            task,
            target,
            steps,
            cursor: 0,
        }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn next_step(&self) -> Option<&PlanStep> {
        self.steps.get(self.cursor)
    }

    /// Steps not yet executed.
    pub fn remaining(&self) -> &[PlanStep] {
        &self.steps[self.cursor.min(self.steps.len())..]
    }

    /// Move the cursor past the current step. Returns true once every step is done.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.steps.len() {
            self.cursor += 1;
        }
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len()
    }
}

/// Compute a plan from `from` to the task target within `view`.
pub fn find_plan_for_task<B: BehaviorLookup + ?Sized>(
    from: NodeId,
    view: &GraphView<'_>,
    task: &Task,
    behaviors: &B,
) -> Result<Plan, PlannerError> {
    if !view.contains_node(task.target) {
        return Err(PlannerError::TargetNodeNotFound(task.target));
    }
    if !view.contains_node(from) {
        return Err(PlannerError::StartNodeNotFound(from));
    }

    let tree = shortest_paths(view, from);
    if !tree.reaches(task.target) {
        return Err(PlannerError::CouldNotFindPlan {
            from,
            target: task.target,
        });
    }

    let mut steps = Vec::new();
    let mut node = task.target;
    while let Some((edge, prev)) = tree.parent.get(&node).copied() {
        let kind = view
            .edges_of(node)
            .find(|candidate| candidate.id == edge)
            .map(|candidate| candidate.kind)
            .ok_or(PlannerError::CouldNotFindPlan {
                from,
                target: task.target,
            })?;
        let behavior = behaviors
            .behavior_for(kind)
            .ok_or(PlannerError::MissingBehavior(kind))?;
        steps.push(PlanStep {
            edge,
            kind,
            from: prev,
            to: node,
            behavior,
        });
        node = prev;
    }
    steps.reverse();
    Ok(Plan::new(task.id, task.target, steps))
}

/// True when every unexecuted step's edge still exists in the live graph with
/// the same endpoints.
pub fn validate_plan(plan: &Plan, graph: &RoadmapGraph) -> bool {
    plan.remaining().iter().all(|step| {
        graph
            .edge(step.edge)
            .is_some_and(|edge| edge.touches(step.from) && edge.other(step.from) == Some(step.to))
    })
}

/// Travel cost from `from` to every reachable node of `view`.
pub fn travel_costs(view: &GraphView<'_>, from: NodeId) -> BTreeMap<NodeId, f64> {
    shortest_paths(view, from)
        .cost
        .into_iter()
        .map(|(node, cost)| (node, cost.length))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cost {
    length: f64,
    hops: u32,
}

impl Cost {
    const ZERO: Cost = Cost {
        length: 0.0,
        hops: 0,
    };

    fn cmp(&self, other: &Cost) -> Ordering {
        self.length
            .total_cmp(&other.length)
            .then_with(|| self.hops.cmp(&other.hops))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct QueueEntry {
    cost: Cost,
    node: NodeId,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    // Reversed: BinaryHeap is a max-heap and the search pops the cheapest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct ShortestPaths {
    cost: BTreeMap<NodeId, Cost>,
    parent: BTreeMap<NodeId, (EdgeId, NodeId)>,
}

impl ShortestPaths {
    fn reaches(&self, node: NodeId) -> bool {
        self.cost.contains_key(&node)
    }
}

fn shortest_paths(view: &GraphView<'_>, from: NodeId) -> ShortestPaths {
    let mut cost = BTreeMap::new();
    let mut parent = BTreeMap::new();
    let mut queue = BinaryHeap::new();
    if !view.contains_node(from) {
        return ShortestPaths { cost, parent };
    }

    cost.insert(from, Cost::ZERO);
    queue.push(QueueEntry {
        cost: Cost::ZERO,
        node: from,
    });

    while let Some(QueueEntry { cost: current, node }) = queue.pop() {
        if cost
            .get(&node)
            .is_some_and(|best: &Cost| best.cmp(&current) == Ordering::Less)
        {
            continue;
        }
        let Some(here) = view.node(node) else {
            continue;
        };
        if node != from && !here.is_waypoint() {
            continue;
        }
        for edge in view.edges_of(node) {
            let Some(next) = edge.other(node) else {
                continue;
            };
            let Some(there) = view.node(next) else {
                continue;
            };
            let candidate = Cost {
                length: current.length + here.position.distance_to(&there.position),
                hops: current.hops + 1,
            };
            let improves = cost
                .get(&next)
                .is_none_or(|best: &Cost| candidate.cmp(best) == Ordering::Less);
            if improves {
                cost.insert(next, candidate);
                parent.insert(next, (edge.id, node));
                queue.push(QueueEntry {
                    cost: candidate,
                    node: next,
                });
            }
        }
    }

    ShortestPaths { cost, parent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::{Position, Quantizer};
    use crate::core::types::{
        Capability, CapabilitySet, ObjectiveCategory, ObjectiveId, all_capabilities,
    };

    fn behaviors() -> BTreeMap<EdgeKind, BehaviorId> {
        [
            (EdgeKind::Waypoint, BehaviorId::new("navigate")),
            (EdgeKind::Frontier, BehaviorId::new("explore")),
            (EdgeKind::WorldObject, BehaviorId::new("inspect")),
        ]
        .into_iter()
        .collect()
    }

    fn task_for(target: NodeId) -> Task {
        Task {
            id: TaskId::for_target(target),
            target,
            objective: ObjectiveId::new("explore"),
            category: ObjectiveCategory::Explore,
        }
    }

    /// Path of `n` nodes: `n - 1` waypoints in a line, then a frontier.
    fn path_graph(n: u64) -> (RoadmapGraph, NodeId) {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        let mut last = RoadmapGraph::SEED;
        for i in 1..n - 1 {
            last = g
                .add_waypoint(Position::new(i as f64, 0.0), last)
                .expect("waypoint");
        }
        let frontier = g
            .add_frontier(Position::new((n - 1) as f64, 0.0), last)
            .expect("frontier");
        (g, frontier)
    }

    #[test]
    fn path_graph_plan_has_n_minus_one_edges() {
        for n in [2u64, 3, 6] {
            let (g, frontier) = path_graph(n);
            let view = g.filtered_view(&all_capabilities());
            let plan = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &behaviors())
                .expect("plan");
            assert_eq!(plan.len() as u64, n - 1);
            assert_eq!(plan.steps()[0].from, RoadmapGraph::SEED);
            let last = plan.steps().last().expect("last step");
            assert_eq!(last.to, frontier);
            assert_eq!(last.kind, EdgeKind::Frontier);
            assert_eq!(last.behavior, BehaviorId::new("explore"));
        }
    }

    #[test]
    fn plan_prefers_shorter_geometry() {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        // Long detour: seed -> (0,5) -> (5,5) -> (5,0); direct: seed -> (5,0).
        let up = g.add_waypoint(Position::new(0.0, 5.0), RoadmapGraph::SEED).expect("up");
        let corner = g.add_waypoint(Position::new(5.0, 5.0), up).expect("corner");
        let right = g.add_waypoint(Position::new(5.0, 0.0), corner).expect("right");
        g.add_waypoint(Position::new(5.0, 0.0), RoadmapGraph::SEED).expect("direct");
        let frontier = g.add_frontier(Position::new(6.0, 0.0), right).expect("frontier");

        let view = g.filtered_view(&all_capabilities());
        let plan = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &behaviors())
            .expect("plan");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0].to, right);
    }

    #[test]
    fn filtered_out_target_is_not_found() {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
        let obj = g.add_world_object(Position::new(1.0, 0.0), "door").expect("object");
        let walker: CapabilitySet = [Capability::Traverse, Capability::Explore]
            .into_iter()
            .collect();
        let view = g.filtered_view(&walker);
        let err = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(obj), &behaviors())
            .expect_err("filtered");
        assert_eq!(err, PlannerError::TargetNodeNotFound(obj));
    }

    #[test]
    fn retired_target_is_not_found() {
        let (mut g, frontier) = path_graph(3);
        g.retire_frontier(frontier).expect("retire");
        let view = g.filtered_view(&all_capabilities());
        let err = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &behaviors())
            .expect_err("retired");
        assert_eq!(err, PlannerError::TargetNodeNotFound(frontier));
    }

    #[test]
    fn disconnected_target_has_no_plan() {
        let (g, frontier) = path_graph(4);
        let mut snapshot = g.snapshot();
        snapshot
            .edges
            .retain(|edge| !(edge.kind == EdgeKind::Waypoint && edge.touches(RoadmapGraph::SEED)));
        let g = RoadmapGraph::from_snapshot(&snapshot).expect("restore");

        let view = g.filtered_view(&all_capabilities());
        let err = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &behaviors())
            .expect_err("disconnected");
        assert_eq!(
            err,
            PlannerError::CouldNotFindPlan {
                from: RoadmapGraph::SEED,
                target: frontier
            }
        );
    }

    #[test]
    fn hidden_start_is_reported() {
        let (g, frontier) = path_graph(3);
        let explore_only: CapabilitySet = [Capability::Explore].into_iter().collect();
        let view = g.filtered_view(&explore_only);
        let err = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &behaviors())
            .expect_err("start hidden");
        assert_eq!(err, PlannerError::StartNodeNotFound(RoadmapGraph::SEED));
    }

    #[test]
    fn missing_behavior_is_reported() {
        let (g, frontier) = path_graph(3);
        let view = g.filtered_view(&all_capabilities());
        let mut table = behaviors();
        table.remove(&EdgeKind::Frontier);
        let err = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &table)
            .expect_err("no behavior");
        assert_eq!(err, PlannerError::MissingBehavior(EdgeKind::Frontier));
    }

    #[test]
    fn plan_goes_stale_when_its_edge_disappears() {
        let (mut g, frontier) = path_graph(3);
        let view = g.filtered_view(&all_capabilities());
        let plan = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &behaviors())
            .expect("plan");
        assert!(validate_plan(&plan, &g));
        g.retire_frontier(frontier).expect("retire");
        assert!(!validate_plan(&plan, &g));
    }

    #[test]
    fn cursor_advances_until_finished() {
        let (g, frontier) = path_graph(3);
        let view = g.filtered_view(&all_capabilities());
        let mut plan = find_plan_for_task(RoadmapGraph::SEED, &view, &task_for(frontier), &behaviors())
            .expect("plan");
        assert!(!plan.advance());
        assert_eq!(plan.remaining().len(), 1);
        assert!(plan.advance());
        assert!(plan.next_step().is_none());
        assert!(plan.advance());
    }
}
