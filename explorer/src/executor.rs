//! Advances an agent's plan by one edge per call.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::behavior::{BehaviorRequest, BehaviorTable};
use crate::core::agent::{AgentPhase, AgentState};
use crate::core::allocator::ClaimRegistry;
use crate::core::graph::{GraphError, RoadmapGraph};
use crate::core::planner::{PlanStep, validate_plan};
use crate::core::position::Position;
use crate::core::types::{AgentId, EdgeKind, ObjectStatus, Task};
use crate::events::{EventDispatcher, MissionEvent};
use crate::io::robot::{MoveResult, Robot};
use crate::shared::SharedRoadmap;

/// Outcome of one [`PlanExecutor::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// One edge traversed; more remain.
    Advanced,
    /// The last edge was traversed. Task and plan are gone.
    Completed,
    /// The plan went stale, its behavior was missing, or the move failed.
    /// Task and plan are gone.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("agent {0} has no plan to execute")]
    NotExecuting(AgentId),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone)]
pub struct PlanExecutor {
    behaviors: Arc<BehaviorTable>,
    claims: Arc<ClaimRegistry>,
}

impl PlanExecutor {
    pub fn new(behaviors: Arc<BehaviorTable>, claims: Arc<ClaimRegistry>) -> Self {
        Self { behaviors, claims }
    }

    pub fn behaviors(&self) -> &BehaviorTable {
        &self.behaviors
    }

    /// Traverse the next edge of the agent's plan.
    ///
    /// The robot is driven without holding the roadmap lock. On success the
    /// roadmap is updated for the edge kind: frontier edges promote the
    /// frontier, world-object edges mark the object inspected.
    #[instrument(skip_all, fields(agent = %agent.id))]
    pub fn step<R: Robot>(
        &self,
        agent: &mut AgentState,
        roadmap: &SharedRoadmap,
        robot: &mut R,
        events: &mut EventDispatcher,
    ) -> Result<StepResult, ExecutorError> {
        let (task, mut plan) = match std::mem::replace(&mut agent.phase, AgentPhase::Idle) {
            AgentPhase::Executing { task, plan } => (task, plan),
            other => {
                agent.phase = other;
                return Err(ExecutorError::NotExecuting(agent.id.clone()));
            }
        };

        let Some(step) = plan.next_step().cloned() else {
            // Empty plan: the agent already stands on the target.
            self.release(&agent.id, &task);
            return Ok(StepResult::Completed);
        };

        let endpoints = {
            let graph = roadmap.read();
            if validate_plan(&plan, &graph) {
                endpoints(&graph, &step)
            } else {
                None
            }
        };
        let Some((from, to)) = endpoints else {
            warn!(task = %task.id, edge = %step.edge, "plan is stale");
            self.release(&agent.id, &task);
            return Ok(StepResult::Failed);
        };
        let Some(behavior) = self.behaviors.get(&step.behavior) else {
            warn!(task = %task.id, behavior = %step.behavior, "behavior not registered");
            self.release(&agent.id, &task);
            return Ok(StepResult::Failed);
        };

        let request = BehaviorRequest {
            step: &step,
            from,
            to,
        };
        if behavior.run(robot, &request) == MoveResult::Failure {
            warn!(task = %task.id, edge = %step.edge, behavior = %step.behavior, "step failed");
            self.release(&agent.id, &task);
            return Ok(StepResult::Failed);
        }

        agent.steps_taken += 1;
        agent.heading = request.heading();
        agent.position = robot.get_localization();
        let applied = apply_step(agent, roadmap, &step);
        if let Err(err) = applied {
            self.release(&agent.id, &task);
            return Err(err.into());
        }

        if plan.advance() {
            debug!(task = %task.id, steps = plan.len(), "plan finished");
            self.release(&agent.id, &task);
            return Ok(StepResult::Completed);
        }
        events.publish(MissionEvent::PlanUpdated {
            agent: agent.id.clone(),
            plan: plan.clone(),
        });
        agent.phase = AgentPhase::Executing { task, plan };
        Ok(StepResult::Advanced)
    }

    /// Drop the agent's task and plan and release its claim.
    pub fn destroy_task(&self, agent: &mut AgentState) -> Option<Task> {
        let task = agent.clear_task()?;
        self.release(&agent.id, &task);
        Some(task)
    }

    fn release(&self, agent: &AgentId, task: &Task) {
        self.claims.release(task.id, agent);
    }
}

fn endpoints(graph: &RoadmapGraph, step: &PlanStep) -> Option<(Position, Position)> {
    let from = graph.node(step.from)?.position;
    let to = graph.node(step.to)?.position;
    Some((from, to))
}

fn apply_step(
    agent: &mut AgentState,
    roadmap: &SharedRoadmap,
    step: &PlanStep,
) -> Result<(), GraphError> {
    let mut graph = roadmap.write();
    match step.kind {
        EdgeKind::Waypoint => {
            agent.arrive_at(step.to);
            graph.set_agent_waypoint(&agent.id, step.to)?;
        }
        EdgeKind::Frontier => {
            let waypoint = graph.promote_frontier(step.to)?;
            agent.arrive_at(waypoint);
            graph.set_agent_waypoint(&agent.id, waypoint)?;
        }
        EdgeKind::WorldObject => {
            graph.mark_world_object(step.to, ObjectStatus::Inspected)?;
        }
    }
    Ok(())
}
