//! Per-agent state and its task/plan lifecycle.

use serde::Serialize;

use crate::core::planner::Plan;
use crate::core::position::Position;
use crate::core::types::{AgentId, CapabilitySet, NodeId, Task};

/// Where an agent is in the select → plan → execute cycle.
///
/// Each variant carries only the data valid in that state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    Planning { task: Task },
    Executing { task: Task, plan: Plan },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentState {
    pub id: AgentId,
    pub position: Position,
    pub heading: f64,
    pub current_waypoint: NodeId,
    pub previous_waypoint: NodeId,
    pub phase: AgentPhase,
    pub steps_taken: u64,
    pub capabilities: CapabilitySet,
}

impl AgentState {
    pub fn new(
        id: AgentId,
        position: Position,
        waypoint: NodeId,
        capabilities: CapabilitySet,
    ) -> Self {
        Self {
            id,
            position,
            heading: 0.0,
            current_waypoint: waypoint,
            previous_waypoint: waypoint,
            phase: AgentPhase::Idle,
            steps_taken: 0,
            capabilities,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, AgentPhase::Idle)
    }

    pub fn active_task(&self) -> Option<&Task> {
        match &self.phase {
            AgentPhase::Idle => None,
            AgentPhase::Planning { task } | AgentPhase::Executing { task, .. } => Some(task),
        }
    }

    pub fn active_plan(&self) -> Option<&Plan> {
        match &self.phase {
            AgentPhase::Executing { plan, .. } => Some(plan),
            _ => None,
        }
    }

    /// Record arrival at `waypoint`.
    pub fn arrive_at(&mut self, waypoint: NodeId) {
        if waypoint != self.current_waypoint {
            self.previous_waypoint = self.current_waypoint;
            self.current_waypoint = waypoint;
        }
    }

    /// Drop any task and plan, returning the task that was held.
    pub fn clear_task(&mut self) -> Option<Task> {
        match std::mem::replace(&mut self.phase, AgentPhase::Idle) {
            AgentPhase::Idle => None,
            AgentPhase::Planning { task } | AgentPhase::Executing { task, .. } => Some(task),
        }
    }
}
