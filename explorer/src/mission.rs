//! The observe → select → plan → execute loop of one agent, and fleets of them.
//!
//! Each [`Mission::run_iteration`] does at most one of: claim a task, plan it,
//! or traverse one plan edge. No task or plan failure stops the loop; it ends
//! only when the roadmap has no frontiers left, when nothing reachable
//! remains, or when the iteration limit is hit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::behavior::BehaviorTable;
use crate::core::agent::{AgentPhase, AgentState};
use crate::core::allocator::{Allocation, ClaimRegistry, TaskAllocator};
use crate::core::graph::RoadmapGraph;
use crate::core::planner::find_plan_for_task;
use crate::core::position::{PositionKey, Quantizer};
use crate::core::sampler::{record_sightings, sample};
use crate::core::snapshot::GraphSnapshot;
use crate::core::tasks::ObjectiveCatalog;
use crate::core::types::{AgentId, NodeId, NodeTag, ObjectStatus, Task};
use crate::events::{EventDispatcher, MissionEvent};
use crate::executor::{ExecutorError, PlanExecutor, StepResult};
use crate::io::config::MissionConfig;
use crate::io::robot::Robot;
use crate::shared::SharedRoadmap;

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// One plan edge traversed, more remain (or a plan was just computed).
    Advanced,
    TaskCompleted,
    TaskFailed,
    PlanningFailed,
    /// Every candidate is claimed by another agent.
    Waiting,
    /// No frontiers remain.
    Complete,
    /// Frontiers remain but none is reachable or eligible for this agent.
    Stalled,
}

/// Reason why [`Mission::run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStop {
    Complete,
    Stalled,
    MaxIterationsExceeded,
}

impl MissionStop {
    pub fn as_str(self) -> &'static str {
        match self {
            MissionStop::Complete => "complete",
            MissionStop::Stalled => "stalled",
            MissionStop::MaxIterationsExceeded => "max_iterations",
        }
    }
}

/// Summary of one agent's loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionOutcome {
    pub agent: AgentId,
    pub iterations: u32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub steps_taken: u64,
    pub stop: MissionStop,
}

/// State shared by every agent working on one roadmap.
#[derive(Debug, Clone)]
pub struct MissionShared {
    pub roadmap: Arc<SharedRoadmap>,
    pub claims: Arc<ClaimRegistry>,
    pub behaviors: Arc<BehaviorTable>,
    /// Places any agent has given up on; observations of them are ignored.
    /// Locked only while the roadmap write lock is held.
    pub abandoned: Arc<Mutex<BTreeSet<PositionKey>>>,
}

impl MissionShared {
    /// Share `graph` with an empty claim registry and the standard behavior table.
    pub fn new(graph: RoadmapGraph) -> Self {
        Self {
            roadmap: Arc::new(SharedRoadmap::new(graph)),
            claims: Arc::new(ClaimRegistry::new()),
            behaviors: Arc::new(BehaviorTable::standard()),
            abandoned: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn with_behaviors(mut self, behaviors: BehaviorTable) -> Self {
        self.behaviors = Arc::new(behaviors);
        self
    }
}

/// One agent driving one robot over a (possibly shared) roadmap.
#[derive(Debug)]
pub struct Mission<R: Robot> {
    agent: AgentState,
    robot: R,
    shared: MissionShared,
    allocator: TaskAllocator,
    executor: PlanExecutor,
    catalog: ObjectiveCatalog,
    events: EventDispatcher,
    failures: BTreeMap<NodeId, u32>,
    max_attempts: u32,
    max_iterations: u32,
    idle_backoff: Duration,
    iterations: u32,
    tasks_completed: u32,
    tasks_failed: u32,
    announced: bool,
}

impl<R: Robot> Mission<R> {
    /// Start a single-agent mission on a fresh roadmap seeded at the robot's position.
    pub fn start(robot: R, config: &MissionConfig) -> Result<Self> {
        let graph = RoadmapGraph::new(
            robot.get_localization(),
            Quantizer::new(config.position_resolution),
        );
        let shared = MissionShared::new(graph);
        Self::join(robot, config.agent_id(0, 1), &shared, config, config.allocation.seed)
    }

    /// Add an agent to an existing roadmap.
    ///
    /// The agent is registered on the waypoint at its robot's position. A
    /// robot elsewhere gets a new waypoint linked to the seed.
    pub fn join(
        robot: R,
        id: AgentId,
        shared: &MissionShared,
        config: &MissionConfig,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let position = robot.get_localization();
        let waypoint = {
            let mut graph = shared.roadmap.write();
            let waypoint = match graph.find_waypoint_at(&position) {
                Some(existing) => existing,
                None => graph
                    .add_waypoint(position, RoadmapGraph::SEED)
                    .context("place agent on roadmap")?,
            };
            graph
                .register_agent(id.clone(), waypoint)
                .context("register agent")?;
            waypoint
        };
        debug!(agent = %id, %waypoint, %position, "agent joined");

        Ok(Self {
            agent: AgentState::new(id, position, waypoint, config.capabilities()),
            robot,
            allocator: TaskAllocator::new(
                config.allocation.strategy,
                seed,
                shared.claims.clone(),
            ),
            executor: PlanExecutor::new(shared.behaviors.clone(), shared.claims.clone()),
            shared: shared.clone(),
            catalog: config.objectives.catalog(),
            events: EventDispatcher::new(),
            failures: BTreeMap::new(),
            max_attempts: config.max_attempts_per_target,
            max_iterations: config.max_iterations,
            idle_backoff: Duration::from_millis(config.idle_backoff_ms),
            iterations: 0,
            tasks_completed: 0,
            tasks_failed: 0,
            announced: false,
        })
    }

    pub fn agent(&self) -> &AgentState {
        &self.agent
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn roadmap(&self) -> &SharedRoadmap {
        &self.shared.roadmap
    }

    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Failures recorded against `target` since its last success.
    pub fn failures_for(&self, target: NodeId) -> u32 {
        self.failures.get(&target).copied().unwrap_or(0)
    }

    /// Run iterations until completion, a stall, or the iteration limit.
    pub fn run<F: FnMut(&IterationOutcome)>(&mut self, mut on_iteration: F) -> Result<MissionOutcome> {
        loop {
            if self.iterations >= self.max_iterations {
                warn!(agent = %self.agent.id, limit = self.max_iterations, "iteration limit reached");
                return Ok(self.outcome(MissionStop::MaxIterationsExceeded));
            }
            let outcome = self.run_iteration()?;
            on_iteration(&outcome);
            match outcome {
                IterationOutcome::Complete => return Ok(self.outcome(MissionStop::Complete)),
                IterationOutcome::Stalled => return Ok(self.outcome(MissionStop::Stalled)),
                IterationOutcome::Waiting => thread::sleep(self.idle_backoff),
                _ => {}
            }
        }
    }

    /// Observe, then advance the agent by one phase or one edge.
    #[instrument(skip_all, fields(agent = %self.agent.id, iter = self.iterations + 1))]
    pub fn run_iteration(&mut self) -> Result<IterationOutcome> {
        self.iterations += 1;
        self.observe()?;

        if self.agent.is_idle() {
            if let Some(outcome) = self.select_task() {
                return Ok(outcome);
            }
        }
        if let AgentPhase::Planning { task } = &self.agent.phase {
            let task = task.clone();
            return Ok(self.plan_task(task));
        }
        self.execute_step()
    }

    fn observe(&mut self) -> Result<()> {
        let here = self.robot.get_localization();
        let mut observed = self.robot.observe_neighbors(here);
        let sightings = self.robot.look_for_world_objects();
        let mut graph = self.shared.roadmap.write();
        let abandoned = self.shared.abandoned.lock();
        if !abandoned.is_empty() {
            let quantizer = graph.quantizer();
            observed.retain(|position| !abandoned.contains(&quantizer.key(position)));
        }
        drop(abandoned);
        sample(&observed, self.agent.current_waypoint, &mut graph).context("sample frontiers")?;
        record_sightings(&sightings, &mut graph).context("record world objects")?;
        Ok(())
    }

    /// Claim a task, or report why the agent has nothing to do.
    fn select_task(&mut self) -> Option<IterationOutcome> {
        let allocation = {
            let graph = self.shared.roadmap.read();
            if graph.has_no_frontiers() {
                if !self.shared.claims.is_empty() {
                    // Another agent is mid-task and may still uncover frontiers.
                    return Some(IterationOutcome::Waiting);
                }
                drop(graph);
                return Some(self.complete());
            }
            let view = graph.filtered_view(&self.agent.capabilities);
            self.allocator.allocate(
                &self.agent.id,
                self.agent.current_waypoint,
                &view,
                &self.catalog,
            )
        };

        match allocation {
            Allocation::Claimed(task) => {
                info!(task = %task.id, node = %task.target, objective = %task.objective, "task selected");
                self.events.publish(MissionEvent::TaskSelected {
                    agent: self.agent.id.clone(),
                    task: task.clone(),
                });
                self.agent.phase = AgentPhase::Planning { task };
                None
            }
            Allocation::AllClaimed => Some(IterationOutcome::Waiting),
            Allocation::NoneEligible if !self.shared.claims.is_empty() => {
                Some(IterationOutcome::Waiting)
            }
            Allocation::NoneEligible => {
                warn!(
                    frontiers = self.shared.roadmap.read().frontier_count(),
                    "no reachable task for agent"
                );
                Some(IterationOutcome::Stalled)
            }
        }
    }

    fn plan_task(&mut self, task: Task) -> IterationOutcome {
        let planned = {
            let graph = self.shared.roadmap.read();
            let view = graph.filtered_view(&self.agent.capabilities);
            find_plan_for_task(
                self.agent.current_waypoint,
                &view,
                &task,
                self.executor.behaviors(),
            )
        };
        match planned {
            Ok(plan) => {
                debug!(task = %task.id, steps = plan.len(), "plan computed");
                self.events.publish(MissionEvent::PlanUpdated {
                    agent: self.agent.id.clone(),
                    plan: plan.clone(),
                });
                self.agent.phase = AgentPhase::Executing { task, plan };
                IterationOutcome::Advanced
            }
            Err(err) => {
                warn!(task = %task.id, error = %err, "planning failed");
                self.executor.destroy_task(&mut self.agent);
                self.record_failure(&task);
                IterationOutcome::PlanningFailed
            }
        }
    }

    fn execute_step(&mut self) -> Result<IterationOutcome> {
        let task = self
            .agent
            .active_task()
            .cloned()
            .ok_or_else(|| anyhow!("agent {} has no task to execute", self.agent.id))?;
        let result = self.executor.step(
            &mut self.agent,
            &self.shared.roadmap,
            &mut self.robot,
            &mut self.events,
        );
        match result {
            Ok(StepResult::Advanced) => Ok(IterationOutcome::Advanced),
            Ok(StepResult::Completed) => {
                self.failures.remove(&task.target);
                self.tasks_completed += 1;
                debug!(task = %task.id, "task completed");
                Ok(IterationOutcome::TaskCompleted)
            }
            Ok(StepResult::Failed) => {
                self.record_failure(&task);
                Ok(IterationOutcome::TaskFailed)
            }
            Err(ExecutorError::Graph(err)) => {
                warn!(task = %task.id, error = %err, "roadmap update failed");
                self.executor.destroy_task(&mut self.agent);
                self.record_failure(&task);
                Ok(IterationOutcome::TaskFailed)
            }
            Err(err @ ExecutorError::NotExecuting(_)) => Err(err.into()),
        }
    }

    /// Count a failure against the task's target; abandon it at the limit.
    fn record_failure(&mut self, task: &Task) {
        self.tasks_failed += 1;
        let count = self.failures.entry(task.target).or_insert(0);
        *count += 1;
        if *count < self.max_attempts {
            return;
        }
        let attempts = *count;
        self.failures.remove(&task.target);

        let mut graph = self.shared.roadmap.write();
        let Some((tag, position)) = graph
            .node(task.target)
            .map(|node| (node.tag(), node.position))
        else {
            return;
        };
        let abandoned = match tag {
            NodeTag::Frontier => {
                self.shared
                    .abandoned
                    .lock()
                    .insert(graph.quantizer().key(&position));
                graph.retire_frontier(task.target)
            }
            NodeTag::WorldObject => graph.mark_world_object(task.target, ObjectStatus::Unreachable),
            NodeTag::Waypoint => return,
        };
        match abandoned {
            Ok(()) => warn!(node = %task.target, attempts, "target abandoned after repeated failure"),
            Err(err) => debug!(node = %task.target, error = %err, "target already gone"),
        }
    }

    fn complete(&mut self) -> IterationOutcome {
        if !self.announced {
            self.announced = true;
            info!(
                agent = %self.agent.id,
                iterations = self.iterations,
                tasks = self.tasks_completed,
                "exploration complete"
            );
            self.events.publish(MissionEvent::MissionComplete {
                agent: self.agent.id.clone(),
            });
        }
        IterationOutcome::Complete
    }

    fn outcome(&self, stop: MissionStop) -> MissionOutcome {
        MissionOutcome {
            agent: self.agent.id.clone(),
            iterations: self.iterations,
            tasks_completed: self.tasks_completed,
            tasks_failed: self.tasks_failed,
            steps_taken: self.agent.steps_taken,
            stop,
        }
    }
}

/// Result of a fleet run.
#[derive(Debug, Clone)]
pub struct FleetOutcome {
    pub outcomes: Vec<MissionOutcome>,
    pub snapshot: GraphSnapshot,
}

impl FleetOutcome {
    /// The fleet's overall stop: complete if any agent saw completion, else
    /// the limit if any agent hit it, else stalled.
    pub fn stop(&self) -> MissionStop {
        let any = |stop: MissionStop| self.outcomes.iter().any(|outcome| outcome.stop == stop);
        if any(MissionStop::Complete) {
            MissionStop::Complete
        } else if any(MissionStop::MaxIterationsExceeded) {
            MissionStop::MaxIterationsExceeded
        } else {
            MissionStop::Stalled
        }
    }
}

/// Run one agent per robot on scoped threads over one shared roadmap.
///
/// The first robot's position seeds the roadmap. Agent `i` allocates with
/// seed `allocation.seed + i`.
pub fn run_fleet<R: Robot + Send>(robots: Vec<R>, config: &MissionConfig) -> Result<FleetOutcome> {
    let first = robots
        .first()
        .ok_or_else(|| anyhow!("fleet needs at least one robot"))?;
    let shared = MissionShared::new(RoadmapGraph::new(
        first.get_localization(),
        Quantizer::new(config.position_resolution),
    ));

    let fleet_size = robots.len();
    let mut missions = Vec::with_capacity(fleet_size);
    for (index, robot) in robots.into_iter().enumerate() {
        let seed = config.allocation.seed.wrapping_add(index as u64);
        missions.push(Mission::join(
            robot,
            config.agent_id(index, fleet_size),
            &shared,
            config,
            seed,
        )?);
    }

    let results: Vec<Result<MissionOutcome>> = thread::scope(|scope| {
        let handles: Vec<_> = missions
            .iter_mut()
            .map(|mission| scope.spawn(move || mission.run(|_| {})))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("agent thread panicked")))
            })
            .collect()
    });

    let outcomes = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(FleetOutcome {
        outcomes,
        snapshot: shared.roadmap.snapshot(),
    })
}
