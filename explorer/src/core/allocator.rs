//! Task selection for one agent per planning cycle.
//!
//! Two interchangeable strategies sit behind [`TaskAllocator`]:
//!
//! - [`AllocationStrategy::RewardPerCost`]: maximize `reward / travel cost`,
//!   ties broken by lowest task id.
//! - [`AllocationStrategy::UniformRandom`]: uniform choice among reachable
//!   candidates from a seeded generator, so runs are reproducible.
//!
//! Claims are recorded in a [`ClaimRegistry`] shared by every allocator of a
//! mission. A task is claimed before it is returned, never after.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::planner::travel_costs;
use crate::core::tasks::{ObjectiveCatalog, candidate_tasks};
use crate::core::types::{AgentId, NodeId, Task, TaskId};
use crate::core::view::GraphView;

/// Lower bound on travel cost so zero-length targets score finitely.
const MIN_COST: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationStrategy {
    RewardPerCost,
    UniformRandom,
}

/// Outcome of an allocation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    /// A task was claimed for the agent.
    Claimed(Task),
    /// Every eligible task is currently claimed by another agent.
    AllClaimed,
    /// No eligible task exists for this agent.
    NoneEligible,
}

impl Allocation {
    pub fn task(self) -> Option<Task> {
        match self {
            Allocation::Claimed(task) => Some(task),
            _ => None,
        }
    }
}

/// Which agent holds which task. Shared by every allocator of a mission.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    claims: Mutex<BTreeMap<TaskId, AgentId>>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `task` for `agent`. Succeeds if unclaimed or already held by `agent`.
    pub fn try_claim(&self, task: TaskId, agent: &AgentId) -> bool {
        let mut claims = self.claims.lock();
        match claims.get(&task) {
            Some(holder) => holder == agent,
            None => {
                claims.insert(task, agent.clone());
                true
            }
        }
    }

    /// Release `task` if `agent` holds it.
    pub fn release(&self, task: TaskId, agent: &AgentId) -> bool {
        let mut claims = self.claims.lock();
        if claims.get(&task) == Some(agent) {
            claims.remove(&task);
            return true;
        }
        false
    }

    /// Release everything `agent` holds.
    pub fn release_all(&self, agent: &AgentId) {
        self.claims.lock().retain(|_, holder| holder != agent);
    }

    pub fn holder(&self, task: TaskId) -> Option<AgentId> {
        self.claims.lock().get(&task).cloned()
    }

    pub fn is_claimed_by_other(&self, task: TaskId, agent: &AgentId) -> bool {
        self.claims
            .lock()
            .get(&task)
            .is_some_and(|holder| holder != agent)
    }

    pub fn len(&self) -> usize {
        self.claims.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.lock().is_empty()
    }
}

/// Selects at most one task per call for one agent.
#[derive(Debug)]
pub struct TaskAllocator {
    strategy: AllocationStrategy,
    rng: StdRng,
    claims: Arc<ClaimRegistry>,
}

impl TaskAllocator {
    pub fn new(strategy: AllocationStrategy, seed: u64, claims: Arc<ClaimRegistry>) -> Self {
        Self {
            strategy,
            rng: StdRng::seed_from_u64(seed),
            claims,
        }
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    pub fn claims(&self) -> &Arc<ClaimRegistry> {
        &self.claims
    }

    /// Pick and claim the best reachable task for `agent` standing on `from`.
    pub fn allocate(
        &mut self,
        agent: &AgentId,
        from: NodeId,
        view: &GraphView<'_>,
        catalog: &ObjectiveCatalog,
    ) -> Allocation {
        let costs = travel_costs(view, from);
        let reachable: Vec<(Task, f64)> = candidate_tasks(view, catalog)
            .into_iter()
            .filter_map(|task| costs.get(&task.target).map(|cost| (task, *cost)))
            .collect();
        if reachable.is_empty() {
            return Allocation::NoneEligible;
        }

        let mut open: Vec<(Task, f64)> = reachable
            .into_iter()
            .filter(|(task, _)| !self.claims.is_claimed_by_other(task.id, agent))
            .collect();

        while !open.is_empty() {
            let index = match self.strategy {
                AllocationStrategy::RewardPerCost => best_index(&open, catalog),
                AllocationStrategy::UniformRandom => self.rng.gen_range(0..open.len()),
            };
            let (task, cost) = open.remove(index);
            // Another allocator may have claimed it since the filter above.
            if self.claims.try_claim(task.id, agent) {
                debug!(agent = %agent, task = %task.id, node = %task.target, cost, "task claimed");
                return Allocation::Claimed(task);
            }
        }
        Allocation::AllClaimed
    }
}

fn best_index(candidates: &[(Task, f64)], catalog: &ObjectiveCatalog) -> usize {
    let score = |(task, cost): &(Task, f64)| catalog.reward(&task.objective) / cost.max(MIN_COST);
    let mut best = 0;
    for (index, candidate) in candidates.iter().enumerate().skip(1) {
        let current = &candidates[best];
        let ordering = score(candidate)
            .total_cmp(&score(current))
            .then_with(|| current.0.id.cmp(&candidate.0.id));
        if ordering.is_gt() {
            best = index;
        }
    }
    best
}
