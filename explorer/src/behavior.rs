//! Behaviors that traverse one edge kind each.
//!
//! The [`BehaviorTable`] maps every [`EdgeKind`] to a [`Behavior`]. The planner
//! only sees behavior ids (through [`BehaviorLookup`]); the executor resolves
//! an id back to the behavior and runs it against the robot.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::core::planner::{BehaviorLookup, PlanStep};
use crate::core::position::Position;
use crate::core::types::{BehaviorId, EdgeKind};
use crate::io::robot::{MoveResult, Robot};

/// Everything a behavior needs to traverse one plan step.
#[derive(Debug, Clone)]
pub struct BehaviorRequest<'a> {
    pub step: &'a PlanStep,
    /// Position of the step's source node.
    pub from: Position,
    /// Position of the step's destination node.
    pub to: Position,
}

impl BehaviorRequest<'_> {
    pub fn heading(&self) -> f64 {
        self.from.heading_to(&self.to)
    }
}

/// A robot skill bound to one edge kind.
pub trait Behavior: Send + Sync {
    fn id(&self) -> BehaviorId;

    /// Run the skill. `Success` means the step's destination was reached or acted on.
    fn run(&self, robot: &mut dyn Robot, request: &BehaviorRequest<'_>) -> MoveResult;
}

/// Drive to the destination node, facing along the edge.
#[derive(Debug, Clone)]
pub struct Navigate {
    id: BehaviorId,
}

impl Navigate {
    pub fn new(id: &str) -> Self {
        Self {
            id: BehaviorId::new(id),
        }
    }
}

impl Behavior for Navigate {
    fn id(&self) -> BehaviorId {
        self.id.clone()
    }

    fn run(&self, robot: &mut dyn Robot, request: &BehaviorRequest<'_>) -> MoveResult {
        debug!(behavior = %self.id, to = %request.to, "navigating");
        robot.move_to(request.to, request.heading())
    }
}

/// Turn in place toward a world object without leaving the waypoint.
#[derive(Debug, Clone, Default)]
pub struct Inspect;

impl Behavior for Inspect {
    fn id(&self) -> BehaviorId {
        BehaviorId::new("inspect")
    }

    fn run(&self, robot: &mut dyn Robot, request: &BehaviorRequest<'_>) -> MoveResult {
        debug!(node = %request.to, "inspecting");
        robot.move_to(request.from, request.heading())
    }
}

/// Edge kind → behavior registry.
#[derive(Clone, Default)]
pub struct BehaviorTable {
    by_kind: BTreeMap<EdgeKind, Arc<dyn Behavior>>,
}

impl std::fmt::Debug for BehaviorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.by_kind.iter().map(|(kind, behavior)| (kind, behavior.id())))
            .finish()
    }
}

impl BehaviorTable {
    /// An empty table. Plans over unmapped edge kinds fail with `MissingBehavior`.
    pub fn new() -> Self {
        Self::default()
    }

    /// `navigate` for waypoint edges, `explore` for frontier edges, `inspect` for world-object edges.
    pub fn standard() -> Self {
        Self::new()
            .with(EdgeKind::Waypoint, Navigate::new("navigate"))
            .with(EdgeKind::Frontier, Navigate::new("explore"))
            .with(EdgeKind::WorldObject, Inspect)
    }

    pub fn with(mut self, kind: EdgeKind, behavior: impl Behavior + 'static) -> Self {
        self.register(kind, behavior);
        self
    }

    pub fn register(&mut self, kind: EdgeKind, behavior: impl Behavior + 'static) {
        self.by_kind.insert(kind, Arc::new(behavior));
    }

    /// Resolve a behavior id published by this table.
    pub fn get(&self, id: &BehaviorId) -> Option<&dyn Behavior> {
        self.by_kind
            .values()
            .find(|behavior| &behavior.id() == id)
            .map(|behavior| behavior.as_ref())
    }
}

impl BehaviorLookup for BehaviorTable {
    fn behavior_for(&self, kind: EdgeKind) -> Option<BehaviorId> {
        self.by_kind.get(&kind).map(|behavior| behavior.id())
    }
}
