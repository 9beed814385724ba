//! Test-only helpers: scripted robots and deterministic roadmaps.

use std::collections::VecDeque;

use crate::core::graph::RoadmapGraph;
use crate::core::position::{Position, Quantizer};
use crate::core::sampler::WorldObjectSighting;
use crate::core::types::NodeId;
use crate::io::robot::{MoveResult, Robot};
use crate::io::sim::GridWorld;

/// A robot that replays scripted observations.
///
/// Neighbors and sightings are looked up by the position the robot is asked
/// about; unscripted positions observe nothing. Moves succeed unless a
/// scripted result says otherwise, and a successful move teleports the robot.
#[derive(Debug, Clone)]
pub struct ScriptedRobot {
    position: Position,
    heading: f64,
    quantizer: Quantizer,
    neighbors: Vec<(Position, Vec<Position>)>,
    sightings: Vec<(Position, Vec<WorldObjectSighting>)>,
    move_results: VecDeque<MoveResult>,
    moves: Vec<(Position, MoveResult)>,
}

impl ScriptedRobot {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            heading: 0.0,
            quantizer: Quantizer::default(),
            neighbors: Vec::new(),
            sightings: Vec::new(),
            move_results: VecDeque::new(),
            moves: Vec::new(),
        }
    }

    /// Positions observed when standing at `at`.
    pub fn with_neighbors(mut self, at: Position, observed: Vec<Position>) -> Self {
        self.neighbors.push((at, observed));
        self
    }

    /// Objects seen when standing at `at`.
    pub fn with_sightings(mut self, at: Position, seen: Vec<WorldObjectSighting>) -> Self {
        self.sightings.push((at, seen));
        self
    }

    /// Results returned by the next moves, in order. Later moves succeed.
    pub fn with_move_results(mut self, results: impl IntoIterator<Item = MoveResult>) -> Self {
        self.move_results.extend(results);
        self
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Every move attempted so far with its result.
    pub fn moves(&self) -> &[(Position, MoveResult)] {
        &self.moves
    }

    fn lookup<'a, T>(&self, table: &'a [(Position, Vec<T>)], at: &Position) -> &'a [T] {
        table
            .iter()
            .find(|(key, _)| self.quantizer.same_place(key, at))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

impl Robot for ScriptedRobot {
    fn get_localization(&self) -> Position {
        self.position
    }

    fn observe_neighbors(&mut self, at: Position) -> Vec<Position> {
        self.lookup(&self.neighbors, &at).to_vec()
    }

    fn look_for_world_objects(&mut self) -> Vec<WorldObjectSighting> {
        self.lookup(&self.sightings, &self.position).to_vec()
    }

    fn move_to(&mut self, target: Position, heading: f64) -> MoveResult {
        let result = self.move_results.pop_front().unwrap_or(MoveResult::Success);
        self.moves.push((target, result));
        if result.is_success() {
            self.position = target;
            self.heading = heading;
        }
        result
    }
}

/// Seed waypoint at the origin, then `waypoints` more in a line along +x
/// (1 m apart), ending in a frontier one meter past the last waypoint.
///
/// Returns the graph and every node id in path order.
pub fn path_roadmap(waypoints: usize) -> (RoadmapGraph, Vec<NodeId>) {
    let mut graph = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::default());
    let mut ids = vec![RoadmapGraph::SEED];
    for i in 1..=waypoints {
        let parent = ids[i - 1];
        let id = graph
            .add_waypoint(Position::new(i as f64, 0.0), parent)
            .expect("path waypoint");
        ids.push(id);
    }
    let last = ids[waypoints];
    let frontier = graph
        .add_frontier(Position::new((waypoints + 1) as f64, 0.0), last)
        .expect("path frontier");
    ids.push(frontier);
    (graph, ids)
}

/// Build a grid world from rows, with unit resolution and sensor range 1.
pub fn grid_world(rows: &[&str]) -> GridWorld {
    let rows = rows
        .iter()
        .map(|row| format!("  \"{row}\","))
        .collect::<Vec<_>>()
        .join("\n");
    GridWorld::parse(&format!("rows = [\n{rows}\n]\n")).expect("grid world")
}
