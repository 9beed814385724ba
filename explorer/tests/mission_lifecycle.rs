//! End-to-end mission tests against the grid-world simulator.

use explorer::core::invariants::validate_invariants;
use explorer::core::position::Position;
use explorer::core::types::{NodeKind, ObjectStatus};
use explorer::io::config::MissionConfig;
use explorer::io::robot::Robot;
use explorer::io::sim::GridWorld;
use explorer::mission::{IterationOutcome, Mission, MissionStop};
use explorer::test_support::grid_world;

fn config() -> MissionConfig {
    MissionConfig {
        max_iterations: 2_000,
        ..MissionConfig::default()
    }
}

/// Every reachable free cell ends up as a waypoint, invariants hold after
/// every iteration, and the loop ends on its own.
#[test]
fn explores_whole_room_and_keeps_invariants() {
    let world = grid_world(&["#######", "#S..#.#", "#.#...#", "#.....#", "#######"]);
    let reachable = world.reachable_cells();
    let mut mission = Mission::start(world, &config()).expect("start");

    let mut checked = 0;
    let outcome = loop {
        let step = mission.run_iteration().expect("iteration");
        let errors = validate_invariants(&mission.roadmap().read());
        assert!(errors.is_empty(), "invariants broken: {errors:?}");
        checked += 1;
        if step == IterationOutcome::Complete {
            break step;
        }
        assert!(checked < 2_000, "mission did not terminate");
    };

    assert_eq!(outcome, IterationOutcome::Complete);
    let graph = mission.roadmap().read();
    assert_eq!(graph.frontier_count(), 0);
    let waypoints = graph.nodes().filter(|node| node.is_waypoint()).count();
    assert_eq!(waypoints, reachable);
}

#[test]
fn hazards_are_abandoned_after_bounded_attempts() {
    let world = grid_world(&["S.~"]);
    let mut cfg = config();
    cfg.max_attempts_per_target = 2;
    let mut mission = Mission::start(world, &cfg).expect("start");

    let outcome = mission.run(|_| {}).expect("run");

    assert_eq!(outcome.stop, MissionStop::Complete);
    assert_eq!(outcome.tasks_completed, 1);
    assert_eq!(outcome.tasks_failed, 2);
    let graph = mission.roadmap().read();
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.find_by_position(&Position::new(2.0, 0.0)), None);
}

#[test]
fn sighted_objects_are_inspected_before_exploring_further() {
    let world = GridWorld::parse(
        "rows = [\"S..\"]\n\n[[objects]]\ncell = [2, 0]\nlabel = \"valve\"\n",
    )
    .expect("world");
    let mut mission = Mission::start(world, &config()).expect("start");

    let outcome = mission.run(|_| {}).expect("run");

    assert_eq!(outcome.stop, MissionStop::Complete);
    assert_eq!(outcome.tasks_completed, 3);
    let graph = mission.roadmap().read();
    let statuses: Vec<ObjectStatus> = graph
        .nodes()
        .filter_map(|node| match &node.kind {
            NodeKind::WorldObject { status, .. } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![ObjectStatus::Inspected]);
    // Inspection turns in place; the robot ends on the far cell after exploring it.
    assert_eq!(mission.robot().get_localization(), Position::new(2.0, 0.0));
}

#[test]
fn object_seen_before_its_cell_does_not_block_exploration() {
    let world = GridWorld::parse(
        "sensor_range = 2\nrows = [\"S...\"]\n\n[[objects]]\ncell = [2, 0]\nlabel = \"valve\"\n",
    )
    .expect("world");
    let reachable = world.reachable_cells();
    let mut mission = Mission::start(world, &config()).expect("start");

    let outcome = mission.run(|_| {}).expect("run");

    assert_eq!(outcome.stop, MissionStop::Complete);
    assert_eq!(outcome.tasks_completed, 4);
    let graph = mission.roadmap().read();
    let waypoints = graph.nodes().filter(|node| node.is_waypoint()).count();
    assert_eq!(waypoints, reachable);
    assert_eq!(reachable, 4);
    assert!(graph.find_waypoint_at(&Position::new(3.0, 0.0)).is_some());
    assert!(graph.nodes().any(|node| matches!(
        node.kind,
        NodeKind::WorldObject {
            status: ObjectStatus::Inspected,
            ..
        }
    )));
}

#[test]
fn agent_without_explore_capability_stalls() {
    let world = grid_world(&["S.."]);
    let mut cfg = config();
    cfg.agent.capabilities = vec![explorer::core::types::Capability::Traverse];
    let mut mission = Mission::start(world, &cfg).expect("start");

    let outcome = mission.run(|_| {}).expect("run");

    assert_eq!(outcome.stop, MissionStop::Stalled);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(mission.roadmap().read().frontier_count(), 1);
}

#[test]
fn coarse_resolution_merges_nearby_observations() {
    let world = GridWorld::parse("resolution = 0.04\nrows = [\"S.\"]\n").expect("world");
    let mut cfg = config();
    cfg.position_resolution = 0.1;
    let mut mission = Mission::start(world, &cfg).expect("start");

    let outcome = mission.run(|_| {}).expect("run");

    // (0.04, 0) snaps onto the seed's cell, so there is nothing to explore.
    assert_eq!(outcome.stop, MissionStop::Complete);
    assert_eq!(outcome.tasks_completed, 0);
    assert_eq!(mission.roadmap().read().node_count(), 1);
}
