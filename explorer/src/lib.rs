//! Frontier-driven exploration over a roadmap belief graph.
//!
//! Agents observe their surroundings, record unvisited places as frontiers,
//! claim tasks to visit them or inspect perceived objects, plan over the
//! roadmap, and execute plans one edge at a time until no frontier remains.
//!
//! - **[`core`]**: Pure, deterministic logic (graph, sampling, task
//!   allocation, planning). No I/O.
//! - **[`io`]**: Side effects: configuration, persistence, and the robot
//!   boundary, including a grid-world simulator.
//!
//! Orchestration modules ([`executor`], [`mission`], [`select`]) drive core
//! logic against a [`io::robot::Robot`] to implement the CLI commands.

pub mod behavior;
pub mod core;
pub mod events;
pub mod executor;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod mission;
pub mod select;
pub mod shared;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
