//! Deterministic, pure logic for the roadmap and the task/plan cycle.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod agent;
pub mod allocator;
pub mod graph;
pub mod invariants;
pub mod planner;
pub mod position;
pub mod sampler;
pub mod snapshot;
pub mod tasks;
pub mod types;
pub mod view;
