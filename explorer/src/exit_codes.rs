//! Stable exit codes for explorer CLI commands.

/// Command succeeded; for `run`, exploration completed.
pub const OK: i32 = 0;
/// Invalid config, world, or snapshot, or any other error.
pub const INVALID: i32 = 1;
/// Frontiers remain but no agent can reach them.
pub const STALLED: i32 = 2;
/// `explorer run` hit `max_iterations` before completing.
pub const ITERATION_LIMIT: i32 = 3;
