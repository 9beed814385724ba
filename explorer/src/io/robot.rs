//! Robot abstraction for localization, perception, and locomotion.
//!
//! The [`Robot`] trait decouples the mission loop from the actual platform.
//! The bundled [`crate::io::sim::GridWorld`] implements it for simulation;
//! tests use scripted robots that replay predetermined observations.

use serde::{Deserialize, Serialize};

use crate::core::position::Position;
use crate::core::sampler::WorldObjectSighting;

/// Result of a single movement command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveResult {
    Success,
    Failure,
}

impl MoveResult {
    pub fn is_success(self) -> bool {
        matches!(self, MoveResult::Success)
    }
}

/// Platform collaborator consumed by the mission loop.
///
/// Every call is synchronous and may take bounded wall-clock time. Timeouts
/// are the implementation's concern and surface as [`MoveResult::Failure`].
pub trait Robot {
    fn get_localization(&self) -> Position;

    /// Traversable positions observable from `at`.
    fn observe_neighbors(&mut self, at: Position) -> Vec<Position>;

    fn look_for_world_objects(&mut self) -> Vec<WorldObjectSighting>;

    /// Move to `target`, ending with `heading` (radians).
    fn move_to(&mut self, target: Position, heading: f64) -> MoveResult;
}
