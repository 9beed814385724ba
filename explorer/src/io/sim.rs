//! Grid-world simulator implementing [`Robot`].
//!
//! Worlds are TOML files:
//!
//! ```toml
//! resolution = 1.0
//! sensor_range = 1
//! rows = [
//!   "S..#",
//!   ".#.~",
//! ]
//!
//! [[objects]]
//! cell = [2, 1]
//! label = "fiducial"
//! ```
//!
//! `.` is free, `#` is a wall (never observed), `S` is the free start cell,
//! and `~` is a hazard: observed as traversable, but every move into it fails.
//! Column `c`, row `r` maps to position `(c * resolution, r * resolution)`.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::position::Position;
use crate::core::sampler::WorldObjectSighting;
use crate::io::robot::{MoveResult, Robot};

/// On-disk world description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldFile {
    /// Cell size in meters.
    pub resolution: f64,
    /// Object sighting range in cells (Chebyshev distance).
    pub sensor_range: u32,
    pub rows: Vec<String>,
    pub objects: Vec<ObjectSpec>,
}

impl Default for WorldFile {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            sensor_range: 1,
            rows: Vec::new(),
            objects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// `[column, row]`.
    pub cell: [i64; 2],
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Free,
    Wall,
    Hazard,
}

type CellIndex = (i64, i64);

/// A simulated robot in a grid world.
#[derive(Debug, Clone)]
pub struct GridWorld {
    resolution: f64,
    sensor_range: i64,
    cells: Vec<Vec<Cell>>,
    objects: Vec<(CellIndex, String)>,
    start: CellIndex,
    at: CellIndex,
    heading: f64,
    moves: u64,
}

impl GridWorld {
    /// Load a world from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read world {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parse world {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let file: WorldFile = toml::from_str(contents).context("parse world toml")?;
        Self::from_file(&file)
    }

    pub fn from_file(file: &WorldFile) -> Result<Self> {
        if !(file.resolution.is_finite() && file.resolution > 0.0) {
            bail!("resolution must be > 0");
        }
        let mut start = None;
        let mut cells = Vec::with_capacity(file.rows.len());
        for (row, line) in file.rows.iter().enumerate() {
            let mut parsed = Vec::with_capacity(line.len());
            for (col, ch) in line.chars().enumerate() {
                let cell = match ch {
                    '.' => Cell::Free,
                    '#' => Cell::Wall,
                    '~' => Cell::Hazard,
                    'S' => {
                        if start.replace((col as i64, row as i64)).is_some() {
                            bail!("world has more than one start cell");
                        }
                        Cell::Free
                    }
                    other => bail!("unknown cell '{other}' at column {col}, row {row}"),
                };
                parsed.push(cell);
            }
            cells.push(parsed);
        }
        let start = start.ok_or_else(|| anyhow!("world has no start cell 'S'"))?;

        let mut world = Self {
            resolution: file.resolution,
            sensor_range: i64::from(file.sensor_range),
            cells,
            objects: Vec::new(),
            start,
            at: start,
            heading: 0.0,
            moves: 0,
        };
        for spec in &file.objects {
            let cell = (spec.cell[0], spec.cell[1]);
            if world.cell(cell) != Some(Cell::Free) {
                bail!(
                    "object '{}' at [{}, {}] must sit on a free cell",
                    spec.label,
                    cell.0,
                    cell.1
                );
            }
            world.objects.push((cell, spec.label.clone()));
        }
        Ok(world)
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn start_position(&self) -> Position {
        self.position_of(self.start)
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Number of successful moves so far.
    pub fn moves(&self) -> u64 {
        self.moves
    }

    /// Count of free cells reachable from the start without entering hazards.
    pub fn reachable_cells(&self) -> usize {
        let mut seen = BTreeSet::from([self.start]);
        let mut queue = VecDeque::from([self.start]);
        while let Some(cell) = queue.pop_front() {
            for next in neighbors_of(cell) {
                if self.cell(next) == Some(Cell::Free) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.len()
    }

    fn cell(&self, (col, row): CellIndex) -> Option<Cell> {
        if col < 0 || row < 0 {
            return None;
        }
        self.cells.get(row as usize)?.get(col as usize).copied()
    }

    fn cell_of(&self, position: &Position) -> CellIndex {
        (
            (position.x / self.resolution).round() as i64,
            (position.y / self.resolution).round() as i64,
        )
    }

    fn position_of(&self, (col, row): CellIndex) -> Position {
        Position::new(col as f64 * self.resolution, row as f64 * self.resolution)
    }
}

fn neighbors_of((col, row): CellIndex) -> [CellIndex; 4] {
    [(col + 1, row), (col, row + 1), (col - 1, row), (col, row - 1)]
}

impl Robot for GridWorld {
    fn get_localization(&self) -> Position {
        self.position_of(self.at)
    }

    fn observe_neighbors(&mut self, at: Position) -> Vec<Position> {
        let cell = self.cell_of(&at);
        neighbors_of(cell)
            .into_iter()
            .filter(|next| matches!(self.cell(*next), Some(Cell::Free | Cell::Hazard)))
            .map(|next| self.position_of(next))
            .collect()
    }

    fn look_for_world_objects(&mut self) -> Vec<WorldObjectSighting> {
        let (col, row) = self.at;
        self.objects
            .iter()
            .filter(|((c, r), _)| (c - col).abs().max((r - row).abs()) <= self.sensor_range)
            .map(|(cell, label)| WorldObjectSighting {
                position: self.position_of(*cell),
                label: label.clone(),
            })
            .collect()
    }

    #[instrument(skip(self), fields(from = ?self.at))]
    fn move_to(&mut self, target: Position, heading: f64) -> MoveResult {
        let cell = self.cell_of(&target);
        let step = (cell.0 - self.at.0).abs() + (cell.1 - self.at.1).abs();
        if step > 1 || self.cell(cell) != Some(Cell::Free) {
            debug!(to = ?cell, "move rejected");
            return MoveResult::Failure;
        }
        self.at = cell;
        self.heading = heading;
        self.moves += 1;
        MoveResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: &str = r#"
resolution = 0.5
sensor_range = 1
rows = [
  "S.~",
  ".##",
]

[[objects]]
cell = [1, 0]
label = "fiducial"
"#;

    #[test]
    fn parse_places_robot_on_start() {
        let world = GridWorld::parse(WORLD).expect("parse");
        assert_eq!(world.get_localization(), Position::new(0.0, 0.0));
        assert_eq!(world.reachable_cells(), 3);
    }

    #[test]
    fn observe_skips_walls_but_reports_hazards() {
        let mut world = GridWorld::parse(WORLD).expect("parse");
        let seen = world.observe_neighbors(Position::new(0.5, 0.0));
        assert_eq!(seen, vec![Position::new(1.0, 0.0), Position::new(0.0, 0.0)]);
    }

    #[test]
    fn moves_are_limited_to_adjacent_free_cells() {
        let mut world = GridWorld::parse(WORLD).expect("parse");
        assert_eq!(world.move_to(Position::new(1.0, 0.0), 0.0), MoveResult::Failure);
        assert_eq!(world.move_to(Position::new(0.5, 0.0), 0.0), MoveResult::Success);
        assert_eq!(world.move_to(Position::new(1.0, 0.0), 0.0), MoveResult::Failure);
        assert_eq!(world.move_to(Position::new(0.5, 0.5), 0.0), MoveResult::Failure);
        assert_eq!(world.moves(), 1);
    }

    #[test]
    fn objects_are_seen_within_sensor_range() {
        let mut world = GridWorld::parse(WORLD).expect("parse");
        let sightings = world.look_for_world_objects();
        assert_eq!(sightings.len(), 1);
        assert_eq!(sightings[0].label, "fiducial");
        assert_eq!(sightings[0].position, Position::new(0.5, 0.0));
    }

    #[test]
    fn rejects_missing_start_and_bad_objects() {
        assert!(GridWorld::parse("rows = [\"..\"]").is_err());
        let err = GridWorld::parse(
            "rows = [\"S#\"]\n[[objects]]\ncell = [1, 0]\nlabel = \"x\"\n",
        )
        .expect_err("object on wall");
        assert!(err.to_string().contains("free cell"));
    }
}
