//! Planar positions and the quantization used to compare them.
//!
//! Localization is noisy, so two reported positions are treated as the same
//! place when they snap to the same cell of a fixed grid. Every position
//! lookup in the roadmap goes through [`PositionKey`].

use serde::{Deserialize, Serialize};

/// Default grid resolution (meters) used for position equality.
pub const DEFAULT_RESOLUTION: f64 = 0.1;

/// A position in the plane, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Heading (radians, counter-clockwise from +x) pointing from `self` to `other`.
    ///
    /// Returns `0.0` when both positions coincide.
    pub fn heading_to(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx == 0.0 && dy == 0.0 {
            return 0.0;
        }
        dy.atan2(dx)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Grid cell a position snaps to at a given resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub col: i64,
    pub row: i64,
}

/// Snaps positions to grid cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    resolution: f64,
}

impl Quantizer {
    /// Create a quantizer. Non-positive or non-finite resolutions fall back to
    /// [`DEFAULT_RESOLUTION`].
    pub fn new(resolution: f64) -> Self {
        let resolution = if resolution.is_finite() && resolution > 0.0 {
            resolution
        } else {
            DEFAULT_RESOLUTION
        };
        Self { resolution }
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn key(&self, position: &Position) -> PositionKey {
        PositionKey {
            col: (position.x / self.resolution).round() as i64,
            row: (position.y / self.resolution).round() as i64,
        }
    }

    pub fn same_place(&self, a: &Position, b: &Position) -> bool {
        self.key(a) == self.key(b)
    }
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_positions_share_a_key() {
        let q = Quantizer::new(0.1);
        assert!(q.same_place(&Position::new(4.0, 0.0), &Position::new(4.02, -0.03)));
        assert!(!q.same_place(&Position::new(4.0, 0.0), &Position::new(4.1, 0.0)));
    }

    #[test]
    fn invalid_resolution_falls_back_to_default() {
        assert_eq!(Quantizer::new(0.0).resolution(), DEFAULT_RESOLUTION);
        assert_eq!(Quantizer::new(f64::NAN).resolution(), DEFAULT_RESOLUTION);
    }

    #[test]
    fn heading_points_toward_target() {
        let origin = Position::new(0.0, 0.0);
        assert_eq!(origin.heading_to(&Position::new(1.0, 0.0)), 0.0);
        let up = origin.heading_to(&Position::new(0.0, 2.0));
        assert!((up - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(origin.heading_to(&origin), 0.0);
    }
}
