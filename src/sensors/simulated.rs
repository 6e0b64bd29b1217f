//! Synthetic LiDAR readings inside a rectangular room.
//!
//! Used to drive the mapper without hardware: tests, benchmarks and
//! generated replay bags all take their scans from here.

use std::f64::consts::TAU;

use crate::core::types::{LaserScan, Pose2D};

/// Axis-aligned rectangular room with walls on its boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleRoom {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl RectangleRoom {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whether `(x, y)` lies strictly inside the walls.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.min_x && x < self.max_x && y > self.min_y && y < self.max_y
    }

    /// Distance from `(x, y)` to the first wall along `angle`.
    ///
    /// `None` when the origin is outside the room.
    pub fn ray_distance(&self, x: f64, y: f64, angle: f64) -> Option<f64> {
        if !self.contains(x, y) {
            return None;
        }
        let (s, c) = angle.sin_cos();
        let tx = if c > 0.0 {
            (self.max_x - x) / c
        } else if c < 0.0 {
            (self.min_x - x) / c
        } else {
            f64::INFINITY
        };
        let ty = if s > 0.0 {
            (self.max_y - y) / s
        } else if s < 0.0 {
            (self.min_y - y) / s
        } else {
            f64::INFINITY
        };
        Some(tx.min(ty))
    }

    /// Full 360° sweep of `readings` beams taken at `pose`.
    ///
    /// Walls beyond `range_max` read as NaN, as do all beams when the pose
    /// is outside the room.
    pub fn scan(&self, pose: &Pose2D, readings: usize, range_max: f64) -> LaserScan {
        let increment = TAU / readings.max(1) as f64;
        let ranges = (0..readings)
            .map(|i| {
                let angle = pose.theta + i as f64 * increment;
                match self.ray_distance(pose.x, pose.y, angle) {
                    Some(d) if d <= range_max => d,
                    _ => f64::NAN,
                }
            })
            .collect();
        LaserScan::new(0.0, increment, 0.05, range_max, ranges)
    }
}

impl Default for RectangleRoom {
    /// A 4 m × 3 m room around the origin.
    fn default() -> Self {
        Self::new(-1.9, -1.4, 2.1, 1.6)
    }
}
