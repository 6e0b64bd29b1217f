//! Ray-traced occupancy rendering.
//!
//! Every scan point casts a ray from its scan pose. Cells the ray passes
//! through count as empty, the endpoint cell counts as a hit. A cell whose
//! hit ratio exceeds `occ_thresh` is occupied.
//!
//! # Algorithm
//!
//! Uses Bresenham's line algorithm for integer-only traversal of grid cells
//! along a ray from the scan pose to the scan endpoint.

use serde::{Deserialize, Serialize};

use super::occupancy_grid::{FREE, OCCUPIED, OccupancyGrid};
use crate::core::types::{Point2D, Scan};

/// Configuration for [`RayTraceRenderer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayTraceConfig {
    /// Output cell size (meters).
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Hit ratio above which a touched cell is occupied.
    #[serde(default = "default_occ_thresh")]
    pub occ_thresh: f64,
}

fn default_resolution() -> f64 {
    0.05
}

fn default_occ_thresh() -> f64 {
    0.25
}

impl Default for RayTraceConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            occ_thresh: default_occ_thresh(),
        }
    }
}

/// Renders scan histories into occupancy grids.
///
/// Map bounds grow incrementally: only scans appended since the last render
/// are folded into the bounds, so callers must pass the same history with
/// new scans at the end.
#[derive(Debug, Clone)]
pub struct RayTraceRenderer {
    config: RayTraceConfig,
    min: Point2D,
    max: Point2D,
    num_scans: usize,
}

impl RayTraceRenderer {
    /// Create a renderer with empty bounds.
    pub fn new(config: RayTraceConfig) -> Self {
        Self {
            config,
            min: Point2D::new(f64::INFINITY, f64::INFINITY),
            max: Point2D::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            num_scans: 0,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &RayTraceConfig {
        &self.config
    }

    /// Forget accumulated bounds.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Fold scans past the last seen count into the bounds.
    ///
    /// A shorter history than before is treated as a new one.
    fn update_bounds(&mut self, scans: &[Scan]) {
        if scans.len() < self.num_scans {
            self.reset();
        }

        for scan in &scans[self.num_scans..] {
            let pose = scan.pose.position();
            for p in std::iter::once(pose).chain(scan.map_points()) {
                if !p.is_finite() {
                    continue;
                }
                self.min.x = self.min.x.min(p.x);
                self.min.y = self.min.y.min(p.y);
                self.max.x = self.max.x.max(p.x);
                self.max.y = self.max.y.max(p.y);
            }
        }
        self.num_scans = scans.len();
    }

    /// Render `scans` at their own poses.
    pub fn render(&mut self, scans: &[Scan]) -> OccupancyGrid {
        let res = self.config.resolution;
        self.update_bounds(scans);

        if !(res > 0.0) || !self.min.is_finite() || !self.max.is_finite() {
            return OccupancyGrid::new(res, 0, 0, Point2D::default(), FREE);
        }

        // Snap to resolution and pad
        let pad = 5.0 * res;
        let min_x = (self.min.x / res).floor() * res - pad;
        let min_y = (self.min.y / res).floor() * res - pad;
        let max_x = (self.max.x / res).ceil() * res + pad;
        let max_y = (self.max.y / res).ceil() * res + pad;
        let width = ((max_x - min_x) / res).round() as usize;
        let height = ((max_y - min_y) / res).round() as usize;

        let mut map = OccupancyGrid::new(res, width, height, Point2D::new(min_x, min_y), -1);
        let mut hit = vec![0u32; width * height];
        let mut empty = vec![0u32; width * height];

        let to_cell = |x: f64, y: f64| -> (i64, i64) {
            (
                ((x - min_x) / res).floor() as i64,
                ((y - min_y) / res).floor() as i64,
            )
        };

        for scan in scans {
            let start = to_cell(scan.pose.x, scan.pose.y);
            for end in scan.map_points().filter(Point2D::is_finite) {
                let end = to_cell(end.x, end.y);
                trace(start, end, |x, y, is_hit| {
                    if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
                        return;
                    }
                    let index = y as usize * width + x as usize;
                    if is_hit {
                        hit[index] += 1;
                    } else {
                        empty[index] += 1;
                    }
                });
            }
        }

        for cy in 0..height {
            for cx in 0..width {
                let index = cy * width + cx;
                let touches = hit[index] + empty[index];
                if touches == 0 {
                    continue;
                }
                let value = if hit[index] as f64 / touches as f64 > self.config.occ_thresh {
                    OCCUPIED
                } else {
                    FREE
                };
                map.set(cx, cy, value);
            }
        }

        log::debug!(
            "Ray-traced {} scans into {}x{} map",
            scans.len(),
            width,
            height
        );
        map
    }
}

impl Default for RayTraceRenderer {
    fn default() -> Self {
        Self::new(RayTraceConfig::default())
    }
}

/// Walk from `start` to `end`, calling `visit(x, y, is_hit)` per cell.
///
/// Traversed cells are reported as empty; the ray ends with a single hit,
/// either on the endpoint or on the last cell once one axis is exhausted.
fn trace(start: (i64, i64), end: (i64, i64), mut visit: impl FnMut(i64, i64, bool)) {
    let (end_x, end_y) = end;
    let dx = (end_x - start.0).abs();
    let sx = if start.0 < end_x { 1 } else { -1 };
    let dy = -(end_y - start.1).abs();
    let sy = if start.1 < end_y { 1 } else { -1 };
    let mut error = dx + dy;

    let (mut x, mut y) = start;
    loop {
        if x == end_x && y == end_y {
            visit(x, y, true);
            return;
        }
        visit(x, y, false);
        if 2 * error >= dy {
            if x == end_x {
                visit(x, y, true);
                return;
            }
            error += dy;
            x += sx;
        }
        if 2 * error <= dx {
            if y == end_y {
                visit(x, y, true);
                return;
            }
            error += dx;
            y += sy;
        }
    }
}
