//! Occupancy map sampled directly from an NDT grid.

use serde::{Deserialize, Serialize};

use super::occupancy_grid::{FREE, OCCUPIED, OccupancyGrid};
use crate::algorithms::ndt::NdtGrid;
use crate::core::math::steps_covering;
use crate::core::types::Point2D;

/// Sampling parameters for [`render_ndt_map`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NdtRenderConfig {
    /// Output cell size (meters).
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Samples must score strictly above this to be occupied.
    #[serde(default)]
    pub min_likelihood: f64,

    /// Samples must score strictly below this to be occupied.
    #[serde(default = "default_max_likelihood")]
    pub max_likelihood: f64,
}

fn default_resolution() -> f64 {
    0.05
}

fn default_max_likelihood() -> f64 {
    50.0
}

impl Default for NdtRenderConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            min_likelihood: 0.0,
            max_likelihood: default_max_likelihood(),
        }
    }
}

/// Sample `grid` on a lattice and mark occupied samples.
///
/// The output covers the grid's bounds at `config.resolution`; the sample
/// for cell `(i, j)` is taken at `origin + (i, j) * resolution`. Samples
/// with `min < likelihood < max` are occupied, everything else is free.
pub fn render_ndt_map(grid: &NdtGrid, config: &NdtRenderConfig) -> OccupancyGrid {
    let (min, max) = grid.bounds();
    let res = config.resolution;
    let width = steps_covering(max.x - min.x, res);
    let height = steps_covering(max.y - min.y, res);

    let mut map = OccupancyGrid::new(res, width, height, min, FREE);
    for cy in 0..height {
        let y = min.y + cy as f64 * res;
        for cx in 0..width {
            let x = min.x + cx as f64 * res;
            let l = grid.likelihood(&Point2D::new(x, y));
            if l > config.min_likelihood && l < config.max_likelihood {
                map.set(cx, cy, OCCUPIED);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::mapping::CellState;
    use crate::algorithms::ndt::NdtConfig;
    use crate::core::types::{Pose2D, Scan};

    fn wall_grid() -> NdtGrid {
        // Horizontal wall at y = 0.6
        let points = (0..50)
            .map(|i| Point2D::new(-1.0 + i as f64 * 0.04, 0.6))
            .collect();
        let scan = Scan::new(0, Pose2D::identity(), points);
        NdtGrid::from_scans(NdtConfig::with_resolution(0.25), &[scan], 2.0)
    }

    #[test]
    fn test_render_marks_wall() {
        let grid = wall_grid();
        let map = render_ndt_map(&grid, &NdtRenderConfig::default());

        assert_eq!(map.width(), 80);
        assert_eq!(map.height(), 80);

        let (cx, cy) = map.world_to_cell(0.0, 0.6).unwrap();
        assert_eq!(map.get_state(cx, cy), CellState::Occupied);

        let (cx, cy) = map.world_to_cell(0.0, -1.0).unwrap();
        assert_eq!(map.get_state(cx, cy), CellState::Free);

        let (free, unknown, occupied) = map.count_cells();
        assert_eq!(unknown, 0);
        assert!(occupied > 0);
        assert!(free > occupied);
    }

    #[test]
    fn test_render_band_is_exclusive() {
        let grid = wall_grid();
        let config = NdtRenderConfig {
            max_likelihood: 0.0,
            ..Default::default()
        };
        let (_, _, occupied) = render_ndt_map(&grid, &config).count_cells();
        assert_eq!(occupied, 0);
    }
}
