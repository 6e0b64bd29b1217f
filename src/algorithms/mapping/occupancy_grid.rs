//! Rendered occupancy grid.
//!
//! Cell values follow the usual map convention:
//!
//! ```text
//! 100  occupied
//!   0  free
//!  -1  unknown
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Point2D;

/// Value of an occupied cell.
pub const OCCUPIED: i8 = 100;
/// Value of a free cell.
pub const FREE: i8 = 0;
/// Value of a cell with no observations.
pub const UNKNOWN: i8 = -1;

/// Cell state for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// Never observed
    Unknown,
    /// Observed empty
    Free,
    /// Observed obstacle
    Occupied,
}

impl CellState {
    fn from_value(value: i8) -> Self {
        if value < 0 {
            CellState::Unknown
        } else if value >= 50 {
            CellState::Occupied
        } else {
            CellState::Free
        }
    }
}

/// Row-major occupancy grid with the lower-left corner at `origin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    resolution: f64,
    width: usize,
    height: usize,
    origin: Point2D,
    data: Vec<i8>,
}

impl OccupancyGrid {
    /// Create a grid with every cell set to `fill`.
    pub fn new(resolution: f64, width: usize, height: usize, origin: Point2D, fill: i8) -> Self {
        Self {
            resolution,
            width,
            height,
            origin,
            data: vec![fill; width * height],
        }
    }

    /// Cell size in meters.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Map-frame position of the lower-left corner.
    #[inline]
    pub fn origin(&self) -> Point2D {
        self.origin
    }

    /// Raw cell values, row-major from the bottom row.
    pub fn data(&self) -> &[i8] {
        &self.data
    }

    /// Value at cell `(cx, cy)`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, cx: usize, cy: usize) -> Option<i8> {
        if cx < self.width && cy < self.height {
            Some(self.data[cy * self.width + cx])
        } else {
            None
        }
    }

    /// Set cell `(cx, cy)`; ignored outside the grid.
    #[inline]
    pub fn set(&mut self, cx: usize, cy: usize, value: i8) {
        if cx < self.width && cy < self.height {
            self.data[cy * self.width + cx] = value;
        }
    }

    /// State of cell `(cx, cy)`; unknown outside the grid.
    pub fn get_state(&self, cx: usize, cy: usize) -> CellState {
        self.get(cx, cy)
            .map(CellState::from_value)
            .unwrap_or(CellState::Unknown)
    }

    /// Convert world coordinates to cell indices.
    #[inline]
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let cx = ((x - self.origin.x) / self.resolution).floor();
        let cy = ((y - self.origin.y) / self.resolution).floor();

        if cx >= 0.0 && cy >= 0.0 {
            let cx = cx as usize;
            let cy = cy as usize;
            if cx < self.width && cy < self.height {
                return Some((cx, cy));
            }
        }
        None
    }

    /// Convert cell indices to world coordinates (center of cell).
    #[inline]
    pub fn cell_to_world(&self, cx: usize, cy: usize) -> Point2D {
        Point2D::new(
            self.origin.x + (cx as f64 + 0.5) * self.resolution,
            self.origin.y + (cy as f64 + 0.5) * self.resolution,
        )
    }

    /// Export map as grayscale image data.
    ///
    /// Returns (width, height, pixels) where pixels are 0-255 grayscale values.
    /// 0 = occupied, 128 = unknown, 255 = free
    pub fn to_grayscale(&self) -> (usize, usize, Vec<u8>) {
        let pixels = self
            .data
            .iter()
            .map(|&v| match CellState::from_value(v) {
                CellState::Free => 255u8,
                CellState::Unknown => 128u8,
                CellState::Occupied => 0u8,
            })
            .collect();

        (self.width, self.height, pixels)
    }

    /// Count cells by state as (free, unknown, occupied).
    pub fn count_cells(&self) -> (usize, usize, usize) {
        let mut free = 0;
        let mut unknown = 0;
        let mut occupied = 0;

        for &value in &self.data {
            match CellState::from_value(value) {
                CellState::Free => free += 1,
                CellState::Unknown => unknown += 1,
                CellState::Occupied => occupied += 1,
            }
        }

        (free, unknown, occupied)
    }

    /// Write the grid as a binary PGM (P5) image.
    ///
    /// Rows are flipped so the image has +y up. Free is white (254),
    /// occupied black (0) and unknown gray (205).
    pub fn write_pgm<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        writeln!(writer, "P5")?;
        writeln!(writer, "{} {}", self.width, self.height)?;
        writeln!(writer, "255")?;

        let mut row = Vec::with_capacity(self.width);
        for cy in (0..self.height).rev() {
            row.clear();
            row.extend(
                self.data[cy * self.width..(cy + 1) * self.width]
                    .iter()
                    .map(|&v| match CellState::from_value(v) {
                        CellState::Free => 254u8,
                        CellState::Occupied => 0u8,
                        CellState::Unknown => 205u8,
                    }),
            );
            writer.write_all(&row)?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_world_cell_conversion() {
        let grid = OccupancyGrid::new(0.1, 20, 10, Point2D::new(-1.0, -0.5), UNKNOWN);

        assert_eq!(grid.world_to_cell(-1.0, -0.5), Some((0, 0)));
        assert_eq!(grid.world_to_cell(0.05, 0.05), Some((10, 5)));
        assert_eq!(grid.world_to_cell(1.0, 0.0), None);
        assert_eq!(grid.world_to_cell(-1.01, 0.0), None);

        let center = grid.cell_to_world(10, 5);
        assert!((center.x - 0.05).abs() < 1e-9);
        assert!((center.y - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_count_and_grayscale() {
        let mut grid = OccupancyGrid::new(0.05, 3, 2, Point2D::new(0.0, 0.0), UNKNOWN);
        grid.set(0, 0, OCCUPIED);
        grid.set(1, 0, FREE);
        grid.set(5, 5, OCCUPIED);

        assert_eq!(grid.count_cells(), (1, 4, 1));
        assert_eq!(grid.get_state(0, 0), CellState::Occupied);
        assert_eq!(grid.get_state(9, 9), CellState::Unknown);

        let (w, h, pixels) = grid.to_grayscale();
        assert_eq!((w, h), (3, 2));
        assert_eq!(&pixels[..3], &[0, 255, 128]);
    }

    #[test]
    fn test_write_pgm() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.pgm");

        let mut grid = OccupancyGrid::new(0.05, 2, 2, Point2D::new(0.0, 0.0), FREE);
        grid.set(0, 1, OCCUPIED);
        grid.write_pgm(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let header = b"P5\n2 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        // Top row of the image is the highest y row
        assert_eq!(&bytes[header.len()..], &[0, 254, 254, 254]);
    }
}
