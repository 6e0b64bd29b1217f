//! Dense NDT grid over a bounded rectangle.

use super::{Cell, NdtConfig};
use crate::core::math::steps_covering;
use crate::core::types::{Point2D, Pose2D, Scan};

/// Fixed-size array of NDT cells.
///
/// Covers `[origin, origin + size)` with `resolution`-sized cells stored
/// row-major (`index = gy * width + gx`). Dimensions never change after
/// construction; points outside the bounds are ignored on ingestion and
/// score 0 on query.
///
/// # Example
///
/// ```
/// use ndt_slam::algorithms::ndt::{NdtConfig, NdtGrid};
/// use ndt_slam::core::types::{Point2D, Pose2D, Scan};
///
/// let mut grid = NdtGrid::new(NdtConfig::with_resolution(1.0), 10.0, 10.0, -5.0, -5.0);
/// let scan = Scan::new(0, Pose2D::identity(), vec![
///     Point2D::new(3.5, 3.5),
///     Point2D::new(3.45, 3.4),
///     Point2D::new(3.55, 3.6),
/// ]);
/// grid.add_scan(&scan, &Pose2D::identity());
/// grid.compute();
///
/// assert_eq!(grid.likelihood_points(&[Point2D::new(3.5, 3.5)]), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct NdtGrid {
    config: NdtConfig,
    width: usize,
    height: usize,
    origin_x: f64,
    origin_y: f64,
    cells: Vec<Cell>,
}

impl NdtGrid {
    /// Create a grid of `width_m × height_m` meters with lower corner at origin.
    ///
    /// Cell counts are `ceil(width_m / resolution)` by
    /// `ceil(height_m / resolution)`.
    pub fn new(config: NdtConfig, width_m: f64, height_m: f64, origin_x: f64, origin_y: f64) -> Self {
        let width = steps_covering(width_m, config.resolution);
        let height = steps_covering(height_m, config.resolution);
        Self {
            config,
            width,
            height,
            origin_x,
            origin_y,
            cells: vec![Cell::default(); width * height],
        }
    }

    /// Create a grid spanning `[min, max)`.
    pub fn from_bounds(config: NdtConfig, min: Point2D, max: Point2D) -> Self {
        Self::new(config, max.x - min.x, max.y - min.y, min.x, min.y)
    }

    /// Grid without cells; every query scores 0.
    pub fn empty(config: NdtConfig) -> Self {
        Self::new(config, 0.0, 0.0, 0.0, 0.0)
    }

    /// Build a computed grid from scans at their own poses.
    ///
    /// Bounds are the box around every scan pose grown by `padding` on each
    /// side, so any return within `padding` of its pose is captured.
    pub fn from_scans(config: NdtConfig, scans: &[Scan], padding: f64) -> Self {
        if scans.is_empty() {
            return Self::empty(config);
        }

        let mut min = Point2D::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2D::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for scan in scans {
            min.x = min.x.min(scan.pose.x);
            min.y = min.y.min(scan.pose.y);
            max.x = max.x.max(scan.pose.x);
            max.y = max.y.max(scan.pose.y);
        }

        let mut grid = Self::from_bounds(
            config,
            Point2D::new(min.x - padding, min.y - padding),
            Point2D::new(max.x + padding, max.y + padding),
        );
        for scan in scans {
            grid.add_scan_at_own_pose(scan);
        }
        grid.compute();
        grid
    }

    /// Grid configuration.
    pub fn config(&self) -> &NdtConfig {
        &self.config
    }

    /// Cell edge length in meters.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.config.resolution
    }

    /// Number of cells along x.
    #[inline]
    pub fn width_cells(&self) -> usize {
        self.width
    }

    /// Number of cells along y.
    #[inline]
    pub fn height_cells(&self) -> usize {
        self.height
    }

    /// Lower corner of the grid in the map frame.
    #[inline]
    pub fn origin(&self) -> Point2D {
        Point2D::new(self.origin_x, self.origin_y)
    }

    /// Map-frame bounds as (min, max) corners.
    pub fn bounds(&self) -> (Point2D, Point2D) {
        let res = self.config.resolution;
        (
            self.origin(),
            Point2D::new(
                self.origin_x + self.width as f64 * res,
                self.origin_y + self.height as f64 * res,
            ),
        )
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Index of the cell containing `(x, y)`, or `None` when out of bounds.
    #[inline]
    pub fn cell_index(&self, x: f64, y: f64) -> Option<usize> {
        let res = self.config.resolution;
        let gx = ((x - self.origin_x) / res).floor();
        let gy = ((y - self.origin_y) / res).floor();
        // Negated comparisons also reject NaN
        if !(gx >= 0.0 && gy >= 0.0) {
            return None;
        }
        let (gx, gy) = (gx as usize, gy as usize);
        if gx >= self.width || gy >= self.height {
            return None;
        }
        Some(gy * self.width + gx)
    }

    /// Cell containing `point`, if any.
    pub fn cell_at(&self, point: &Point2D) -> Option<&Cell> {
        self.cell_index(point.x, point.y).map(|i| &self.cells[i])
    }

    /// Transform `scan.points` by `pose` and record them in their cells.
    ///
    /// Statistics are not updated until [`NdtGrid::compute`].
    pub fn add_scan(&mut self, scan: &Scan, pose: &Pose2D) {
        let (sin_t, cos_t) = pose.theta.sin_cos();
        for p in &scan.points {
            let x = pose.x + p.x * cos_t - p.y * sin_t;
            let y = pose.y + p.x * sin_t + p.y * cos_t;
            if let Some(index) = self.cell_index(x, y) {
                self.cells[index].add_point(Point2D::new(x, y));
            }
        }
    }

    /// Add a scan at its own corrected pose.
    pub fn add_scan_at_own_pose(&mut self, scan: &Scan) {
        self.add_scan(scan, &scan.pose);
    }

    /// Compute statistics of every cell.
    pub fn compute(&mut self) {
        let config = self.config;
        for cell in &mut self.cells {
            cell.compute(&config);
        }
    }

    /// Number of cells that can be scored.
    pub fn valid_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_valid()).count()
    }

    /// True when no cell can contribute a score.
    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(Cell::is_valid)
    }

    /// Score of a single map-frame point; 0 out of bounds or on invalid cells.
    #[inline]
    pub fn likelihood(&self, point: &Point2D) -> f64 {
        match self.cell_index(point.x, point.y) {
            Some(index) => self.cells[index].score(point),
            None => 0.0,
        }
    }

    /// Summed likelihood of map-frame points.
    pub fn likelihood_points(&self, points: &[Point2D]) -> f64 {
        points.iter().map(|p| self.likelihood(p)).sum()
    }

    /// Summed likelihood of sensor-frame points placed at `pose`.
    pub fn likelihood_points_at(&self, points: &[Point2D], pose: &Pose2D) -> f64 {
        points
            .iter()
            .map(|p| self.likelihood(&pose.transform_point(p)))
            .sum()
    }

    /// Summed likelihood of a scan at its own pose.
    pub fn likelihood_scan(&self, scan: &Scan) -> f64 {
        self.likelihood_points_at(&scan.points, &scan.pose)
    }

    /// Summed likelihood of a scan at `scan.pose ⊕ correction`.
    pub fn likelihood_scan_with_correction(&self, scan: &Scan, correction: &Pose2D) -> f64 {
        self.likelihood_points_at(&scan.points, &scan.pose.compose(correction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn unit_grid() -> NdtGrid {
        NdtGrid::new(NdtConfig::with_resolution(1.0), 10.0, 10.0, -5.0, -5.0)
    }

    fn fixture_scan() -> Scan {
        Scan::new(
            0,
            Pose2D::identity(),
            vec![
                Point2D::new(3.5, 3.5),
                Point2D::new(3.45, 3.4),
                Point2D::new(3.55, 3.6),
            ],
        )
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = unit_grid();
        assert_eq!(grid.width_cells(), 10);
        assert_eq!(grid.height_cells(), 10);
        assert_eq!(grid.cells().len(), 100);

        let grid = NdtGrid::new(NdtConfig::with_resolution(0.25), 2.1, 1.0, 0.0, 0.0);
        assert_eq!(grid.width_cells(), 9);
        assert_eq!(grid.height_cells(), 4);
    }

    #[test]
    fn test_cell_index_bounds() {
        let grid = unit_grid();
        assert_eq!(grid.cell_index(-5.0, -5.0), Some(0));
        assert_eq!(grid.cell_index(3.5, 3.5), Some(8 * 10 + 8));
        assert_eq!(grid.cell_index(4.999, 4.999), Some(99));
        assert_eq!(grid.cell_index(5.0, 0.0), None);
        assert_eq!(grid.cell_index(-5.01, 0.0), None);
        assert_eq!(grid.cell_index(f64::NAN, 0.0), None);
    }

    #[test]
    fn test_single_scan_likelihood() {
        let mut grid = unit_grid();
        grid.add_scan(&fixture_scan(), &Pose2D::identity());
        grid.compute();

        assert_eq!(grid.valid_cell_count(), 1);
        assert_eq!(grid.likelihood_points(&[Point2D::new(3.5, 3.5)]), 1.0);
    }

    #[test]
    fn test_scoring_requires_compute() {
        let mut grid = unit_grid();
        grid.add_scan(&fixture_scan(), &Pose2D::identity());
        assert!(grid.is_empty());
        assert_eq!(grid.likelihood(&Point2D::new(3.5, 3.5)), 0.0);

        grid.compute();
        assert!(!grid.is_empty());
    }

    #[test]
    fn test_add_scan_applies_pose() {
        let mut grid = unit_grid();
        // Rotating (3.5, -3.5) by +90° lands on (3.5, 3.5)
        let scan = Scan::new(
            0,
            Pose2D::identity(),
            vec![
                Point2D::new(3.5, -3.5),
                Point2D::new(3.4, -3.45),
                Point2D::new(3.6, -3.55),
            ],
        );
        grid.add_scan(&scan, &Pose2D::new(0.0, 0.0, FRAC_PI_2));
        grid.compute();

        let cell = grid.cell_at(&Point2D::new(3.5, 3.5)).unwrap();
        assert_eq!(cell.point_count(), 3);
        assert_relative_eq!(cell.mean().x, 3.5, epsilon = 1e-12);
        assert_relative_eq!(cell.mean().y, 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_bounds_points_are_dropped() {
        let mut grid = unit_grid();
        let scan = Scan::new(
            0,
            Pose2D::identity(),
            vec![Point2D::new(20.0, 0.0), Point2D::new(0.0, -9.0)],
        );
        grid.add_scan(&scan, &Pose2D::identity());
        grid.compute();

        assert!(grid.cells().iter().all(|c| c.point_count() == 0));
        assert_eq!(grid.likelihood(&Point2D::new(20.0, 0.0)), 0.0);
    }

    #[test]
    fn test_scan_likelihood_variants_agree() {
        let mut grid = unit_grid();
        let mut scan = fixture_scan();
        grid.add_scan_at_own_pose(&scan);
        grid.compute();

        let direct = grid.likelihood_points(&scan.points);
        assert_relative_eq!(grid.likelihood_scan(&scan), direct, epsilon = 1e-12);
        assert_relative_eq!(
            grid.likelihood_scan_with_correction(&scan, &Pose2D::identity()),
            direct,
            epsilon = 1e-12
        );

        // Scan moved away, correction brings it back
        scan.set_pose(Pose2D::new(-0.5, 0.0, 0.0));
        let corrected = grid.likelihood_scan_with_correction(&scan, &Pose2D::new(0.5, 0.0, 0.0));
        assert_relative_eq!(corrected, direct, epsilon = 1e-12);
        assert!(grid.likelihood_scan(&scan) < direct);
    }

    #[test]
    fn test_empty_grid() {
        let grid = NdtGrid::empty(NdtConfig::default());
        assert!(grid.cells().is_empty());
        assert!(grid.is_empty());
        assert_eq!(grid.likelihood(&Point2D::new(0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_non_finite_padding_gives_empty_grid() {
        let scans = vec![Scan::new(0, Pose2D::identity(), vec![Point2D::new(1.0, 0.0)])];
        for padding in [f64::INFINITY, f64::NAN] {
            let grid = NdtGrid::from_scans(NdtConfig::default(), &scans, padding);
            assert_eq!(grid.width_cells(), 0);
            assert_eq!(grid.height_cells(), 0);
            assert!(grid.is_empty());
            assert_eq!(grid.likelihood(&Point2D::new(1.0, 0.0)), 0.0);
        }
    }

    #[test]
    fn test_from_scans_pads_pose_box() {
        let scans = vec![
            Scan::new(0, Pose2D::new(-1.0, 0.0, 0.0), vec![Point2D::new(2.0, 0.0)]),
            Scan::new(1, Pose2D::new(3.0, 2.0, 0.0), vec![Point2D::new(-2.0, -2.0)]),
        ];
        let grid = NdtGrid::from_scans(NdtConfig::with_resolution(0.5), &scans, 4.0);
        let (min, max) = grid.bounds();
        assert_relative_eq!(min.x, -5.0);
        assert_relative_eq!(min.y, -4.0);
        assert_relative_eq!(max.x, 7.0);
        assert_relative_eq!(max.y, 6.0);

        let cell = grid.cell_at(&Point2D::new(1.0, 0.0)).unwrap();
        assert_eq!(cell.point_count(), 2);

        assert!(NdtGrid::from_scans(NdtConfig::default(), &[], 4.0).cells().is_empty());
    }

    #[test]
    fn test_bounds() {
        let grid = NdtGrid::from_bounds(
            NdtConfig::with_resolution(0.5),
            Point2D::new(-1.0, -2.0),
            Point2D::new(1.0, 2.0),
        );
        let (min, max) = grid.bounds();
        assert_relative_eq!(min.x, -1.0);
        assert_relative_eq!(min.y, -2.0);
        assert_relative_eq!(max.x, 1.0);
        assert_relative_eq!(max.y, 2.0);
    }
}
