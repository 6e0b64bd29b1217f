//! Exhaustive NDT scan matcher.
//!
//! # Algorithm
//!
//! 1. Build an NDT grid from the reference scans
//! 2. Subsample the query scan with an even stride
//! 3. For each theta offset, rotate the points once, then score every
//!    (x, y) offset by shifting the rotated points
//! 4. Keep the best candidate and accumulate the likelihood-weighted
//!    moments of all candidates for the covariance estimate

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use super::{NdtMatcherConfig, ScanMatchResult, ScanMatcher};
use crate::algorithms::ndt::NdtGrid;
use crate::core::types::{Covariance2D, Point2D, Pose2D, Scan};

/// Sensor range assumed until [`ScanMatcher::set_range_max`] is called.
pub const DEFAULT_RANGE_MAX: f64 = 12.0;

/// Best candidate and weighted moments of one theta slice.
struct SliceResult {
    best_score: f64,
    best_offset: Vector3<f64>,
    /// Σ w x xᵀ
    second_moment: Matrix3<f64>,
    /// Σ w x
    first_moment: Vector3<f64>,
    /// Σ w
    weight: f64,
}

impl SliceResult {
    fn new() -> Self {
        Self {
            best_score: 0.0,
            best_offset: Vector3::zeros(),
            second_moment: Matrix3::zeros(),
            first_moment: Vector3::zeros(),
            weight: 0.0,
        }
    }

    /// Fold `other` in; earlier slices win ties.
    fn merge(&mut self, other: &SliceResult) {
        if other.best_score > self.best_score {
            self.best_score = other.best_score;
            self.best_offset = other.best_offset;
        }
        self.second_moment += other.second_moment;
        self.first_moment += other.first_moment;
        self.weight += other.weight;
    }
}

/// Brute-force NDT scan matcher.
///
/// Holds the grid built by the last [`ScanMatcher::add_scans`] call; without
/// one every query scores 0 and matching returns the seed.
#[derive(Debug, Clone)]
pub struct NdtScanMatcher {
    config: NdtMatcherConfig,
    range_max: f64,
    grid: Option<NdtGrid>,
}

impl NdtScanMatcher {
    /// Create an empty matcher.
    pub fn new(config: NdtMatcherConfig) -> Self {
        Self {
            config,
            range_max: DEFAULT_RANGE_MAX,
            grid: None,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &NdtMatcherConfig {
        &self.config
    }

    /// Grid built by the last `add_scans`, if any.
    pub fn grid(&self) -> Option<&NdtGrid> {
        self.grid.as_ref()
    }

    /// Evenly strided subset of at most `count` points.
    ///
    /// Point `i` of the result is `points[i * len / n]`.
    pub fn subsample(points: &[Point2D], count: usize) -> Vec<Point2D> {
        let len = points.len();
        let n = count.min(len);
        (0..n).map(|i| points[i * len / n]).collect()
    }

    fn search_offsets(size: f64, res: f64, steps: usize) -> Vec<f64> {
        (0..steps).map(|k| -size + k as f64 * res).collect()
    }

    /// Score every (dx, dy) at one theta offset.
    fn evaluate_slice(
        grid: &NdtGrid,
        points: &[Point2D],
        seed: &Pose2D,
        dtheta: f64,
        linear_offsets: &[f64],
    ) -> SliceResult {
        let (sin_t, cos_t) = (seed.theta + dtheta).sin_cos();
        let rotated: Vec<Point2D> = points
            .iter()
            .map(|p| {
                Point2D::new(
                    seed.x + p.x * cos_t - p.y * sin_t,
                    seed.y + p.x * sin_t + p.y * cos_t,
                )
            })
            .collect();

        let mut slice = SliceResult::new();
        for &dx in linear_offsets {
            for &dy in linear_offsets {
                let score: f64 = rotated
                    .iter()
                    .map(|p| grid.likelihood(&Point2D::new(p.x + dx, p.y + dy)))
                    .sum();
                if score <= 0.0 {
                    continue;
                }

                let offset = Vector3::new(dx, dy, dtheta);
                slice.second_moment += score * offset * offset.transpose();
                slice.first_moment += score * offset;
                slice.weight += score;

                if score > slice.best_score {
                    slice.best_score = score;
                    slice.best_offset = offset;
                }
            }
        }
        slice
    }
}

impl Default for NdtScanMatcher {
    fn default() -> Self {
        Self::new(NdtMatcherConfig::default())
    }
}

impl ScanMatcher for NdtScanMatcher {
    fn add_scans(&mut self, scans: &[Scan]) {
        if scans.is_empty() {
            self.reset();
            return;
        }

        let grid = NdtGrid::from_scans(self.config.ndt_config(), scans, self.range_max);
        log::debug!(
            "NDT grid rebuilt from {} scans: {}x{} cells, {} valid",
            scans.len(),
            grid.width_cells(),
            grid.height_cells(),
            grid.valid_cell_count()
        );
        self.grid = Some(grid);
    }

    fn score_scan(&self, scan: &Scan) -> f64 {
        self.score_points(&scan.points, &scan.pose)
    }

    fn score_scan_at(&self, scan: &Scan, pose: &Pose2D) -> f64 {
        self.score_points(&scan.points, pose)
    }

    fn score_points(&self, points: &[Point2D], pose: &Pose2D) -> f64 {
        match &self.grid {
            Some(grid) => grid.likelihood_points_at(points, pose),
            None => 0.0,
        }
    }

    fn match_scan(&self, scan: &Scan, seed: &Pose2D, scan_points_to_use: usize) -> ScanMatchResult {
        let grid = match &self.grid {
            Some(grid) if !grid.is_empty() => grid,
            _ => return ScanMatchResult::no_information(*seed),
        };

        let points = Self::subsample(&scan.points, scan_points_to_use);
        if points.is_empty() {
            return ScanMatchResult::no_information(*seed);
        }

        let config = &self.config;
        let theta_offsets =
            Self::search_offsets(config.angular_size, config.angular_res, config.angular_steps());
        let linear_offsets =
            Self::search_offsets(config.linear_size, config.linear_res, config.linear_steps());
        let candidates = theta_offsets.len() * linear_offsets.len() * linear_offsets.len();

        // Slices are collected in theta order either way, so the fold below
        // sees identical inputs and the parallel result matches bit for bit.
        let slices: Vec<SliceResult> = if config.use_parallel {
            theta_offsets
                .par_iter()
                .map(|&dtheta| Self::evaluate_slice(grid, &points, seed, dtheta, &linear_offsets))
                .collect()
        } else {
            theta_offsets
                .iter()
                .map(|&dtheta| Self::evaluate_slice(grid, &points, seed, dtheta, &linear_offsets))
                .collect()
        };

        let mut total = SliceResult::new();
        for slice in &slices {
            total.merge(slice);
        }

        if !(total.best_score > 0.0) || !(total.weight > 0.0) {
            let mut result = ScanMatchResult::no_information(*seed);
            result.candidates = candidates;
            return result;
        }

        let s = total.weight;
        let u = total.first_moment;
        let covariance = total.second_moment / s - (u * u.transpose()) / (s * s);

        let best = total.best_offset;
        let pose = seed.offset_by(&Pose2D {
            x: best.x,
            y: best.y,
            theta: best.z,
        });

        log::trace!(
            "NDT match: score {:.3} over {} candidates, offset ({:.3}, {:.3}, {:.4})",
            total.best_score,
            candidates,
            best.x,
            best.y,
            best.z
        );

        ScanMatchResult {
            pose,
            score: total.best_score,
            covariance: Covariance2D::from_matrix(&covariance),
            converged: true,
            candidates,
        }
    }

    fn reset(&mut self) {
        self.grid = None;
    }

    fn range_max(&self) -> f64 {
        self.range_max
    }

    fn set_range_max(&mut self, range_max: f64) {
        self.range_max = range_max;
    }
}
