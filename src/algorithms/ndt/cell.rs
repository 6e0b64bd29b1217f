//! Single NDT cell: batch Gaussian statistics over the points it received.

use nalgebra::{Matrix2, Vector2};

use super::NdtConfig;
use crate::core::types::Point2D;

/// Floor the eigenvalues of a symmetric 2x2 covariance.
///
/// Every eigenvalue is clamped to `max(ratio * λ_max, min_variance)`, which
/// keeps directions with no observed spread (collinear or duplicate points)
/// from producing an unbounded Mahalanobis distance.
///
/// Returns `(regularized_covariance, inverse_covariance)` or `None` if the
/// input is not finite or every eigenvalue is zero with no absolute floor.
pub fn regularize_covariance(
    cov: &Matrix2<f64>,
    ratio: f64,
    min_variance: f64,
) -> Option<(Matrix2<f64>, Matrix2<f64>)> {
    if cov.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let eigen = cov.symmetric_eigen();
    let mut eigenvalues = eigen.eigenvalues;

    let max_eigenvalue = eigenvalues.iter().copied().fold(0.0_f64, f64::max);
    let floor = (max_eigenvalue * ratio).max(min_variance);
    if floor <= 0.0 {
        return None;
    }

    for ev in eigenvalues.iter_mut() {
        if *ev < floor {
            *ev = floor;
        }
    }

    // V * D * V^T and V * D^-1 * V^T
    let v = &eigen.eigenvectors;
    let regularized = v * Matrix2::from_diagonal(&eigenvalues) * v.transpose();
    let inv_eigenvalues = Vector2::new(1.0 / eigenvalues[0], 1.0 / eigenvalues[1]);
    let inverse = v * Matrix2::from_diagonal(&inv_eigenvalues) * v.transpose();

    Some((regularized, inverse))
}

/// One grid element of the NDT map.
///
/// Points are only recorded by [`Cell::add_point`]; mean and covariance are
/// derived in [`Cell::compute`] and never updated incrementally.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    points: Vec<Point2D>,
    mean: Vector2<f64>,
    covariance: Matrix2<f64>,
    regularized: Matrix2<f64>,
    information: Matrix2<f64>,
    valid: bool,
}

impl Cell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a map-frame point. Statistics are untouched until `compute()`.
    #[inline]
    pub fn add_point(&mut self, point: Point2D) {
        self.points.push(point);
    }

    /// Number of accumulated points.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Whether the cell has enough samples to be scored.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Population mean of the accumulated points.
    pub fn mean(&self) -> Point2D {
        Point2D::new(self.mean.x, self.mean.y)
    }

    /// Raw population covariance (divide by N).
    pub fn covariance(&self) -> &Matrix2<f64> {
        &self.covariance
    }

    /// Covariance after eigenvalue flooring, as used by [`Cell::score`].
    pub fn regularized_covariance(&self) -> &Matrix2<f64> {
        &self.regularized
    }

    /// Compute mean, covariance and the regularized inverse.
    ///
    /// Cells with fewer than `config.min_points()` samples are marked invalid.
    pub fn compute(&mut self, config: &NdtConfig) {
        self.valid = false;

        let n = self.points.len();
        if n == 0 {
            self.mean = Vector2::zeros();
            self.covariance = Matrix2::zeros();
            return;
        }

        let inv_n = 1.0 / n as f64;
        let sum = self
            .points
            .iter()
            .fold(Vector2::zeros(), |acc: Vector2<f64>, p| acc + Vector2::new(p.x, p.y));
        self.mean = sum * inv_n;

        let mut cov = Matrix2::zeros();
        for p in &self.points {
            let d = Vector2::new(p.x, p.y) - self.mean;
            cov += d * d.transpose();
        }
        self.covariance = cov * inv_n;

        if n < config.min_points() {
            return;
        }

        if let Some((regularized, information)) = regularize_covariance(
            &self.covariance,
            config.eigenvalue_ratio,
            config.min_variance,
        ) {
            self.regularized = regularized;
            self.information = information;
            self.valid = true;
        }
    }

    /// Unnormalized Gaussian score `exp(-0.5 dᵀ Σ⁻¹ d)` in (0, 1].
    ///
    /// Exactly 1 at the mean, 0 for an invalid cell.
    #[inline]
    pub fn score(&self, point: &Point2D) -> f64 {
        if !self.valid {
            return 0.0;
        }
        let d = Vector2::new(point.x - self.mean.x, point.y - self.mean.y);
        let exponent = -0.5 * d.dot(&(self.information * d));
        exponent.exp()
    }

    /// Drop all points and derived statistics.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
