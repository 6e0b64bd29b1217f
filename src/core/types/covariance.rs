//! Pose uncertainty.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// 3x3 covariance matrix for (x, y, theta) pose uncertainty.
///
/// Stored in row-major order:
/// ```text
/// | xx  xy  xt |
/// | yx  yy  yt |
/// | tx  ty  tt |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance2D {
    /// Row-major 3x3 matrix data
    data: [f64; 9],
}

impl Covariance2D {
    /// Create a zero covariance matrix.
    #[inline]
    pub fn zero() -> Self {
        Self { data: [0.0; 9] }
    }

    /// Create a diagonal covariance matrix.
    ///
    /// Parameters are variances: xx = σ²_x, yy = σ²_y, tt = σ²_θ
    #[inline]
    pub fn diagonal(xx: f64, yy: f64, tt: f64) -> Self {
        Self {
            data: [xx, 0.0, 0.0, 0.0, yy, 0.0, 0.0, 0.0, tt],
        }
    }

    /// Create from row-major array.
    #[inline]
    pub fn from_array(data: [f64; 9]) -> Self {
        Self { data }
    }

    /// Create from a nalgebra matrix.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        let mut data = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                data[r * 3 + c] = m[(r, c)];
            }
        }
        Self { data }
    }

    /// Convert to a nalgebra matrix.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.data)
    }

    /// Element at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * 3 + col]
    }

    /// Variance of x (element [0,0]).
    #[inline]
    pub fn var_x(&self) -> f64 {
        self.data[0]
    }

    /// Variance of y (element [1,1]).
    #[inline]
    pub fn var_y(&self) -> f64 {
        self.data[4]
    }

    /// Variance of theta (element [2,2]).
    #[inline]
    pub fn var_theta(&self) -> f64 {
        self.data[8]
    }

    /// Trace of the translational block.
    #[inline]
    pub fn position_trace(&self) -> f64 {
        self.data[0] + self.data[4]
    }

    /// Get raw data as slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64; 9] {
        &self.data
    }

    /// Matrix inverse, or `None` when singular or non-finite.
    pub fn try_inverse(&self) -> Option<Covariance2D> {
        if self.data.iter().any(|v| !v.is_finite()) {
            return None;
        }
        self.to_matrix()
            .try_inverse()
            .filter(|inv| inv.iter().all(|v| v.is_finite()))
            .map(|inv| Self::from_matrix(&inv))
    }
}

impl Default for Covariance2D {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_covariance2d_diagonal() {
        let zero = Covariance2D::zero();
        assert_eq!(zero.var_theta(), 0.0);

        let diag = Covariance2D::diagonal(0.1, 0.2, 0.05);
        assert_eq!(diag.var_x(), 0.1);
        assert_eq!(diag.var_y(), 0.2);
        assert_eq!(diag.var_theta(), 0.05);
        assert_relative_eq!(diag.position_trace(), 0.3);
    }

    #[test]
    fn test_try_inverse() {
        let diag = Covariance2D::diagonal(0.5, 0.25, 0.1);
        let inv = diag.try_inverse().unwrap();
        assert_relative_eq!(inv.get(0, 0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(inv.get(1, 1), 4.0, epsilon = 1e-12);
        assert_relative_eq!(inv.get(2, 2), 10.0, epsilon = 1e-12);
        assert_relative_eq!(inv.get(0, 1), 0.0, epsilon = 1e-12);

        assert!(Covariance2D::zero().try_inverse().is_none());
        assert!(Covariance2D::diagonal(f64::INFINITY, 1.0, 1.0).try_inverse().is_none());
    }

    #[test]
    fn test_matrix_roundtrip() {
        let cov = Covariance2D::from_array([1.0, 0.2, 0.0, 0.2, 2.0, 0.1, 0.0, 0.1, 3.0]);
        let back = Covariance2D::from_matrix(&cov.to_matrix());
        assert_eq!(cov, back);
        assert_eq!(cov.get(1, 2), 0.1);
    }
}
