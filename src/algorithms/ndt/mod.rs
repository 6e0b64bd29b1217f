//! Normal Distributions Transform map model.
//!
//! The map is a dense grid of [`Cell`]s. Each cell collects the map-frame
//! points that fall inside it and, after an explicit `compute()`, represents
//! them as a 2D Gaussian. Query points are scored against the Gaussian of
//! the cell they land in:
//!
//! ```text
//! score(p) = exp(-0.5 · (p - μ)ᵀ Σ⁻¹ (p - μ))      ∈ (0, 1]
//! ```
//!
//! Summing scores over a transformed scan gives the matching objective used
//! by [`crate::algorithms::matching::NdtScanMatcher`].

mod cell;
mod grid;

pub use cell::{Cell, regularize_covariance};
pub use grid::NdtGrid;

use serde::{Deserialize, Serialize};

/// Configuration shared by every cell of an [`NdtGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NdtConfig {
    /// Cell edge length in meters.
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Samples required before a cell is scored.
    ///
    /// Values below 2 are treated as 2: a covariance needs two samples.
    #[serde(default = "default_min_points_per_cell")]
    pub min_points_per_cell: usize,

    /// Minor eigenvalues are floored to this fraction of the major one.
    #[serde(default = "default_eigenvalue_ratio")]
    pub eigenvalue_ratio: f64,

    /// Absolute eigenvalue floor in m², covers cells of duplicate points.
    #[serde(default = "default_min_variance")]
    pub min_variance: f64,
}

fn default_resolution() -> f64 {
    0.25
}

fn default_min_points_per_cell() -> usize {
    3
}

fn default_eigenvalue_ratio() -> f64 {
    1e-3
}

fn default_min_variance() -> f64 {
    1e-6
}

impl Default for NdtConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            min_points_per_cell: default_min_points_per_cell(),
            eigenvalue_ratio: default_eigenvalue_ratio(),
            min_variance: default_min_variance(),
        }
    }
}

impl NdtConfig {
    /// Config with the given resolution and default cell statistics.
    pub fn with_resolution(resolution: f64) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    /// Effective minimum sample count (at least 2).
    #[inline]
    pub fn min_points(&self) -> usize {
        self.min_points_per_cell.max(2)
    }
}
