//! NDT matcher configuration.

use serde::{Deserialize, Serialize};

use crate::algorithms::ndt::NdtConfig;
use crate::config::ConfigError;
use crate::core::math::search_steps;

/// Configuration for [`super::NdtScanMatcher`].
///
/// The search window is `[-size, size)` in each dimension, sampled at the
/// matching resolution, around the seed pose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NdtMatcherConfig {
    /// NDT cell size (meters).
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Angular search step (radians).
    #[serde(default = "default_angular_res")]
    pub angular_res: f64,

    /// Angular search half-width (radians).
    #[serde(default = "default_angular_size")]
    pub angular_size: f64,

    /// Linear search step (meters).
    #[serde(default = "default_linear_res")]
    pub linear_res: f64,

    /// Linear search half-width (meters).
    #[serde(default = "default_linear_size")]
    pub linear_size: f64,

    /// Samples required before a cell is scored.
    #[serde(default = "default_min_points_per_cell")]
    pub min_points_per_cell: usize,

    /// Relative eigenvalue floor for cell covariances.
    #[serde(default = "default_eigenvalue_ratio")]
    pub eigenvalue_ratio: f64,

    /// Absolute eigenvalue floor for cell covariances (m²).
    #[serde(default = "default_min_variance")]
    pub min_variance: f64,

    /// Evaluate theta slices on the rayon pool.
    #[serde(default)]
    pub use_parallel: bool,
}

fn default_resolution() -> f64 {
    0.25
}

fn default_angular_res() -> f64 {
    0.0025
}

fn default_angular_size() -> f64 {
    0.1
}

fn default_linear_res() -> f64 {
    0.005
}

fn default_linear_size() -> f64 {
    0.05
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

impl Default for NdtMatcherConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            angular_res: default_angular_res(),
            angular_size: default_angular_size(),
            linear_res: default_linear_res(),
            linear_size: default_linear_size(),
            min_points_per_cell: default_min_points_per_cell(),
            eigenvalue_ratio: default_eigenvalue_ratio(),
            min_variance: default_min_variance(),
            use_parallel: false,
        }
    }
}

impl NdtMatcherConfig {
    /// Coarser steps over the same window, for accurate odometry.
    pub fn fast() -> Self {
        Self {
            angular_res: 0.01,
            linear_res: 0.01,
            ..Default::default()
        }
    }

    /// Wider window with parallel search, for poor odometry or long gaps.
    pub fn thorough() -> Self {
        Self {
            angular_size: 0.2,
            linear_size: 0.15,
            linear_res: 0.01,
            use_parallel: true,
            ..Default::default()
        }
    }

    /// Grid configuration derived from the cell settings.
    pub fn ndt_config(&self) -> NdtConfig {
        NdtConfig {
            resolution: self.resolution,
            min_points_per_cell: self.min_points_per_cell,
            eigenvalue_ratio: self.eigenvalue_ratio,
            min_variance: self.min_variance,
        }
    }

    /// Number of theta offsets searched.
    #[inline]
    pub fn angular_steps(&self) -> usize {
        search_steps(self.angular_size, self.angular_res)
    }

    /// Number of x (and y) offsets searched.
    #[inline]
    pub fn linear_steps(&self) -> usize {
        search_steps(self.linear_size, self.linear_res)
    }

    /// Number of candidate poses evaluated per match.
    pub fn search_space_size(&self) -> usize {
        let linear = self.linear_steps();
        self.angular_steps() * linear * linear
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("matcher.resolution", self.resolution),
            ("matcher.angular_res", self.angular_res),
            ("matcher.angular_size", self.angular_size),
            ("matcher.linear_res", self.linear_res),
            ("matcher.linear_size", self.linear_size),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be > 0, got {value}")));
            }
        }

        if !(self.eigenvalue_ratio >= 0.0 && self.eigenvalue_ratio < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "matcher.eigenvalue_ratio must be in [0, 1), got {}",
                self.eigenvalue_ratio
            )));
        }

        if !(self.min_variance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "matcher.min_variance must be >= 0, got {}",
                self.min_variance
            )));
        }

        if self.eigenvalue_ratio == 0.0 && self.min_variance == 0.0 {
            return Err(ConfigError::Invalid(
                "matcher.eigenvalue_ratio and matcher.min_variance cannot both be 0".to_string(),
            ));
        }

        Ok(())
    }
}
