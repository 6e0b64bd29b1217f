//! Scan matching against the accumulated NDT map.
//!
//! The matcher owns an [`NdtGrid`](crate::algorithms::ndt::NdtGrid) built
//! from recent scans and finds the pose that maximizes the summed likelihood
//! of a new scan with an exhaustive search around a seed pose.
//!
//! # Example
//!
//! ```
//! use ndt_slam::algorithms::matching::{NdtMatcherConfig, NdtScanMatcher, ScanMatcher};
//! use ndt_slam::core::types::{Point2D, Pose2D, Scan};
//!
//! let mut matcher = NdtScanMatcher::new(NdtMatcherConfig::default());
//! let scan = Scan::new(0, Pose2D::identity(), vec![Point2D::new(1.0, 0.0)]);
//!
//! // Nothing ingested yet: the seed comes back with zero confidence
//! let result = matcher.match_scan(&scan, &Pose2D::identity(), 100);
//! assert!(!result.converged);
//! assert_eq!(result.score, 0.0);
//!
//! matcher.add_scans(&[scan]);
//! ```

mod config;
mod ndt_matcher;

pub use config::NdtMatcherConfig;
pub use ndt_matcher::{DEFAULT_RANGE_MAX, NdtScanMatcher};

use crate::core::types::{Covariance2D, Point2D, Pose2D, Scan};

/// Variance reported on every axis when a match carries no information.
pub const MAX_VARIANCE: f64 = 1e9;

/// Result of a scan matching operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMatchResult {
    /// Best map-frame pose found.
    pub pose: Pose2D,

    /// Summed likelihood at `pose` (0 when nothing matched).
    pub score: f64,

    /// Weighted covariance of the search offsets around `pose`.
    pub covariance: Covariance2D,

    /// Whether any candidate scored above zero.
    pub converged: bool,

    /// Number of candidate poses evaluated.
    pub candidates: usize,
}

impl ScanMatchResult {
    /// Zero-confidence result that keeps the seed pose.
    pub fn no_information(seed: Pose2D) -> Self {
        Self {
            pose: seed,
            score: 0.0,
            covariance: Covariance2D::diagonal(MAX_VARIANCE, MAX_VARIANCE, MAX_VARIANCE),
            converged: false,
            candidates: 0,
        }
    }
}

/// Matcher that scores scans against an internally held map.
///
/// Implementations are rebuilt wholesale by [`ScanMatcher::add_scans`] and
/// are read-only while matching, so a populated matcher can be shared
/// across threads.
pub trait ScanMatcher: Send + Sync {
    /// Rebuild the map from `scans` at their own poses.
    ///
    /// An empty slice resets the matcher.
    fn add_scans(&mut self, scans: &[Scan]);

    /// Summed likelihood of `scan` at its own pose.
    fn score_scan(&self, scan: &Scan) -> f64;

    /// Summed likelihood of `scan` placed at `pose`.
    fn score_scan_at(&self, scan: &Scan, pose: &Pose2D) -> f64;

    /// Summed likelihood of sensor-frame `points` placed at `pose`.
    fn score_points(&self, points: &[Point2D], pose: &Pose2D) -> f64;

    /// Search for the pose of `scan` around `seed`.
    ///
    /// At most `scan_points_to_use` evenly strided points are scored.
    fn match_scan(&self, scan: &Scan, seed: &Pose2D, scan_points_to_use: usize) -> ScanMatchResult;

    /// Drop the map.
    fn reset(&mut self);

    /// Sensor range used to pad the map bounds.
    fn range_max(&self) -> f64;

    /// Set the sensor range.
    fn set_range_max(&mut self, range_max: f64);
}
