//! Incremental NDT mapper.
//!
//! Each accepted sweep is matched against an NDT built from the most recent
//! scans, appended to the graph at its corrected pose and linked to its
//! predecessor by an odometry constraint.

use serde::{Deserialize, Serialize};

use crate::algorithms::matching::{NdtScanMatcher, ScanMatchResult, ScanMatcher};
use crate::config::ConfigError;
use crate::core::math::angle_diff;
use crate::core::types::{LaserScan, Pose2D, Scan};
use crate::engine::graph::{Constraint, Graph};
use crate::sensors::preprocessing::ScanConverter;

/// Configuration for the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Minimum odometry translation between accepted scans (meters).
    #[serde(default = "default_minimum_travel_distance")]
    pub minimum_travel_distance: f64,

    /// Minimum odometry rotation between accepted scans (radians).
    #[serde(default = "default_minimum_travel_rotation")]
    pub minimum_travel_rotation: f64,

    /// Number of most recent scans the matcher map is built from.
    #[serde(default = "default_rolling_depth")]
    pub rolling_depth: usize,

    /// Maximum number of points scored per candidate pose.
    #[serde(default = "default_scan_points_to_use")]
    pub scan_points_to_use: usize,

    /// Matches scoring at or below this keep the odometry seed.
    #[serde(default)]
    pub min_match_score: f64,

    /// Use scan centroids for nearest-scan queries.
    #[serde(default)]
    pub use_barycenter: bool,
}

fn default_minimum_travel_distance() -> f64 {
    0.1
}

fn default_minimum_travel_rotation() -> f64 {
    1.0
}

fn default_rolling_depth() -> usize {
    10
}

fn default_scan_points_to_use() -> usize {
    100
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            minimum_travel_distance: default_minimum_travel_distance(),
            minimum_travel_rotation: default_minimum_travel_rotation(),
            rolling_depth: default_rolling_depth(),
            scan_points_to_use: default_scan_points_to_use(),
            min_match_score: 0.0,
            use_barycenter: false,
        }
    }
}

impl MapperConfig {
    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.minimum_travel_distance >= 0.0) {
            return Err(ConfigError::Invalid(
                "mapper.minimum_travel_distance must be >= 0".into(),
            ));
        }
        if !(self.minimum_travel_rotation >= 0.0) {
            return Err(ConfigError::Invalid(
                "mapper.minimum_travel_rotation must be >= 0".into(),
            ));
        }
        if self.rolling_depth == 0 {
            return Err(ConfigError::Invalid("mapper.rolling_depth must be > 0".into()));
        }
        if self.scan_points_to_use == 0 {
            return Err(ConfigError::Invalid(
                "mapper.scan_points_to_use must be > 0".into(),
            ));
        }
        if !self.min_match_score.is_finite() {
            return Err(ConfigError::Invalid(
                "mapper.min_match_score must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of an accepted sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperUpdate {
    /// Graph index of the new scan.
    pub scan_id: usize,
    /// Odometry pose the sweep was taken at.
    pub odom_pose: Pose2D,
    /// Map-frame pose stored in the graph.
    pub corrected_pose: Pose2D,
    /// Match against the rolling map; `None` for the first scan.
    pub match_result: Option<ScanMatchResult>,
}

impl MapperUpdate {
    /// Whether the corrected pose came from scan matching.
    pub fn matched(&self) -> bool {
        self.match_result
            .as_ref()
            .is_some_and(|m| m.converged && m.pose == self.corrected_pose)
    }
}

/// Online mapper that turns odometry and sweeps into a scan graph.
pub struct Mapper<M: ScanMatcher = NdtScanMatcher> {
    config: MapperConfig,
    matcher: M,
    graph: Graph,
    odom_poses: Vec<Pose2D>,
}

impl<M: ScanMatcher> Mapper<M> {
    /// Create a mapper with an empty graph.
    pub fn new(config: MapperConfig, matcher: M) -> Self {
        let graph = Graph::new(config.use_barycenter);
        Self {
            config,
            matcher,
            graph,
            odom_poses: Vec::new(),
        }
    }

    /// Resume from a previously built graph.
    ///
    /// Odometry history is unknown for loaded scans, so each scan's corrected
    /// pose stands in for it. The next sweep's odometry delta is therefore
    /// measured from the last corrected pose.
    pub fn from_graph(config: MapperConfig, matcher: M, mut graph: Graph) -> Self {
        graph.set_use_barycenter(config.use_barycenter);
        let odom_poses = graph.scans().iter().map(|s| s.pose).collect();
        Self {
            config,
            matcher,
            graph,
            odom_poses,
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Consume the mapper, keeping its graph.
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn scans(&self) -> &[Scan] {
        self.graph.scans()
    }

    pub fn odom_poses(&self) -> &[Pose2D] {
        &self.odom_poses
    }

    /// Number of accepted scans.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Check if no scan has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Transform from the odometry frame to the map frame.
    ///
    /// `corrected ∘ odom⁻¹` of the latest accepted scan; `None` before the
    /// first one.
    pub fn map_to_odom(&self) -> Option<Pose2D> {
        let corrected = self.graph.last_scan()?.pose;
        let odom = self.odom_poses.last()?;
        Some(corrected.compose(&odom.inverse()))
    }

    /// Drop all scans and the matcher's map.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.odom_poses.clear();
        self.matcher.reset();
    }

    /// Seed pose for a sweep at `odom_pose`, or `None` when the robot has
    /// not moved far enough since the last accepted scan.
    fn predict(&self, odom_pose: &Pose2D) -> Option<Pose2D> {
        let (Some(last_odom), Some(last_scan)) = (self.odom_poses.last(), self.graph.last_scan())
        else {
            return Some(Pose2D::identity());
        };
        let last_corrected = last_scan.pose;

        let dx = odom_pose.x - last_odom.x;
        let dy = odom_pose.y - last_odom.y;
        let dtheta = angle_diff(last_odom.theta, odom_pose.theta);

        let min_dist = self.config.minimum_travel_distance;
        if dx * dx + dy * dy < min_dist * min_dist
            && dtheta.abs() < self.config.minimum_travel_rotation
        {
            return None;
        }

        // Odometry and map frames may have drifted apart in heading
        let heading = angle_diff(last_odom.theta, last_corrected.theta);
        let (sin_h, cos_h) = heading.sin_cos();
        Some(Pose2D::new(
            last_corrected.x + dx * cos_h - dy * sin_h,
            last_corrected.y + dx * sin_h + dy * cos_h,
            last_corrected.theta + dtheta,
        ))
    }

    /// Feed one sweep taken at `odom_pose`.
    ///
    /// Returns `None` when the sweep is dropped by travel gating.
    pub fn process(&mut self, odom_pose: &Pose2D, laser: &LaserScan) -> Option<MapperUpdate> {
        let seed = self.predict(odom_pose)?;

        let range_max = laser.range_max.min(self.matcher.range_max());
        let points = ScanConverter::to_points(laser, range_max);
        let scan_id = self.graph.len();
        let mut scan = Scan::new(scan_id, seed, points);

        let match_result = if self.graph.is_empty() {
            None
        } else {
            let scans = self.graph.scans();
            let start = scans.len().saturating_sub(self.config.rolling_depth);
            self.matcher.add_scans(&scans[start..]);

            let result = self
                .matcher
                .match_scan(&scan, &seed, self.config.scan_points_to_use);
            log::debug!(
                "Scan {} matched: score={:.3} converged={} dx={:.3} dy={:.3} dθ={:.4}",
                scan_id,
                result.score,
                result.converged,
                result.pose.x - seed.x,
                result.pose.y - seed.y,
                angle_diff(seed.theta, result.pose.theta)
            );
            if result.converged && result.score > self.config.min_match_score {
                scan.set_pose(result.pose);
            }
            Some(result)
        };

        let covariance = match_result
            .as_ref()
            .filter(|m| m.converged)
            .map(|m| m.covariance);
        let constraint = self
            .graph
            .last_scan()
            .map(|prev| Constraint::between(prev, &scan, covariance.as_ref()));

        let corrected_pose = scan.pose;
        let point_count = scan.len();
        if let Err(e) = self.graph.add_scan(scan) {
            log::error!("Failed to add scan {}: {}", scan_id, e);
            return None;
        }
        self.odom_poses.push(*odom_pose);
        if let Some(constraint) = constraint {
            if let Err(e) = self.graph.add_odom_constraint(constraint) {
                log::warn!("Dropped odometry constraint for scan {}: {}", scan_id, e);
            }
        }

        log::debug!(
            "Added scan {} with {} points at ({:.3}, {:.3}, {:.3})",
            scan_id,
            point_count,
            corrected_pose.x,
            corrected_pose.y,
            corrected_pose.theta
        );

        Some(MapperUpdate {
            scan_id,
            odom_pose: *odom_pose,
            corrected_pose,
            match_result,
        })
    }
}

impl Default for Mapper<NdtScanMatcher> {
    fn default() -> Self {
        Self::new(MapperConfig::default(), NdtScanMatcher::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::matching::NdtMatcherConfig;
    use crate::sensors::simulated::RectangleRoom;
    use approx::assert_relative_eq;

    fn mapper() -> Mapper {
        let mut matcher = NdtScanMatcher::new(NdtMatcherConfig::default());
        matcher.set_range_max(5.0);
        Mapper::new(MapperConfig::default(), matcher)
    }

    fn sweep(pose: &Pose2D) -> LaserScan {
        RectangleRoom::default().scan(pose, 360, 5.0)
    }

    #[test]
    fn test_first_scan_at_origin() {
        let mut mapper = mapper();
        let odom = Pose2D::new(3.0, -1.0, 0.7);

        let update = mapper.process(&odom, &sweep(&Pose2D::identity())).unwrap();

        assert_eq!(update.scan_id, 0);
        assert_eq!(update.corrected_pose, Pose2D::identity());
        assert!(update.match_result.is_none());
        assert!(mapper.graph().odom_constraints().is_empty());
        assert_eq!(mapper.odom_poses(), &[odom]);
        assert!(!mapper.scans()[0].is_empty());
    }

    #[test]
    fn test_travel_gating() {
        let mut mapper = mapper();
        let laser = sweep(&Pose2D::identity());
        mapper.process(&Pose2D::identity(), &laser).unwrap();

        assert!(mapper.process(&Pose2D::new(0.05, 0.05, 0.5), &laser).is_none());
        assert_eq!(mapper.len(), 1);

        // Either threshold alone is enough to accept
        assert!(mapper.process(&Pose2D::new(0.0, 0.0, 1.2), &laser).is_some());
        assert!(mapper.process(&Pose2D::new(0.11, 0.0, 1.2), &laser).is_some());
        assert_eq!(mapper.len(), 3);
    }

    #[test]
    fn test_odometry_chain() {
        let mut mapper = mapper();
        for i in 0..4 {
            let pose = Pose2D::new(i as f64 * 0.15, 0.0, 0.0);
            mapper.process(&pose, &sweep(&pose)).unwrap();
        }

        let chain: Vec<_> = mapper
            .graph()
            .odom_constraints()
            .iter()
            .map(|c| (c.begin, c.end))
            .collect();
        assert_eq!(chain, vec![(0, 1), (1, 2), (2, 3)]);
        assert!(mapper.graph().loop_constraints().is_empty());
    }

    #[test]
    fn test_matching_tracks_true_motion() {
        let mut mapper = mapper();
        for i in 0..4 {
            let pose = Pose2D::new(i as f64 * 0.15, 0.05 * i as f64, 0.0);
            let update = mapper.process(&pose, &sweep(&pose)).unwrap();
            // Odometry starts at the origin, so map and odometry frames agree
            assert_relative_eq!(update.corrected_pose.x, pose.x, epsilon = 0.03);
            assert_relative_eq!(update.corrected_pose.y, pose.y, epsilon = 0.03);
            assert_relative_eq!(update.corrected_pose.theta, pose.theta, epsilon = 0.02);
            if i > 0 {
                assert!(update.match_result.unwrap().converged);
            }
        }
        let c = &mapper.graph().odom_constraints()[0];
        assert!(c.information.is_some());
    }

    #[test]
    fn test_seed_follows_heading_offset() {
        let mut mapper = mapper();
        // Odometry frame is rotated a quarter turn against the map frame
        let odom0 = Pose2D::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        mapper.process(&odom0, &LaserScan::new(0.0, 0.1, 0.05, 5.0, Vec::new()));

        let seed = mapper.predict(&Pose2D::new(0.0, 0.5, std::f64::consts::FRAC_PI_2));

        // Forward in odometry is +y; forward in the map is +x
        let seed = seed.unwrap();
        assert_relative_eq!(seed.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(seed.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(seed.theta, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_map_to_odom() {
        let mut mapper = mapper();
        assert!(mapper.map_to_odom().is_none());

        let odom = Pose2D::new(1.0, 2.0, 0.5);
        mapper.process(&odom, &sweep(&Pose2D::identity()));

        let t = mapper.map_to_odom().unwrap();
        let mapped = t.compose(&odom);
        assert_relative_eq!(mapped.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(mapped.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(mapped.theta, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_and_resume() {
        let mut mapper = mapper();
        for i in 0..3 {
            let pose = Pose2D::new(i as f64 * 0.2, 0.0, 0.0);
            mapper.process(&pose, &sweep(&pose));
        }
        let graph = mapper.graph().clone();

        mapper.reset();
        assert!(mapper.is_empty());
        assert!(mapper.odom_poses().is_empty());
        assert!(mapper.matcher().grid().is_none());

        let mut resumed = Mapper::from_graph(MapperConfig::default(), NdtScanMatcher::default(), graph);
        assert_eq!(resumed.len(), 3);
        assert_eq!(resumed.odom_poses().len(), 3);

        let last = resumed.scans()[2].pose;
        let next = Pose2D::new(last.x + 0.2, last.y, last.theta);
        let update = resumed.process(&next, &sweep(&next)).unwrap();
        assert_eq!(update.scan_id, 3);
        assert_eq!(resumed.graph().odom_constraints().len(), 3);
    }

    #[test]
    fn test_config_validation() {
        assert!(MapperConfig::default().validate().is_ok());
        let config = MapperConfig {
            rolling_depth: 0,
            ..MapperConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
