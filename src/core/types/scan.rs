//! LiDAR scan types.
//!
//! [`LaserScan`] is the raw polar sweep as delivered by the sensor, [`Scan`]
//! is the projected point cloud that the mapper keeps in its history.

use serde::{Deserialize, Serialize};

use super::pose::{Point2D, Pose2D};

/// Raw LiDAR scan in polar coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Start angle in radians
    pub angle_min: f64,
    /// Angular resolution (radians between consecutive readings)
    pub angle_increment: f64,
    /// Minimum valid range in meters
    pub range_min: f64,
    /// Maximum valid range in meters
    pub range_max: f64,
    /// Range measurements in meters (NaN = no return)
    pub ranges: Vec<f64>,
}

impl LaserScan {
    /// Create a new laser scan with the given parameters.
    pub fn new(
        angle_min: f64,
        angle_increment: f64,
        range_min: f64,
        range_max: f64,
        ranges: Vec<f64>,
    ) -> Self {
        Self {
            angle_min,
            angle_increment,
            range_min,
            range_max,
            ranges,
        }
    }

    /// Number of range measurements.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if scan is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Angle of the reading at `index`.
    #[inline]
    pub fn angle_at(&self, index: usize) -> f64 {
        self.angle_min + index as f64 * self.angle_increment
    }

    /// Iterate over (angle, range) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .map(move |(i, &range)| (self.angle_at(i), range))
    }
}

/// One sensor sweep projected to points, plus the pose it was captured at.
///
/// `points` stay in the sensor frame; `pose` is the corrected map-frame pose
/// and is the only field that changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    /// Position in acquisition order, doubles as graph index
    pub id: usize,
    /// Corrected map-frame pose
    pub pose: Pose2D,
    /// Points in the sensor frame
    pub points: Vec<Point2D>,
}

impl Scan {
    /// Create a new scan.
    pub fn new(id: usize, pose: Pose2D, points: Vec<Point2D>) -> Self {
        Self { id, pose, points }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the scan has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Replace the corrected pose.
    pub fn set_pose(&mut self, pose: Pose2D) {
        self.pose = pose;
    }

    /// Points transformed into the map frame by the scan's pose.
    pub fn map_points(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.points.iter().map(|p| self.pose.transform_point(p))
    }

    /// Pose translated to the centroid of the map-frame points.
    ///
    /// Heading is kept from `pose`. An empty scan returns `pose` unchanged.
    pub fn barycenter_pose(&self) -> Pose2D {
        if self.points.is_empty() {
            return self.pose;
        }
        let (sin_t, cos_t) = self.pose.theta.sin_cos();
        let (sx, sy) = self.points.iter().fold((0.0, 0.0), |(sx, sy), p| {
            (sx + cos_t * p.x - sin_t * p.y, sy + sin_t * p.x + cos_t * p.y)
        });
        let n = self.points.len() as f64;
        Pose2D {
            x: self.pose.x + sx / n,
            y: self.pose.y + sy / n,
            theta: self.pose.theta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_laser_scan_angles() {
        let scan = LaserScan::new(-FRAC_PI_2, 0.5, 0.1, 10.0, vec![1.0, 2.0, 3.0]);
        assert_eq!(scan.len(), 3);
        assert_relative_eq!(scan.angle_at(2), -FRAC_PI_2 + 1.0);

        let pairs: Vec<_> = scan.iter().collect();
        assert_relative_eq!(pairs[1].0, -FRAC_PI_2 + 0.5);
        assert_relative_eq!(pairs[1].1, 2.0);
    }

    #[test]
    fn test_barycenter_pose() {
        let scan = Scan::new(
            0,
            Pose2D::new(1.0, 0.0, FRAC_PI_2),
            vec![Point2D::new(1.0, 0.0), Point2D::new(3.0, 0.0)],
        );
        // Points land at (1, 1) and (1, 3) in the map frame
        let bary = scan.barycenter_pose();
        assert_relative_eq!(bary.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(bary.y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(bary.theta, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_barycenter_of_empty_scan_is_pose() {
        let pose = Pose2D::new(2.0, -1.0, 0.3);
        let scan = Scan::new(4, pose, Vec::new());
        assert_eq!(scan.barycenter_pose(), pose);
        assert!(scan.is_empty());
    }
}
