//! Scan conversion from polar readings to Cartesian points.

use crate::core::types::{LaserScan, Point2D};

/// Scan converter for polar-Cartesian transformations.
pub struct ScanConverter;

impl ScanConverter {
    /// Project every usable reading to a sensor-frame point.
    ///
    /// Reading `i` lies at `angle_min + i * angle_increment`. NaN, infinite
    /// and non-positive ranges are dropped, as are ranges below the scan's
    /// `range_min` or above `range_max`.
    ///
    /// ```text
    /// x = range * cos(angle)
    /// y = range * sin(angle)
    /// ```
    pub fn to_points(scan: &LaserScan, range_max: f64) -> Vec<Point2D> {
        scan.iter()
            .filter(|&(_, range)| Self::is_usable(range, scan.range_min, range_max))
            .map(|(angle, range)| {
                let (sin_a, cos_a) = angle.sin_cos();
                Point2D::new(range * cos_a, range * sin_a)
            })
            .collect()
    }

    #[inline]
    fn is_usable(range: f64, range_min: f64, range_max: f64) -> bool {
        range.is_finite() && range > 0.0 && range >= range_min && range <= range_max
    }
}
