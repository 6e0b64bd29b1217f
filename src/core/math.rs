//! Mathematical primitives for 2D SLAM operations.
//!
//! Functions for angle normalization, angular arithmetic and lattice sizing.

use std::f64::consts::PI;

/// Normalize angle to (-π, π].
///
/// # Example
/// ```
/// use ndt_slam::core::math::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-9);
/// assert!((normalize_angle(-PI) - PI).abs() < 1e-9);
/// ```
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest angular difference from angle `a` to angle `b`.
///
/// Returns the signed angle you need to add to `a` to reach `b`,
/// taking the shortest path around the circle.
///
/// # Example
/// ```
/// use ndt_slam::core::math::angle_diff;
/// use std::f64::consts::PI;
///
/// // Crossing the ±π boundary takes the short way
/// let diff = angle_diff(PI - 0.1, -PI + 0.1);
/// assert!((diff - 0.2).abs() < 1e-9);
/// ```
#[inline]
pub fn angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(b - a)
}

/// Number of `step`-sized intervals needed to cover `extent`.
///
/// Ratios within floating point noise of an integer are not rounded up, so
/// 4.0 at 0.05 gives 80, not 81. Non-positive or non-finite inputs give 0.
#[inline]
pub fn steps_covering(extent: f64, step: f64) -> usize {
    if !(extent > 0.0 && extent.is_finite()) || !(step > 0.0) {
        return 0;
    }
    let n = extent / step;
    let rounded = n.round();
    if (n - rounded).abs() < 1e-9 * n.max(1.0) {
        rounded as usize
    } else {
        n.ceil() as usize
    }
}

/// Number of discrete search offsets `-size + k * step` that stay below `+size`.
///
/// A window of 0.1 at 0.0025 yields exactly 80 offsets.
#[inline]
pub fn search_steps(size: f64, step: f64) -> usize {
    steps_covering(2.0 * size, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_angle_zero() {
        assert_relative_eq!(normalize_angle(0.0), 0.0);
    }

    #[test]
    fn test_normalize_angle_pi_boundary() {
        assert_relative_eq!(normalize_angle(PI), PI);
        // -π maps onto the closed end of the interval
        assert_relative_eq!(normalize_angle(-PI), PI);
    }

    #[test]
    fn test_normalize_angle_wrap() {
        assert_relative_eq!(normalize_angle(2.0 * PI), 0.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-2.0 * PI), 0.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-3.0 * PI), PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(100.0 * PI), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_angle_diff_crossing_pi() {
        assert_relative_eq!(angle_diff(0.0, PI / 2.0), PI / 2.0);
        assert_relative_eq!(angle_diff(PI / 2.0, 0.0), -PI / 2.0);
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_search_steps() {
        assert_eq!(search_steps(0.1, 0.0025), 80);
        assert_eq!(search_steps(0.05, 0.005), 20);
        assert_eq!(search_steps(0.05, 0.03), 4);
        assert_eq!(search_steps(0.0, 0.01), 0);
        assert_eq!(search_steps(0.1, 0.0), 0);
    }

    #[test]
    fn test_steps_covering() {
        assert_eq!(steps_covering(4.0, 0.05), 80);
        assert_eq!(steps_covering(10.0, 1.0), 10);
        assert_eq!(steps_covering(10.2, 1.0), 11);
        assert_eq!(steps_covering(0.0, 0.05), 0);
        assert_eq!(steps_covering(-1.0, 0.05), 0);
        assert_eq!(steps_covering(f64::INFINITY, 0.05), 0);
        assert_eq!(steps_covering(f64::NAN, 0.05), 0);
        assert_eq!(steps_covering(1.0, f64::INFINITY), 0);
    }
}
