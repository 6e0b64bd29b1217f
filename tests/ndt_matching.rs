//! Scan matching tests against simulated sweeps.
//!
//! These tests run the matcher the way the mapper does: sweeps are projected
//! to sensor-frame points, the map is built from earlier scans, and the new
//! scan is matched from a perturbed seed.

use ndt_slam::algorithms::matching::{NdtMatcherConfig, NdtScanMatcher, ScanMatcher};
use ndt_slam::core::math::angle_diff;
use ndt_slam::sensors::preprocessing::ScanConverter;
use ndt_slam::sensors::simulated::RectangleRoom;
use ndt_slam::{Point2D, Pose2D, Scan};

const RANGE_MAX: f64 = 8.0;

/// Project a simulated sweep at `truth` into a scan placed at `pose`.
fn sweep_scan(id: usize, truth: &Pose2D, pose: Pose2D) -> Scan {
    let laser = RectangleRoom::default().scan(truth, 360, RANGE_MAX);
    Scan::new(id, pose, ScanConverter::to_points(&laser, RANGE_MAX))
}

fn matcher_with_map(config: NdtMatcherConfig, map: &[Scan]) -> NdtScanMatcher {
    let mut matcher = NdtScanMatcher::new(config);
    matcher.set_range_max(RANGE_MAX);
    matcher.add_scans(map);
    matcher
}

/// Two walls along x, sampled every 2cm, with no end walls.
fn corridor_points() -> Vec<Point2D> {
    (0..=300)
        .flat_map(|i| {
            let x = -3.0 + i as f64 * 0.02;
            [Point2D::new(x, 0.5), Point2D::new(x, -0.5)]
        })
        .collect()
}

#[test]
fn test_matches_sweep_from_moved_pose() {
    let origin = Pose2D::identity();
    let map = vec![sweep_scan(0, &origin, origin)];
    let matcher = matcher_with_map(NdtMatcherConfig::fast(), &map);

    let truth = Pose2D::new(0.1, 0.05, 0.04);
    let seed = Pose2D::new(truth.x + 0.03, truth.y - 0.02, truth.theta - 0.05);
    let scan = sweep_scan(1, &truth, seed);

    let result = matcher.match_scan(&scan, &seed, 200);

    assert!(result.converged);
    assert!(
        (result.pose.x - truth.x).abs() < 0.015,
        "x error {:.4}",
        result.pose.x - truth.x
    );
    assert!(
        (result.pose.y - truth.y).abs() < 0.015,
        "y error {:.4}",
        result.pose.y - truth.y
    );
    assert!(
        angle_diff(truth.theta, result.pose.theta).abs() < 0.015,
        "theta error {:.4}",
        angle_diff(truth.theta, result.pose.theta)
    );
}

#[test]
fn test_matched_pose_beats_seed() {
    let origin = Pose2D::identity();
    let map = vec![sweep_scan(0, &origin, origin)];
    let matcher = matcher_with_map(NdtMatcherConfig::fast(), &map);

    let truth = Pose2D::new(-0.2, 0.1, -0.03);
    let seed = Pose2D::new(truth.x - 0.04, truth.y + 0.03, truth.theta + 0.06);
    let scan = sweep_scan(1, &truth, seed);

    let result = matcher.match_scan(&scan, &seed, 360);

    let points = NdtScanMatcher::subsample(&scan.points, 360);
    assert!(result.score > matcher.score_points(&points, &seed));
    assert!(matcher.score_scan_at(&scan, &truth) > matcher.score_scan_at(&scan, &seed));
}

#[test]
fn test_score_peaks_at_true_pose() {
    let origin = Pose2D::identity();
    let map = vec![sweep_scan(0, &origin, origin)];
    let matcher = matcher_with_map(NdtMatcherConfig::default(), &map);

    let truth = Pose2D::new(0.3, -0.1, 0.05);
    let scan = sweep_scan(1, &truth, truth);
    let at_truth = matcher.score_scan(&scan);

    for offset in [
        Pose2D::new(0.1, 0.0, 0.0),
        Pose2D::new(0.0, -0.1, 0.0),
        Pose2D::new(0.0, 0.0, 0.1),
    ] {
        let moved = truth.offset_by(&offset);
        assert!(
            matcher.score_scan_at(&scan, &moved) < at_truth,
            "offset {:?} scored higher than truth",
            offset
        );
    }
}

#[test]
fn test_corridor_covariance_is_elongated() {
    let map = vec![Scan::new(0, Pose2D::identity(), corridor_points())];
    // A single, near-zero rotation keeps the search to translations
    let config = NdtMatcherConfig {
        angular_size: 1e-4,
        angular_res: 2e-4,
        ..NdtMatcherConfig::fast()
    };
    assert_eq!(config.angular_steps(), 1);
    let mut matcher = NdtScanMatcher::new(config);
    matcher.set_range_max(4.0);
    matcher.add_scans(&map);

    let scan = Scan::new(1, Pose2D::identity(), corridor_points());
    let result = matcher.match_scan(&scan, &Pose2D::identity(), 200);

    assert!(result.converged);
    assert!(result.pose.y.abs() < 0.011);
    // Sliding along the walls changes little; sideways motion is pinned
    let cov = result.covariance;
    assert!(
        cov.var_x() > 10.0 * cov.var_y(),
        "var_x {:.2e} var_y {:.2e}",
        cov.var_x(),
        cov.var_y()
    );
}

#[test]
fn test_rolling_window_map() {
    // Map from several scans along a drive, as the mapper builds it
    let map: Vec<Scan> = (0..5)
        .map(|i| {
            let pose = Pose2D::new(i as f64 * 0.1, 0.0, i as f64 * 0.02);
            sweep_scan(i, &pose, pose)
        })
        .collect();
    let matcher = matcher_with_map(NdtMatcherConfig::default(), &map);

    let truth = Pose2D::new(0.52, 0.01, 0.1);
    let seed = Pose2D::new(0.5, 0.0, 0.08);
    let scan = sweep_scan(5, &truth, seed);

    let result = matcher.match_scan(&scan, &seed, 100);

    assert!(result.converged);
    assert!((result.pose.x - truth.x).abs() < 0.02);
    assert!((result.pose.y - truth.y).abs() < 0.02);
    assert!(angle_diff(truth.theta, result.pose.theta).abs() < 0.02);
    assert_eq!(
        result.candidates,
        NdtMatcherConfig::default().search_space_size()
    );
}
