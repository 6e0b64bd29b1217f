//! Odometry motion model for sampling pose hypotheses.
//!
//! Implements the odometry motion model from Probabilistic Robotics
//! (Thrun et al.). A relative motion is decomposed into:
//! 1. Initial rotation toward the direction of travel
//! 2. Translation along it
//! 3. Final rotation to the target heading
//!
//! Each component gets zero-mean Gaussian noise whose spread grows with the
//! size of the motion, controlled by the alpha parameters.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::core::math::{angle_diff, normalize_angle};
use crate::core::types::Pose2D;

/// Translations shorter than this are treated as pure rotation.
const MIN_TRANSLATION: f64 = 0.01;

/// Configuration for the odometry motion model.
///
/// - `a1`: rotation noise from rotation
/// - `a2`: rotation noise from translation
/// - `a3`: translation noise from translation
/// - `a4`: translation noise from rotation
/// - `a5`: accepted for parameter compatibility, unused by the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionModelConfig {
    #[serde(default = "default_alpha")]
    pub a1: f64,
    #[serde(default = "default_alpha")]
    pub a2: f64,
    #[serde(default = "default_alpha")]
    pub a3: f64,
    #[serde(default = "default_alpha")]
    pub a4: f64,
    #[serde(default = "default_alpha")]
    pub a5: f64,
}

fn default_alpha() -> f64 {
    0.2
}

impl Default for MotionModelConfig {
    fn default() -> Self {
        Self {
            a1: default_alpha(),
            a2: default_alpha(),
            a3: default_alpha(),
            a4: default_alpha(),
            a5: default_alpha(),
        }
    }
}

impl MotionModelConfig {
    /// Noise-free model: every sample equals the odometry motion.
    pub fn noiseless() -> Self {
        Self {
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            a4: 0.0,
            a5: 0.0,
        }
    }
}

/// Rotation-translation-rotation decomposition of a relative motion.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Decomposition {
    rot1: f64,
    trans: f64,
    rot2: f64,
}

/// Odometry motion model.
#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionModelConfig,
}

impl MotionModel {
    /// Create a new motion model with the given configuration.
    pub fn new(config: MotionModelConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MotionModelConfig {
        &self.config
    }

    fn decompose(dx: f64, dy: f64, dtheta: f64) -> Decomposition {
        let trans = dx.hypot(dy);
        let rot1 = if trans > MIN_TRANSLATION {
            dy.atan2(dx)
        } else {
            0.0
        };
        let rot2 = angle_diff(rot1, dtheta);
        Decomposition { rot1, trans, rot2 }
    }

    /// Noise standard deviations for (rot1, trans, rot2).
    ///
    /// Rotations are folded so that driving backwards (a rotation near π)
    /// is not penalized as a half turn.
    fn sigmas(&self, motion: &Decomposition) -> (f64, f64, f64) {
        let fold = |r: f64| angle_diff(r, 0.0).abs().min(angle_diff(r, PI).abs());
        let rot1 = fold(motion.rot1);
        let rot2 = fold(motion.rot2);
        let trans = motion.trans;
        let c = &self.config;

        let sigma_rot1 = (c.a1 * rot1 * rot1 + c.a2 * trans * trans).sqrt();
        let sigma_trans = (c.a3 * trans * trans + c.a4 * rot1 * rot1 + c.a4 * rot2 * rot2).sqrt();
        let sigma_rot2 = (c.a1 * rot2 * rot2 + c.a2 * trans * trans).sqrt();
        (sigma_rot1, sigma_trans, sigma_rot2)
    }

    /// Advance every pose by a noisy sample of the motion `(dx, dy, dθ)`.
    ///
    /// The motion is expressed in the frame of the previous odometry pose;
    /// each pose applies it relative to its own heading.
    pub fn sample<R: Rng>(
        &self,
        dx: f64,
        dy: f64,
        dtheta: f64,
        poses: &mut [Pose2D],
        rng: &mut R,
    ) {
        let motion = Self::decompose(dx, dy, dtheta);
        let (sigma_rot1, sigma_trans, sigma_rot2) = self.sigmas(&motion);

        for pose in poses.iter_mut() {
            let r1 = motion.rot1 + sigma_rot1 * standard_normal(rng);
            let t = motion.trans + sigma_trans * standard_normal(rng);
            let r2 = motion.rot2 + sigma_rot2 * standard_normal(rng);

            let heading = pose.theta + r1;
            pose.x += t * heading.cos();
            pose.y += t * heading.sin();
            pose.theta = normalize_angle(heading + r2);
        }
    }
}

/// Standard normal sample via the Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // random::<f64>() is in [0, 1); shift to (0, 1] so ln() stays finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_noiseless_forward_motion() {
        let model = MotionModel::new(MotionModelConfig::noiseless());
        let mut rng = StdRng::seed_from_u64(42);
        let mut poses = vec![Pose2D::new(1.0, 2.0, FRAC_PI_2), Pose2D::identity()];

        model.sample(0.5, 0.0, 0.0, &mut poses, &mut rng);

        assert_relative_eq!(poses[0].x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(poses[0].y, 2.5, epsilon = 1e-12);
        assert_relative_eq!(poses[0].theta, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(poses[1].x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(poses[1].y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_noiseless_matches_composition() {
        let model = MotionModel::new(MotionModelConfig::noiseless());
        let mut rng = StdRng::seed_from_u64(7);
        let start = Pose2D::new(-0.3, 0.4, 0.8);
        let delta = Pose2D::new(0.3, 0.2, -0.5);
        let mut poses = vec![start];

        model.sample(delta.x, delta.y, delta.theta, &mut poses, &mut rng);

        let expected = start.compose(&delta);
        assert_relative_eq!(poses[0].x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(poses[0].y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(poses[0].theta, expected.theta, epsilon = 1e-12);
    }

    #[test]
    fn test_small_translation_is_pure_rotation() {
        let model = MotionModel::new(MotionModelConfig::noiseless());
        let mut rng = StdRng::seed_from_u64(1);
        let mut poses = vec![Pose2D::identity()];

        model.sample(0.0, 0.0, 1.0, &mut poses, &mut rng);

        assert_relative_eq!(poses[0].x, 0.0);
        assert_relative_eq!(poses[0].y, 0.0);
        assert_relative_eq!(poses[0].theta, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_noisy_samples_center_on_motion() {
        let model = MotionModel::new(MotionModelConfig {
            a1: 0.01,
            a2: 0.01,
            a3: 0.01,
            a4: 0.01,
            a5: 0.0,
        });
        let mut rng = StdRng::seed_from_u64(42);
        let mut poses = vec![Pose2D::identity(); 2000];

        model.sample(1.0, 0.0, 0.0, &mut poses, &mut rng);

        let n = poses.len() as f64;
        let mean_x = poses.iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y = poses.iter().map(|p| p.y).sum::<f64>() / n;
        let spread = poses.iter().map(|p| (p.x - mean_x).powi(2)).sum::<f64>() / n;

        assert!((mean_x - 1.0).abs() < 0.02, "mean x {mean_x}");
        assert!(mean_y.abs() < 0.02, "mean y {mean_y}");
        assert!(spread > 0.0);
    }

    #[test]
    fn test_reverse_motion_is_not_a_half_turn() {
        let model = MotionModel::new(MotionModelConfig::default());
        let forward = MotionModel::decompose(0.5, 0.0, 0.0);
        let backward = MotionModel::decompose(-0.5, 0.0, 0.0);

        let (f1, ft, f2) = model.sigmas(&forward);
        let (b1, bt, b2) = model.sigmas(&backward);
        assert_relative_eq!(f1, b1, epsilon = 1e-9);
        assert_relative_eq!(ft, bt, epsilon = 1e-9);
        assert_relative_eq!(f2, b2, epsilon = 1e-9);
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(3);
        let samples: Vec<f64> = (0..5000).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;

        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.1);
        assert!(samples.iter().all(|s| s.is_finite()));
    }
}
