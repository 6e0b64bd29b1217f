//! Relative pose constraints between scans.

use serde::{Deserialize, Serialize};

use crate::core::types::{Covariance2D, Pose2D, Scan};

/// Information matrix (inverse covariance) for 2D pose.
///
/// Stored as the upper triangle of a 3x3 symmetric matrix:
/// ```text
/// | xx  xy  xt |
/// | xy  yy  yt |
/// | xt  yt  tt |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Information2D {
    /// Information for x-x
    pub xx: f64,
    /// Information for x-y
    pub xy: f64,
    /// Information for x-theta
    pub xt: f64,
    /// Information for y-y
    pub yy: f64,
    /// Information for y-theta
    pub yt: f64,
    /// Information for theta-theta
    pub tt: f64,
}

impl Information2D {
    /// Create a diagonal information matrix.
    pub fn diagonal(xx: f64, yy: f64, tt: f64) -> Self {
        Self {
            xx,
            xy: 0.0,
            xt: 0.0,
            yy,
            yt: 0.0,
            tt,
        }
    }

    /// Invert a pose covariance; `None` when it is singular or not finite.
    pub fn from_covariance(covariance: &Covariance2D) -> Option<Self> {
        let inv = covariance.try_inverse()?;
        // Average the off-diagonal pairs so the result is exactly symmetric
        let sym = |r: usize, c: usize| 0.5 * (inv.get(r, c) + inv.get(c, r));
        Some(Self {
            xx: inv.get(0, 0),
            xy: sym(0, 1),
            xt: sym(0, 2),
            yy: inv.get(1, 1),
            yt: sym(1, 2),
            tt: inv.get(2, 2),
        })
    }

    /// Full row-major 3x3 matrix.
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.xx, self.xy, self.xt, //
            self.xy, self.yy, self.yt, //
            self.xt, self.yt, self.tt,
        ]
    }
}

/// Which list of the graph a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Sequential constraint from the mapping loop.
    Odometry,
    /// Constraint closing a loop between distant scans.
    Loop,
}

/// Relative pose between two scans.
///
/// `transform` is the pose of `end` expressed in the frame of `begin`.
/// `information` is `None` when no usable covariance was available; it is
/// not an identity placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Index of the reference scan.
    pub begin: usize,
    /// Index of the constrained scan.
    pub end: usize,
    /// (dx, dy, dθ) of `end` in the frame of `begin`.
    pub transform: Pose2D,
    /// Inverse covariance of `transform`, if known.
    pub information: Option<Information2D>,
    /// Whether an optimizer may disable this constraint.
    pub switchable: bool,
}

impl Constraint {
    /// Constraint from the current poses of `from` and `to`.
    ///
    /// The map-frame delta is rotated into the frame of `from`; the
    /// information matrix is the inverse of `covariance` when it exists.
    pub fn between(from: &Scan, to: &Scan, covariance: Option<&Covariance2D>) -> Self {
        let dx = to.pose.x - from.pose.x;
        let dy = to.pose.y - from.pose.y;
        let (sin_t, cos_t) = from.pose.theta.sin_cos();

        Self {
            begin: from.id,
            end: to.id,
            transform: Pose2D::new(
                cos_t * dx + sin_t * dy,
                -sin_t * dx + cos_t * dy,
                to.pose.theta - from.pose.theta,
            ),
            information: covariance.and_then(Information2D::from_covariance),
            switchable: false,
        }
    }

    /// Mark the constraint as switchable.
    pub fn with_switchable(mut self, switchable: bool) -> Self {
        self.switchable = switchable;
        self
    }
}
