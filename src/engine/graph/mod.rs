//! Scan graph built by the mapper.
//!
//! Nodes are scans at their corrected poses; edges are relative pose
//! constraints. Odometry constraints link consecutive scans, loop
//! constraints link revisited places.
//!
//! ```text
//!    [S0] ──odom──▶ [S1] ──odom──▶ [S2] ──odom──▶ [S3]
//!     │                              ▲
//!     └──────────── loop ────────────┘
//! ```
//!
//! The graph also answers radius queries over scan positions and renders
//! itself as [`MarkerArray`] for viewers.

mod constraint;
mod graph;
mod markers;

pub use constraint::{Constraint, ConstraintKind, Information2D};
pub use graph::{Graph, GraphError, Result};
pub use markers::{Color, Marker, MarkerArray, MarkerKind};
