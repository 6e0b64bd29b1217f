//! Core data types for NDT mapping.
//!
//! - [`Point2D`]: 2D point in meters
//! - [`Pose2D`]: Robot pose (x, y, theta) in meters and radians
//! - [`Covariance2D`]: 3x3 covariance matrix for pose uncertainty
//! - [`Timestamped<T>`]: Capture-time wrapper for recorded data
//! - [`LaserScan`]: Raw LiDAR sweep in polar coordinates
//! - [`Scan`]: Projected sweep with its corrected pose

mod covariance;
mod pose;
mod scan;
mod timestamped;

pub use covariance::Covariance2D;
pub use pose::{Point2D, Pose2D};
pub use scan::{LaserScan, Scan};
pub use timestamped::Timestamped;
