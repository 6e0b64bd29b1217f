//! Sensor input handling.
//!
//! - [`preprocessing`]: polar to Cartesian conversion with range gating
//! - [`simulated`]: synthetic LiDAR sweeps for tests and replay bags

pub mod preprocessing;
pub mod simulated;
