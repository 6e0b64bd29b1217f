//! Core SLAM algorithms layer.
//!
//! This layer contains the algorithmic building blocks for SLAM.
//!
//! # Contents
//!
//! - [`ndt`]: NDT cells and grid (the map model)
//! - [`matching`]: Exhaustive NDT scan matching with covariance estimate
//! - [`mapping`]: Occupancy rendering (NDT-sampled and ray-traced)
//! - [`localization`]: Odometry motion model

pub mod localization;
pub mod mapping;
pub mod matching;
pub mod ndt;
