//! Core foundation layer.
//!
//! This is the bottom layer of the stack with no internal dependencies.
//! All other layers depend on core.
//!
//! # Contents
//!
//! - [`types`]: Value types (points, poses, scans, covariance)
//! - [`math`]: Angle normalization and search discretization helpers

pub mod math;
pub mod types;
