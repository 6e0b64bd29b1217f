//! Odometry motion sampling.
//!
//! - [`MotionModel`]: rotation-translation-rotation odometry model with
//!   motion-proportional Gaussian noise

mod motion_model;

pub use motion_model::{MotionModel, MotionModelConfig};
