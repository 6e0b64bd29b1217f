//! LiDAR scan preprocessing.
//!
//! - [`ScanConverter`]: polar readings to sensor-frame points with a range cutoff

mod converter;

pub use converter::ScanConverter;
