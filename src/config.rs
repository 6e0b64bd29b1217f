//! TOML configuration for the mapping daemon.
//!
//! Every section is optional; missing sections and fields take their
//! defaults.
//!
//! ```toml
//! [matcher]
//! resolution = 0.25
//! use_parallel = true
//!
//! [mapper]
//! rolling_depth = 10
//!
//! [render]
//! resolution = 0.05
//!
//! [occupancy]
//! occ_thresh = 0.25
//!
//! [motion_model]
//! a1 = 0.2
//!
//! [publisher]
//! publish_interval_ms = 250
//! renderer = "ndt"
//!
//! [sensor]
//! range_max = 12.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algorithms::localization::MotionModelConfig;
use crate::algorithms::mapping::{NdtRenderConfig, RayTraceConfig};
use crate::algorithms::matching::{DEFAULT_RANGE_MAX, NdtMatcherConfig};
use crate::engine::slam::MapperConfig;
use crate::threads::PublisherConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] basic_toml::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Sensor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Readings beyond this range are dropped (meters).
    #[serde(default = "default_range_max")]
    pub range_max: f64,
}

fn default_range_max() -> f64 {
    DEFAULT_RANGE_MAX
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            range_max: default_range_max(),
        }
    }
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NdtSlamConfig {
    #[serde(default)]
    pub matcher: NdtMatcherConfig,
    #[serde(default)]
    pub mapper: MapperConfig,
    #[serde(default)]
    pub render: NdtRenderConfig,
    #[serde(default)]
    pub occupancy: RayTraceConfig,
    /// Odometry noise for `bag_simulate` recordings.
    #[serde(default)]
    pub motion_model: MotionModelConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
}

impl NdtSlamConfig {
    /// Parse TOML text and validate it.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = basic_toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Load `path` if given, falling back to defaults on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{} ({}), using defaults", e, path.display());
                Self::default()
            }
        }
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.matcher.validate()?;
        self.mapper.validate()?;
        self.publisher.validate()?;

        if !(self.render.resolution > 0.0) {
            return Err(ConfigError::Invalid("render.resolution must be > 0".into()));
        }
        if !(self.render.min_likelihood < self.render.max_likelihood) {
            return Err(ConfigError::Invalid(
                "render.min_likelihood must be below render.max_likelihood".into(),
            ));
        }
        if !(self.occupancy.resolution > 0.0) {
            return Err(ConfigError::Invalid(
                "occupancy.resolution must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.occupancy.occ_thresh) {
            return Err(ConfigError::Invalid(
                "occupancy.occ_thresh must be in [0, 1)".into(),
            ));
        }
        let m = &self.motion_model;
        if [m.a1, m.a2, m.a3, m.a4, m.a5].iter().any(|a| !(*a >= 0.0)) {
            return Err(ConfigError::Invalid(
                "motion_model alphas must be >= 0".into(),
            ));
        }
        if !(self.sensor.range_max > 0.0 && self.sensor.range_max.is_finite()) {
            return Err(ConfigError::Invalid(
                "sensor.range_max must be finite and > 0".into(),
            ));
        }
        Ok(())
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(basic_toml::to_string(self)?)
    }
}
