//! ndt-slam - Normal Distributions Transform scan matching and mapping
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 threads/ + state/                   │  ← Runtime
//! │        (mapper thread, publisher, shared maps)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │              (bag files, graph store)               │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │              (mapper, scan graph)                   │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │      (ndt, matching, mapping, localization)         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │          (preprocessing, simulated room)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! Each sweep that passes travel gating is seeded from odometry, matched
//! against an NDT grid built from the last few accepted scans, and appended
//! to the scan graph with an odometry constraint. The publisher rebuilds the
//! full-history grid and an occupancy map whenever new scans arrive.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Sensor processing (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Algorithms (depends on core, sensors)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 4: Mapping engine (depends on core, sensors, algorithms)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 5: I/O, runtime and configuration
// ============================================================================
pub mod config;
pub mod io;
pub mod state;
pub mod threads;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::math;
pub use core::types::{Covariance2D, LaserScan, Point2D, Pose2D, Scan, Timestamped};

// Algorithms
pub use algorithms::mapping::{CellState, OccupancyGrid};
pub use algorithms::matching::{NdtMatcherConfig, NdtScanMatcher, ScanMatchResult, ScanMatcher};
pub use algorithms::ndt::{Cell, NdtConfig, NdtGrid};

// Engine
pub use engine::graph::{Constraint, Graph};
pub use engine::slam::{Mapper, MapperConfig, MapperUpdate};

// I/O
pub use io::bag::{BagInfo, BagPlayer, BagRecorder, SensorMessage};

// Configuration
pub use config::NdtSlamConfig;
