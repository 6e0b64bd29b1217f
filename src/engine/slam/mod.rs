//! Online mapping.
//!
//! ```text
//!  odometry + sweep
//!        │
//!        ▼
//!  travel gating ──(too close)──▶ dropped
//!        │
//!        ▼
//!  seed from odometry delta
//!        │
//!        ▼
//!  match against NDT of last `rolling_depth` scans
//!        │
//!        ▼
//!  append scan + odometry constraint to the graph
//! ```
//!
//! # Example
//!
//! ```
//! use ndt_slam::core::types::Pose2D;
//! use ndt_slam::engine::slam::Mapper;
//! use ndt_slam::sensors::simulated::RectangleRoom;
//!
//! let room = RectangleRoom::default();
//! let mut mapper = Mapper::default();
//!
//! let pose = Pose2D::identity();
//! let update = mapper.process(&pose, &room.scan(&pose, 360, 12.0));
//! assert_eq!(update.map(|u| u.scan_id), Some(0));
//! ```

mod mapper;

pub use mapper::{Mapper, MapperConfig, MapperUpdate};
