//! Occupancy map rendering.
//!
//! Two renderers produce an [`OccupancyGrid`] from the scan history:
//!
//! - [`render_ndt_map`]: samples the NDT likelihood on a lattice
//! - [`RayTraceRenderer`]: Bresenham hit/miss counting from each scan pose
//!
//! # Example
//!
//! ```
//! use ndt_slam::algorithms::mapping::{CellState, RayTraceRenderer};
//! use ndt_slam::core::types::{Point2D, Pose2D, Scan};
//!
//! let scan = Scan::new(0, Pose2D::identity(), vec![Point2D::new(1.0, 0.0)]);
//! let map = RayTraceRenderer::default().render(&[scan]);
//!
//! let (cx, cy) = map.world_to_cell(1.01, 0.01).unwrap();
//! assert_eq!(map.get_state(cx, cy), CellState::Occupied);
//! ```

mod ndt_render;
mod occupancy_grid;
mod ray_tracer;

pub use ndt_render::{NdtRenderConfig, render_ndt_map};
pub use occupancy_grid::{CellState, FREE, OCCUPIED, OccupancyGrid, UNKNOWN};
pub use ray_tracer::{RayTraceConfig, RayTraceRenderer};
