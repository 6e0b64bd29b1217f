//! Thread-safe state shared by the mapper and publisher threads.
//!
//! - Mapper thread: only writer of [`MapHistory`]
//! - Publisher thread: snapshots the history, publishes grids
//! - Any reader: clones the published `Arc`s
//!
//! Grids are replaced whole. A reader holding an `Arc<NdtGrid>` keeps a
//! complete map even while the publisher swaps in the next one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::algorithms::mapping::OccupancyGrid;
use crate::algorithms::ndt::{NdtConfig, NdtGrid};
use crate::core::types::{Pose2D, Scan};
use crate::engine::graph::{Constraint, Graph, GraphError};

/// Everything the mapper has accepted so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapHistory {
    /// Scans at corrected poses plus their constraints
    pub graph: Graph,
    /// Odometry pose of each scan
    pub odom_poses: Vec<Pose2D>,
}

impl MapHistory {
    /// Number of scans.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Check if no scan was recorded.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn scans(&self) -> &[Scan] {
        self.graph.scans()
    }

    /// `corrected ∘ odom⁻¹` of the latest scan.
    pub fn map_to_odom(&self) -> Option<Pose2D> {
        let corrected = self.graph.last_scan()?.pose;
        let odom = self.odom_poses.last()?;
        Some(corrected.compose(&odom.inverse()))
    }
}

/// Thread-safe shared state.
#[derive(Debug)]
pub struct SharedState {
    history: RwLock<MapHistory>,
    grid: RwLock<Arc<NdtGrid>>,
    occupancy: RwLock<Option<Arc<OccupancyGrid>>>,
    map_update_available: AtomicBool,
    revision: AtomicU64,
}

impl SharedState {
    /// Create empty state; the published grid starts with no cells.
    pub fn new(ndt_config: NdtConfig) -> Self {
        Self {
            history: RwLock::new(MapHistory::default()),
            grid: RwLock::new(Arc::new(NdtGrid::empty(ndt_config))),
            occupancy: RwLock::new(None),
            map_update_available: AtomicBool::new(false),
            revision: AtomicU64::new(0),
        }
    }

    /// Append an accepted scan with its odometry pose and constraint.
    ///
    /// Nothing is appended when the graph rejects the scan or constraint.
    pub fn append(
        &self,
        scan: Scan,
        odom_pose: Pose2D,
        constraint: Option<Constraint>,
    ) -> Result<(), GraphError> {
        {
            let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(c) = &constraint {
                // Validate against the post-append length before mutating
                let len = history.graph.len() + 1;
                for index in [c.begin, c.end] {
                    if index >= len {
                        return Err(GraphError::UnknownScan { index, len });
                    }
                }
            }
            history.graph.add_scan(scan)?;
            if let Some(c) = constraint {
                history.graph.add_odom_constraint(c)?;
            }
            history.odom_poses.push(odom_pose);
        }
        self.revision.fetch_add(1, Ordering::Release);
        self.map_update_available.store(true, Ordering::Release);
        Ok(())
    }

    /// Replace the whole history, e.g. after loading a saved graph.
    pub fn replace_history(&self, history: MapHistory) {
        *self.history.write().unwrap_or_else(PoisonError::into_inner) = history;
        self.revision.fetch_add(1, Ordering::Release);
        self.map_update_available.store(true, Ordering::Release);
    }

    /// Consistent copy of the history.
    pub fn snapshot(&self) -> MapHistory {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of scans in the history.
    pub fn scan_count(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Latest map to odometry transform.
    pub fn map_to_odom(&self) -> Option<Pose2D> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map_to_odom()
    }

    /// Clear the update flag, returning whether it was set.
    pub fn take_map_update(&self) -> bool {
        self.map_update_available.swap(false, Ordering::AcqRel)
    }

    /// Whether scans arrived since the last [`SharedState::take_map_update`].
    pub fn map_update_available(&self) -> bool {
        self.map_update_available.load(Ordering::Acquire)
    }

    /// Number of history changes so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Currently published NDT grid.
    pub fn grid(&self) -> Arc<NdtGrid> {
        Arc::clone(&self.grid.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a fully built grid.
    pub fn publish_grid(&self, grid: Arc<NdtGrid>) {
        *self.grid.write().unwrap_or_else(PoisonError::into_inner) = grid;
    }

    /// Latest rendered occupancy grid.
    pub fn occupancy(&self) -> Option<Arc<OccupancyGrid>> {
        self.occupancy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a rendered occupancy grid.
    pub fn publish_occupancy(&self, occupancy: Arc<OccupancyGrid>) {
        *self.occupancy.write().unwrap_or_else(PoisonError::into_inner) = Some(occupancy);
    }
}

/// Handle type for shared state.
pub type SharedStateHandle = Arc<SharedState>;

/// Create a new shared state wrapped in an `Arc`.
pub fn create_shared_state(ndt_config: NdtConfig) -> SharedStateHandle {
    Arc::new(SharedState::new(ndt_config))
}
