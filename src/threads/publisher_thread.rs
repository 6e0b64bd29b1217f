//! Publisher thread: periodically rebuilds the published maps.
//!
//! Every `publish_interval_ms` the thread checks the shared update flag. When
//! new scans arrived it snapshots the history, builds a fresh NDT grid and
//! occupancy map outside any lock and swaps them into [`SharedState`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::algorithms::mapping::{
    NdtRenderConfig, OccupancyGrid, RayTraceConfig, RayTraceRenderer, render_ndt_map,
};
use crate::algorithms::ndt::{NdtConfig, NdtGrid};
use crate::config::ConfigError;
use crate::state::{SharedState, SharedStateHandle};

/// Which renderer produces the published occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapRenderer {
    /// Sample the NDT likelihood field.
    #[default]
    Ndt,
    /// Count ray hits and passes per cell.
    RayTrace,
}

/// Configuration for the publisher thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Wake-up period in milliseconds.
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    /// Renderer for the occupancy grid.
    #[serde(default)]
    pub renderer: MapRenderer,
}

fn default_publish_interval_ms() -> u64 {
    250
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: default_publish_interval_ms(),
            renderer: MapRenderer::default(),
        }
    }
}

impl PublisherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "publisher.publish_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }
}

/// Builds the published grids from history snapshots.
#[derive(Debug, Clone)]
pub struct MapPublisher {
    renderer: MapRenderer,
    ndt_config: NdtConfig,
    /// Grid bounds padding around the scan poses (sensor range).
    padding: f64,
    render_config: NdtRenderConfig,
    ray_tracer: RayTraceRenderer,
}

impl MapPublisher {
    pub fn new(
        renderer: MapRenderer,
        ndt_config: NdtConfig,
        padding: f64,
        render_config: NdtRenderConfig,
        ray_trace_config: RayTraceConfig,
    ) -> Self {
        Self {
            renderer,
            ndt_config,
            padding,
            render_config,
            ray_tracer: RayTraceRenderer::new(ray_trace_config),
        }
    }

    /// Rebuild and swap in both grids from the current history.
    pub fn publish(&mut self, shared: &SharedState) -> Arc<OccupancyGrid> {
        let start = Instant::now();
        let history = shared.snapshot();

        let grid = Arc::new(NdtGrid::from_scans(
            self.ndt_config,
            history.scans(),
            self.padding,
        ));
        let occupancy = Arc::new(match self.renderer {
            MapRenderer::Ndt => render_ndt_map(&grid, &self.render_config),
            MapRenderer::RayTrace => self.ray_tracer.render(history.scans()),
        });

        shared.publish_grid(grid);
        shared.publish_occupancy(Arc::clone(&occupancy));

        log::debug!(
            "Published map from {} scans: {}x{} cells in {:.1}ms",
            history.len(),
            occupancy.width(),
            occupancy.height(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        occupancy
    }
}

/// Publisher thread handle.
pub struct PublisherThread {
    handle: JoinHandle<()>,
}

impl PublisherThread {
    /// Spawn the publisher thread.
    pub fn spawn(
        config: PublisherConfig,
        mut publisher: MapPublisher,
        shared_state: SharedStateHandle,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let interval = config.interval();
        let handle = thread::Builder::new()
            .name("publisher".into())
            .spawn(move || {
                log::info!("Publisher thread starting ({}ms interval)", interval.as_millis());
                while running.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if shared_state.take_map_update() {
                        publisher.publish(&shared_state);
                    }
                }
                // Pick up scans that arrived during the last interval
                if shared_state.take_map_update() {
                    publisher.publish(&shared_state);
                }
                log::info!("Publisher thread stopped");
            })?;

        Ok(Self { handle })
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::mapping::CellState;
    use crate::core::types::{Point2D, Pose2D, Scan};
    use crate::state::create_shared_state;

    fn wall_scan(id: usize) -> Scan {
        let points = (0..40)
            .map(|i| Point2D::new(1.1, -1.0 + i as f64 * 0.05))
            .collect();
        Scan::new(id, Pose2D::identity(), points)
    }

    fn publisher(renderer: MapRenderer) -> MapPublisher {
        MapPublisher::new(
            renderer,
            NdtConfig::default(),
            2.0,
            NdtRenderConfig::default(),
            RayTraceConfig::default(),
        )
    }

    #[test]
    fn test_publish_ndt() {
        let shared = create_shared_state(NdtConfig::default());
        shared.append(wall_scan(0), Pose2D::identity(), None).unwrap();

        let occupancy = publisher(MapRenderer::Ndt).publish(&shared);

        assert!(!shared.grid().is_empty());
        assert_eq!(shared.occupancy().as_deref(), Some(&*occupancy));
        let (cx, cy) = occupancy.world_to_cell(1.1, 0.1).unwrap();
        assert_eq!(occupancy.get_state(cx, cy), CellState::Occupied);
    }

    #[test]
    fn test_publish_ray_trace() {
        let shared = create_shared_state(NdtConfig::default());
        shared.append(wall_scan(0), Pose2D::identity(), None).unwrap();

        let occupancy = publisher(MapRenderer::RayTrace).publish(&shared);

        let (cx, cy) = occupancy.world_to_cell(0.5, 0.0).unwrap();
        assert_eq!(occupancy.get_state(cx, cy), CellState::Free);
    }

    #[test]
    fn test_thread_publishes_pending_update() {
        let shared = create_shared_state(NdtConfig::default());
        shared.append(wall_scan(0), Pose2D::identity(), None).unwrap();
        let running = Arc::new(AtomicBool::new(true));

        let config = PublisherConfig {
            publish_interval_ms: 5,
            ..PublisherConfig::default()
        };
        let thread = PublisherThread::spawn(
            config,
            publisher(MapRenderer::Ndt),
            Arc::clone(&shared),
            Arc::clone(&running),
        )
        .unwrap();
        running.store(false, Ordering::Relaxed);
        thread.join().unwrap();

        assert!(shared.occupancy().is_some());
        assert!(!shared.map_update_available());
    }

    #[test]
    fn test_config_toml() {
        let config: PublisherConfig = basic_toml::from_str("renderer = \"ray_trace\"").unwrap();
        assert_eq!(config.renderer, MapRenderer::RayTrace);
        assert_eq!(config.publish_interval_ms, 250);
        assert!(config.validate().is_ok());
    }
}
