//! Mapper thread: feeds sensor messages through the [`Mapper`].
//!
//! Messages arrive over a crossbeam channel (live) or from a replay bag.
//! Odometry messages update the latest known pose; each laser message is
//! processed at that pose. Accepted scans are appended to the shared
//! history for the publisher.
//!
//! The thread stops when the running flag clears, the channel disconnects
//! or the bag ends, and hands its final graph back through
//! [`MapperThread::join`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::algorithms::matching::ScanMatcher;
use crate::core::types::Pose2D;
use crate::engine::graph::Graph;
use crate::engine::slam::{Mapper, MapperUpdate};
use crate::io::bag::{BagPlayer, SensorMessage};
use crate::state::SharedStateHandle;

/// How often a blocked receive re-checks the running flag.
const RECV_POLL: Duration = Duration::from_millis(100);

/// Where the mapper thread reads sensor messages from.
#[derive(Debug)]
pub enum MessageSource {
    /// Live messages; the thread ends when all senders drop.
    Channel(Receiver<SensorMessage>),
    /// Replay bag at `speed` (0 = as fast as possible).
    Bag { path: PathBuf, speed: f64 },
}

/// Mapper thread handle.
pub struct MapperThread {
    handle: JoinHandle<Graph>,
}

impl MapperThread {
    /// Spawn the mapper thread.
    pub fn spawn<M: ScanMatcher + 'static>(
        mapper: Mapper<M>,
        source: MessageSource,
        shared_state: SharedStateHandle,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("mapper".into())
            .spawn(move || {
                log::info!("Mapper thread starting");
                let mut worker = MapperWorker::new(mapper, shared_state);
                match source {
                    MessageSource::Channel(rx) => run_channel_loop(&mut worker, &rx, &running),
                    MessageSource::Bag { path, speed } => {
                        run_bag_loop(&mut worker, &path, speed, &running)
                    }
                }
                log::info!(
                    "Mapper thread stopped after {} scans",
                    worker.mapper.len()
                );
                worker.mapper.into_graph()
            })?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish and take its graph.
    pub fn join(self) -> thread::Result<Graph> {
        self.handle.join()
    }
}

fn run_channel_loop<M: ScanMatcher>(
    worker: &mut MapperWorker<M>,
    rx: &Receiver<SensorMessage>,
    running: &AtomicBool,
) {
    while running.load(Ordering::Relaxed) {
        match rx.recv_timeout(RECV_POLL) {
            Ok(msg) => {
                worker.handle(msg);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("Sensor channel closed");
                break;
            }
        }
    }
}

fn run_bag_loop<M: ScanMatcher>(
    worker: &mut MapperWorker<M>,
    path: &Path,
    speed: f64,
    running: &AtomicBool,
) {
    let mut player = match BagPlayer::<SensorMessage>::open(path) {
        Ok(p) => p,
        Err(e) => {
            log::error!("Failed to open bag {}: {}", path.display(), e);
            return;
        }
    };
    player.set_speed(speed);
    log::info!(
        "Replaying {} ({} messages, {:.1}s) at speed {}",
        path.display(),
        player.message_count(),
        player.header().duration_secs(),
        speed
    );

    while running.load(Ordering::Relaxed) {
        match player.next() {
            Ok(Some(msg)) => {
                worker.handle(msg);
            }
            Ok(None) => {
                log::info!("Bag replay finished");
                break;
            }
            Err(e) => {
                log::error!("Bag replay failed: {}", e);
                break;
            }
        }
    }
}

/// Message handling shared by both loops.
pub struct MapperWorker<M: ScanMatcher> {
    mapper: Mapper<M>,
    shared_state: SharedStateHandle,
    latest_odom: Option<Pose2D>,
    dropped_without_odom: u64,
}

impl<M: ScanMatcher> MapperWorker<M> {
    pub fn new(mapper: Mapper<M>, shared_state: SharedStateHandle) -> Self {
        Self {
            mapper,
            shared_state,
            latest_odom: None,
            dropped_without_odom: 0,
        }
    }

    pub fn mapper(&self) -> &Mapper<M> {
        &self.mapper
    }

    /// Process one message; returns the mapper update for accepted sweeps.
    pub fn handle(&mut self, msg: SensorMessage) -> Option<MapperUpdate> {
        match msg {
            SensorMessage::Odometry(odom) => {
                self.latest_odom = Some(odom.data);
                None
            }
            SensorMessage::Laser(laser) => {
                let Some(odom) = self.latest_odom else {
                    self.dropped_without_odom += 1;
                    if self.dropped_without_odom == 1 {
                        log::warn!("Laser scan before any odometry, dropping");
                    }
                    return None;
                };
                let update = self.mapper.process(&odom, &laser.data)?;
                self.publish(&update);
                Some(update)
            }
        }
    }

    fn publish(&self, update: &MapperUpdate) {
        let graph = self.mapper.graph();
        let Some(scan) = graph.scan(update.scan_id) else {
            return;
        };
        let constraint = graph
            .odom_constraints()
            .last()
            .filter(|c| c.end == update.scan_id)
            .cloned();
        if let Err(e) = self
            .shared_state
            .append(scan.clone(), update.odom_pose, constraint)
        {
            log::error!("Shared history rejected scan {}: {}", update.scan_id, e);
        }
    }
}
