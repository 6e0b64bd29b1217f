//! Scan graph persistence on top of the bag container.
//!
//! A graph file is a bag of [`GraphRecord`]s: every scan in index order,
//! then the odometry constraints, then the loop constraints.

use std::path::Path;

use thiserror::Error;

use super::bag::{BagError, BagInfo, BagPlayer, BagRecorder, GraphRecord};
use crate::engine::graph::{Graph, GraphError};

/// Error type for graph save and load.
#[derive(Debug, Error)]
pub enum GraphStoreError {
    /// Container-level failure
    #[error(transparent)]
    Bag(#[from] BagError),

    /// Records do not form a valid graph
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    /// Record out of place in the stream
    #[error("unexpected {record} record at position {position}")]
    UnexpectedRecord {
        record: &'static str,
        position: u64,
    },
}

pub type Result<T> = std::result::Result<T, GraphStoreError>;

/// Write `graph` to `path`.
pub fn save(graph: &Graph, path: impl AsRef<Path>) -> Result<BagInfo> {
    let mut recorder = BagRecorder::create(path)?;
    for scan in graph.scans() {
        recorder.record(&GraphRecord::Scan(scan.clone()))?;
    }
    for constraint in graph.odom_constraints() {
        recorder.record(&GraphRecord::OdomConstraint(constraint.clone()))?;
    }
    for constraint in graph.loop_constraints() {
        recorder.record(&GraphRecord::LoopConstraint(constraint.clone()))?;
    }
    let info = recorder.finish()?;
    log::info!(
        "Saved graph with {} scans and {} constraints to {}",
        graph.len(),
        graph.odom_constraints().len() + graph.loop_constraints().len(),
        info.path.display()
    );
    Ok(info)
}

/// Read a graph written by [`save`].
///
/// Scan ids must run 0..n and every constraint must reference loaded
/// scans. Nearest-scan queries on the result use scan poses.
pub fn load(path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let mut player = BagPlayer::<GraphRecord>::open(path)?;
    let mut graph = Graph::new(false);
    let mut seen_constraint = false;

    while let Some(record) = player.next_immediate()? {
        match record {
            GraphRecord::Scan(scan) => {
                if seen_constraint {
                    return Err(GraphStoreError::UnexpectedRecord {
                        record: "scan",
                        position: player.messages_read() - 1,
                    });
                }
                graph.add_scan(scan)?;
            }
            GraphRecord::OdomConstraint(constraint) => {
                seen_constraint = true;
                graph.add_odom_constraint(constraint)?;
            }
            GraphRecord::LoopConstraint(constraint) => {
                seen_constraint = true;
                graph.add_loop_constraint(constraint)?;
            }
        }
    }

    if player.messages_read() != player.message_count() {
        log::warn!(
            "Graph file {} declares {} records, read {}",
            path.display(),
            player.message_count(),
            player.messages_read()
        );
    }
    log::info!("Loaded graph with {} scans from {}", graph.len(), path.display());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point2D, Pose2D, Scan};
    use crate::engine::graph::Constraint;
    use tempfile::TempDir;

    fn scan(id: usize, x: f64) -> Scan {
        Scan::new(id, Pose2D::new(x, 0.0, 0.1), vec![Point2D::new(1.0, 0.5)])
    }

    #[test]
    fn test_empty_graph() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.graph");

        let info = save(&Graph::new(false), &path).unwrap();
        assert_eq!(info.message_count, 0);
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_constraint_before_scan_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.graph");
        let a = scan(0, 0.0);
        let b = scan(1, 1.0);

        let mut recorder = BagRecorder::create(&path).unwrap();
        recorder
            .record(&GraphRecord::OdomConstraint(Constraint::between(&a, &b, None)))
            .unwrap();
        recorder.finish().unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            GraphStoreError::Graph(GraphError::UnknownScan { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_scan_after_constraint_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("interleaved.graph");
        let a = scan(0, 0.0);
        let b = scan(1, 1.0);

        let mut recorder = BagRecorder::create(&path).unwrap();
        recorder.record(&GraphRecord::Scan(a.clone())).unwrap();
        recorder
            .record(&GraphRecord::LoopConstraint(Constraint::between(&a, &a, None)))
            .unwrap();
        recorder.record(&GraphRecord::Scan(b)).unwrap();
        recorder.finish().unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            GraphStoreError::UnexpectedRecord { record: "scan", position: 2 }
        ));
    }

    #[test]
    fn test_sensor_bag_is_not_a_graph() {
        use crate::core::types::Timestamped;
        use crate::io::bag::SensorMessage;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("drive.bag");
        let mut recorder = BagRecorder::create(&path).unwrap();
        recorder
            .record(&SensorMessage::Odometry(Timestamped::new(Pose2D::identity(), 0)))
            .unwrap();
        recorder.finish().unwrap();

        assert!(matches!(
            load(&path),
            Err(GraphStoreError::Bag(BagError::InvalidFormat(_)))
        ));
    }
}
