//! Scan graph: the scans at corrected poses and the constraints between them.

use std::collections::HashMap;

use kiddo::{KdTree, SquaredEuclidean};
use thiserror::Error;

use super::constraint::{Constraint, ConstraintKind};
use super::markers::{Color, Marker, MarkerArray};
use crate::core::types::{Point2D, Scan};

/// Errors from graph mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Constraint endpoint does not index a scan.
    #[error("constraint references scan {index}, graph has {len} scans")]
    UnknownScan { index: usize, len: usize },

    /// Scan id does not match its position in acquisition order.
    #[error("scan id {found} added at position {expected}")]
    ScanOutOfOrder { expected: usize, found: usize },
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

const NODE_SCALE: f64 = 0.1;
const EDGE_SCALE: f64 = 0.1;

/// Scans in acquisition order plus odometry and loop constraints.
///
/// Scan ids equal their index. Constraints are only accepted when both
/// endpoints exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    scans: Vec<Scan>,
    odom_constraints: Vec<Constraint>,
    loop_constraints: Vec<Constraint>,
    use_barycenter: bool,
}

impl Graph {
    /// Create an empty graph.
    ///
    /// With `use_barycenter`, nearest-scan queries compare scan centroids
    /// instead of scan poses.
    pub fn new(use_barycenter: bool) -> Self {
        Self {
            use_barycenter,
            ..Self::default()
        }
    }

    /// Whether nearest-scan queries use barycenters.
    pub fn use_barycenter(&self) -> bool {
        self.use_barycenter
    }

    pub fn set_use_barycenter(&mut self, use_barycenter: bool) {
        self.use_barycenter = use_barycenter;
    }

    /// Append a scan; its id must equal the current scan count.
    pub fn add_scan(&mut self, scan: Scan) -> Result<usize> {
        let expected = self.scans.len();
        if scan.id != expected {
            return Err(GraphError::ScanOutOfOrder {
                expected,
                found: scan.id,
            });
        }
        self.scans.push(scan);
        Ok(expected)
    }

    /// Append a constraint to the list for `kind`.
    pub fn add_constraint(&mut self, kind: ConstraintKind, constraint: Constraint) -> Result<()> {
        let len = self.scans.len();
        for index in [constraint.begin, constraint.end] {
            if index >= len {
                return Err(GraphError::UnknownScan { index, len });
            }
        }
        match kind {
            ConstraintKind::Odometry => self.odom_constraints.push(constraint),
            ConstraintKind::Loop => self.loop_constraints.push(constraint),
        }
        Ok(())
    }

    /// Append an odometry constraint.
    pub fn add_odom_constraint(&mut self, constraint: Constraint) -> Result<()> {
        self.add_constraint(ConstraintKind::Odometry, constraint)
    }

    /// Append a loop constraint.
    pub fn add_loop_constraint(&mut self, constraint: Constraint) -> Result<()> {
        self.add_constraint(ConstraintKind::Loop, constraint)
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub fn scan(&self, index: usize) -> Option<&Scan> {
        self.scans.get(index)
    }

    pub fn last_scan(&self) -> Option<&Scan> {
        self.scans.last()
    }

    pub fn odom_constraints(&self) -> &[Constraint] {
        &self.odom_constraints
    }

    pub fn loop_constraints(&self) -> &[Constraint] {
        &self.loop_constraints
    }

    /// Number of scans.
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// Check if the graph has no scans.
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Remove all scans and constraints.
    pub fn clear(&mut self) {
        self.scans.clear();
        self.odom_constraints.clear();
        self.loop_constraints.clear();
    }

    fn query_position(&self, scan: &Scan) -> Point2D {
        if self.use_barycenter {
            scan.barycenter_pose().position()
        } else {
            scan.pose.position()
        }
    }

    /// Indices of scans within `dist` of `scan`, nearest first.
    ///
    /// With `limit`, only scans with index below it are considered. Ties in
    /// distance are broken by index.
    pub fn find_nearest(&self, scan: &Scan, dist: f64, limit: Option<usize>) -> Vec<usize> {
        let count = limit.map_or(self.scans.len(), |l| l.min(self.scans.len()));
        if count == 0 || !(dist >= 0.0) {
            return Vec::new();
        }

        // Identical positions share one tree entry; the k-d tree's buckets
        // cannot hold an unbounded number of equal coordinates.
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_position: HashMap<(u64, u64), usize> = HashMap::new();
        let mut tree: KdTree<f64, 2> = KdTree::new();
        for (index, candidate) in self.scans[..count].iter().enumerate() {
            let p = self.query_position(candidate);
            if !p.is_finite() {
                continue;
            }
            let key = (p.x.to_bits(), p.y.to_bits());
            let group = *by_position.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                let group = groups.len() - 1;
                tree.add(&[p.x, p.y], group as u64);
                group
            });
            groups[group].push(index);
        }

        let q = self.query_position(scan);
        let mut hits: Vec<(f64, usize)> = tree
            .within::<SquaredEuclidean>(&[q.x, q.y], dist * dist)
            .iter()
            .flat_map(|nn| {
                groups[nn.item as usize]
                    .iter()
                    .map(move |&index| (nn.distance, index))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.into_iter().map(|(_, index)| index).collect()
    }

    /// Nodes as red spheres, odometry edges in blue and loop edges in green.
    ///
    /// Node ids are scan ids; edge ids count up across both edge lists.
    pub fn markers(&self) -> MarkerArray {
        let mut markers = Vec::with_capacity(
            self.scans.len() + self.odom_constraints.len() + self.loop_constraints.len(),
        );

        for scan in &self.scans {
            markers.push(Marker::sphere(
                "nodes",
                scan.id,
                scan.pose.position(),
                NODE_SCALE,
                Color::RED,
            ));
        }

        let edges = self
            .odom_constraints
            .iter()
            .map(|c| (c, Color::BLUE))
            .chain(self.loop_constraints.iter().map(|c| (c, Color::GREEN)));
        for (id, (constraint, color)) in edges.enumerate() {
            let (Some(begin), Some(end)) = (self.scan(constraint.begin), self.scan(constraint.end))
            else {
                continue;
            };
            markers.push(Marker::line(
                "edges",
                id,
                begin.pose.position(),
                end.pose.position(),
                EDGE_SCALE,
                color,
            ));
        }

        MarkerArray { markers }
    }
}
