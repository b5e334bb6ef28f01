//! Nearest wall vertex search.
//!
//! The wall resolver only needs to know how far the closest vertex is and
//! whether it is within tolerance, so every backend must report the same
//! distance for the same query. Search order never leaks into results.
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::sync::Arc;

use crate::config::NearestStrategy;

/// Bucket size of `kiddo::KdTree`; the tree cannot split a bucket whose
/// points share one coordinate, so clouds with this many repeats stay linear.
const KDTREE_BUCKET: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    pub index: usize,
    pub distance: f64,
}

pub trait NearestPoint: Send + Sync {
    /// Closest vertex to `query`, `None` only for an empty cloud.
    fn nearest(&self, query: &Point3<f64>) -> Option<Nearest>;

    /// Closest vertex strictly closer than `max_distance`.
    fn nearest_within(&self, query: &Point3<f64>, max_distance: f64) -> Option<Nearest> {
        self.nearest(query).filter(|n| n.distance < max_distance)
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Linear scan over all vertices.
pub struct BruteForceIndex {
    points: Arc<[Point3<f64>]>,
}

impl BruteForceIndex {
    pub fn new(points: Arc<[Point3<f64>]>) -> Self {
        Self { points }
    }
}

impl NearestPoint for BruteForceIndex {
    fn nearest(&self, query: &Point3<f64>) -> Option<Nearest> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let d2 = (p - query).norm_squared();
            if best.map_or(true, |(_, b)| d2 < b) {
                best = Some((i, d2));
            }
        }
        best.map(|(index, d2)| Nearest {
            index,
            distance: d2.sqrt(),
        })
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

/// k-d tree over the wall vertices.
pub struct KdTreeIndex {
    points: Arc<[Point3<f64>]>,
    tree: KdTree<f64, 3>,
}

impl KdTreeIndex {
    /// Builds the tree, or `None` if the cloud repeats a coordinate value too
    /// often along one axis for the tree to split.
    pub fn try_new(points: Arc<[Point3<f64>]>) -> Option<Self> {
        if max_axis_repeats(&points) >= KDTREE_BUCKET {
            return None;
        }
        let mut tree: KdTree<f64, 3> = KdTree::new();
        for (i, p) in points.iter().enumerate() {
            tree.add(&[p.x, p.y, p.z], i as u64);
        }
        Some(Self { points, tree })
    }
}

impl NearestPoint for KdTreeIndex {
    fn nearest(&self, query: &Point3<f64>) -> Option<Nearest> {
        if self.points.is_empty() {
            return None;
        }
        let found = self
            .tree
            .nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        let index = found.item as usize;
        // recompute like the linear scan so both backends agree to the bit
        let distance = (self.points[index] - query).norm_squared().sqrt();
        Some(Nearest { index, distance })
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

/// Largest number of vertices sharing the same value on any single axis.
pub fn max_axis_repeats(points: &[Point3<f64>]) -> usize {
    let mut worst = 0;
    for axis in 0..3 {
        let mut values: Vec<f64> = points.iter().map(|p| p[axis]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let mut run = 0;
        let mut previous: Option<f64> = None;
        for v in values {
            if previous == Some(v) {
                run += 1;
            } else {
                run = 1;
                previous = Some(v);
            }
            worst = worst.max(run);
        }
    }
    worst
}

/// Builds the index for one wall according to `strategy`.
pub fn build_index(
    points: Arc<[Point3<f64>]>,
    strategy: NearestStrategy,
) -> Box<dyn NearestPoint> {
    match strategy {
        NearestStrategy::BruteForce => Box::new(BruteForceIndex::new(points)),
        NearestStrategy::KdTree => {
            let repeats = max_axis_repeats(&points);
            match KdTreeIndex::try_new(points.clone()) {
                Some(index) => Box::new(index),
                None => {
                    tracing::warn!(
                        vertices = points.len(),
                        repeats,
                        "wall repeats coordinates too often for a k-d tree, using linear search"
                    );
                    Box::new(BruteForceIndex::new(points))
                }
            }
        }
    }
}
