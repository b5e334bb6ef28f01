use nalgebra::Point3;
use std::fmt;
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::processing::laterality::{detect_foot_side, FootSide};
use crate::processing::nearest::{build_index, NearestPoint};
use crate::processing::probe::ProbeRay;
use crate::processing::validate_cloud;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WallKind {
    Medial,
    Lateral,
}

impl fmt::Display for WallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                WallKind::Medial => "medial",
                WallKind::Lateral => "lateral",
            }
        )
    }
}

/// Where a probe line met a wall at one axis sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    /// Probe point closest to the wall, not the wall vertex itself.
    pub point: Point3<f64>,
    /// Distance from that probe point to the nearest wall vertex.
    pub wall_distance: f64,
    pub signed_distance: f64,
}

/// Signed clearance along x between the screw axis and a wall hit.
///
/// Positive means the axis is still inside the bone with respect to this
/// wall, negative means it has crossed it. The convention mirrors between the
/// two walls and between the two feet.
pub fn signed_clearance(kind: WallKind, side: FootSide, axis_x: f64, hit_x: f64) -> f64 {
    match (kind, side) {
        (WallKind::Medial, FootSide::Left) => hit_x - axis_x,
        (WallKind::Medial, FootSide::Right) => axis_x - hit_x,
        (WallKind::Lateral, FootSide::Left) => axis_x - hit_x,
        (WallKind::Lateral, FootSide::Right) => hit_x - axis_x,
    }
}

/// One bone wall with its search index, shared read-only by all screws.
pub struct Wall {
    pub kind: WallKind,
    pub vertices: Arc<[Point3<f64>]>,
    index: Box<dyn NearestPoint>,
}

impl fmt::Debug for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wall")
            .field("kind", &self.kind)
            .field("vertices", &self.vertices.len())
            .finish()
    }
}

impl Wall {
    pub fn new(
        kind: WallKind,
        vertices: Vec<Point3<f64>>,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        validate_cloud(&kind.to_string(), &vertices)?;
        let vertices: Arc<[Point3<f64>]> = vertices.into();
        let index = build_index(vertices.clone(), config.nearest);
        Ok(Self {
            kind,
            vertices,
            index,
        })
    }

    /// Probes the wall from one axis sample.
    ///
    /// Among all probe points, the one closest to any wall vertex wins (the
    /// first one on ties). It only counts if that distance is strictly below
    /// `tolerance`.
    pub fn probe(
        &self,
        sample: &Point3<f64>,
        ray: &ProbeRay,
        tolerance: f64,
        side: FootSide,
    ) -> Option<WallHit> {
        let mut best: Option<(Point3<f64>, f64)> = None;
        for point in ray.points(sample) {
            if let Some(nearest) = self.index.nearest_within(&point, tolerance) {
                if best.map_or(true, |(_, d)| nearest.distance < d) {
                    best = Some((point, nearest.distance));
                }
            }
        }

        best.map(|(point, wall_distance)| WallHit {
            point,
            wall_distance,
            signed_distance: signed_clearance(self.kind, side, sample.x, point.x),
        })
    }
}

/// Medial and lateral wall of one bone plus the foot side they imply.
#[derive(Debug)]
pub struct WallPair {
    pub medial: Wall,
    pub lateral: Wall,
    pub foot_side: FootSide,
}

impl WallPair {
    pub fn new(
        medial: Vec<Point3<f64>>,
        lateral: Vec<Point3<f64>>,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let foot_side = detect_foot_side(&medial, &lateral)?;
        let medial = Wall::new(WallKind::Medial, medial, config)?;
        let lateral = Wall::new(WallKind::Lateral, lateral, config)?;

        tracing::info!(
            medial_vertices = medial.vertices.len(),
            lateral_vertices = lateral.vertices.len(),
            foot_side = %foot_side,
            "prepared wall pair"
        );

        Ok(Self {
            medial,
            lateral,
            foot_side,
        })
    }
}
