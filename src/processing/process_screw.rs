use nalgebra::{Point3, Vector3};
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::processing::axis::extract_axis;
use crate::processing::laterality::FootSide;
use crate::processing::probe::ProbeRay;
use crate::processing::summary::summarize;
use crate::processing::validate_cloud;
use crate::processing::walls::WallPair;

/// Everything measured for one screw against one wall pair.
///
/// All per-sample sequences have the same length as `axis_points`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub foot_side: FootSide,
    pub screw_points: Vec<Point3<f64>>,
    pub medial_vertices: Arc<[Point3<f64>]>,
    pub lateral_vertices: Arc<[Point3<f64>]>,
    pub axis_direction: Vector3<f64>,
    pub axis_points: Vec<Point3<f64>>,
    pub signed_medial: Vec<Option<f64>>,
    pub signed_lateral: Vec<Option<f64>>,
    /// Probe points that found the walls, only meant for plotting.
    pub medial_hit: Vec<Option<Point3<f64>>>,
    pub lateral_hit: Vec<Option<Point3<f64>>>,
    pub medial_shortest_positive: Option<f64>,
    pub medial_longest_negative: Option<f64>,
    pub lateral_shortest_positive: Option<f64>,
    pub lateral_longest_negative: Option<f64>,
}

impl AnalysisResult {
    pub fn has_medial_breach(&self) -> bool {
        self.medial_longest_negative.is_some()
    }

    pub fn has_lateral_breach(&self) -> bool {
        self.lateral_longest_negative.is_some()
    }
}

/// Runs axis extraction, probing and summary for one screw.
pub fn analyze_screw(
    walls: &WallPair,
    screw_points: &[Point3<f64>],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;
    validate_cloud("screw", screw_points)?;

    let axis = extract_axis(screw_points)?;
    let ray = ProbeRay::new(&axis.direction, config.probe_span, config.probe_samples)?;

    let n = axis.samples.len();
    let mut signed_medial = vec![None; n];
    let mut signed_lateral = vec![None; n];
    let mut medial_hit = vec![None; n];
    let mut lateral_hit = vec![None; n];

    for (i, sample) in axis.samples.iter().enumerate() {
        if let Some(hit) = walls
            .medial
            .probe(sample, &ray, config.hit_tolerance, walls.foot_side)
        {
            medial_hit[i] = Some(hit.point);
            signed_medial[i] = Some(hit.signed_distance);
        }
        if let Some(hit) = walls
            .lateral
            .probe(sample, &ray, config.hit_tolerance, walls.foot_side)
        {
            lateral_hit[i] = Some(hit.point);
            signed_lateral[i] = Some(hit.signed_distance);
        }
    }

    let medial = summarize(&signed_medial, config.skip_samples);
    let lateral = summarize(&signed_lateral, config.skip_samples);

    tracing::debug!(
        samples = n,
        length = axis.length,
        medial_hits = medial_hit.iter().flatten().count(),
        lateral_hits = lateral_hit.iter().flatten().count(),
        medial_breach = medial.has_breach(),
        lateral_breach = lateral.has_breach(),
        "analyzed screw"
    );

    Ok(AnalysisResult {
        foot_side: walls.foot_side,
        screw_points: screw_points.to_vec(),
        medial_vertices: walls.medial.vertices.clone(),
        lateral_vertices: walls.lateral.vertices.clone(),
        axis_direction: axis.direction,
        axis_points: axis.samples,
        signed_medial,
        signed_lateral,
        medial_hit,
        lateral_hit,
        medial_shortest_positive: medial.shortest_positive,
        medial_longest_negative: medial.longest_negative,
        lateral_shortest_positive: lateral.shortest_positive,
        lateral_longest_negative: lateral.longest_negative,
    })
}
