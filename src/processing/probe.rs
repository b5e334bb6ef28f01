use nalgebra::{Point3, Vector3};

use crate::error::AnalysisError;
use crate::processing::axis::linspace;

/// Shortest XY projection of the axis still treated as non-vertical.
const VERTICAL_TOLERANCE: f64 = 1e-12;

/// Probe line shared by every axis sample of one screw: a horizontal
/// direction perpendicular to the axis and the signed offsets along it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRay {
    pub direction: Vector3<f64>,
    pub offsets: Vec<f64>,
}

impl ProbeRay {
    pub fn new(
        axis_direction: &Vector3<f64>,
        span: f64,
        samples: usize,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            direction: perpendicular_xy(axis_direction)?,
            offsets: linspace(-span, span, samples),
        })
    }

    /// Probe points around `origin`, ordered from `-span` to `+span`.
    pub fn points<'a>(&'a self, origin: &'a Point3<f64>) -> impl Iterator<Item = Point3<f64>> + 'a {
        self.offsets
            .iter()
            .map(move |&s| origin + self.direction * s)
    }
}

/// Rotates the axis' XY projection by 90 degrees and drops z.
pub fn perpendicular_xy(axis_direction: &Vector3<f64>) -> Result<Vector3<f64>, AnalysisError> {
    let perp = Vector3::new(-axis_direction.y, axis_direction.x, 0.0);
    let norm = perp.norm();
    if norm <= VERTICAL_TOLERANCE {
        return Err(AnalysisError::VerticalAxis);
    }
    Ok(perp / norm)
}
