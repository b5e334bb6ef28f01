use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::AnalysisError;

/// Root-mean-square spread below which the screw cloud counts as a single
/// point, relative to the magnitude of its centroid.
const DEGENERATE_SPREAD: f64 = 1e-9;

/// Principal axis of a screw point cloud and the samples placed along it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrewAxis {
    /// Unit vector, sign fixed so that its largest component is positive.
    pub direction: Vector3<f64>,
    pub centroid: Point3<f64>,
    /// Extent of the cloud projected onto `direction`.
    pub length: f64,
    pub samples: Vec<Point3<f64>>,
}

/// Fits the screw axis and places `max(1, ceil(length))` evenly spaced samples
/// from the lowest to the highest projection of the cloud.
///
/// The direction is the dominant right singular vector of the centred
/// coordinate matrix, computed as the top eigenvector of its 3x3 scatter
/// matrix. Point order and mesh topology therefore do not matter.
pub fn extract_axis(points: &[Point3<f64>]) -> Result<ScrewAxis, AnalysisError> {
    if points.is_empty() {
        return Err(AnalysisError::TooFewPoints {
            cloud: "screw".to_string(),
            found: 0,
            required: 1,
        });
    }

    let n = points.len() as f64;
    let centroid = Point3::from(
        points
            .iter()
            .fold(Vector3::zeros(), |acc: Vector3<f64>, p| acc + p.coords)
            / n,
    );

    let mut scatter = Matrix3::zeros();
    for p in points {
        let d = p - centroid;
        scatter += d * d.transpose();
    }

    let eigen = scatter.symmetric_eigen();
    let dominant = eigen.eigenvalues.imax();
    let spread = (eigen.eigenvalues[dominant].max(0.0) / n).sqrt();
    if spread <= DEGENERATE_SPREAD * (1.0 + centroid.coords.norm()) {
        return Err(AnalysisError::DegenerateAxis { spread });
    }

    let mut direction: Vector3<f64> = eigen.eigenvectors.column(dominant).into_owned();
    direction.normalize_mut();
    // singular vectors carry no sign; pin it so sample order is reproducible
    if direction[direction.iamax()] < 0.0 {
        direction = -direction;
    }

    let (min_proj, max_proj) = points
        .iter()
        .map(|p| (p - centroid).dot(&direction))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        });

    let length = max_proj - min_proj;
    let n_samples = (length.ceil() as usize).max(1);
    let samples = linspace(min_proj, max_proj, n_samples)
        .into_iter()
        .map(|t| centroid + direction * t)
        .collect();

    Ok(ScrewAxis {
        direction,
        centroid,
        length,
        samples,
    })
}

/// `n` evenly spaced values from `start` to `stop` inclusive. A single value
/// sits at `start`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            values[n - 1] = stop;
            values
        }
    }
}
