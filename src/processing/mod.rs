pub mod axis;
pub mod laterality;
pub mod nearest;
pub mod probe;
pub mod process_screw;
pub mod summary;
pub mod walls;

use nalgebra::Point3;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

pub use laterality::FootSide;
pub use process_screw::{analyze_screw, AnalysisResult};
pub use walls::{WallKind, WallPair};

/// Minimum number of vertices for any mesh handed to the analysis.
pub const MIN_CLOUD_POINTS: usize = 3;

/// Rejects clouds with fewer than three points or with NaN/infinite
/// coordinates before any geometry is computed on them.
pub fn validate_cloud(cloud: &str, points: &[Point3<f64>]) -> Result<(), AnalysisError> {
    if points.len() < MIN_CLOUD_POINTS {
        return Err(AnalysisError::TooFewPoints {
            cloud: cloud.to_string(),
            found: points.len(),
            required: MIN_CLOUD_POINTS,
        });
    }
    if let Some(index) = points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    {
        return Err(AnalysisError::NonFiniteCoordinate {
            cloud: cloud.to_string(),
            index,
        });
    }
    Ok(())
}

/// Analyzes one screw against a medial and a lateral wall with the default
/// configuration.
///
/// ```
/// use screwcheck::utils::synthetic::{plane_wall_x, screw_along_y};
///
/// let medial = plane_wall_x(0.0, (-10.0, 70.0), (-5.0, 5.0), 1.0);
/// let lateral = plane_wall_x(20.0, (-10.0, 70.0), (-5.0, 5.0), 1.0);
/// let screw = screw_along_y(10.0, 0.0, 50.5);
///
/// let result = screwcheck::analyze(&medial, &lateral, &screw).unwrap();
/// assert_eq!(result.axis_points.len(), result.signed_medial.len());
/// assert!(result.medial_longest_negative.is_none());
/// ```
pub fn analyze(
    medial: &[Point3<f64>],
    lateral: &[Point3<f64>],
    screw: &[Point3<f64>],
) -> Result<AnalysisResult, AnalysisError> {
    analyze_with_config(medial, lateral, screw, &AnalysisConfig::default())
}

pub fn analyze_with_config(
    medial: &[Point3<f64>],
    lateral: &[Point3<f64>],
    screw: &[Point3<f64>],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;
    validate_cloud("medial", medial)?;
    validate_cloud("lateral", lateral)?;
    validate_cloud("screw", screw)?;

    let walls = WallPair::new(medial.to_vec(), lateral.to_vec(), config)?;
    analyze_screw(&walls, screw, config)
}

#[cfg(test)]
mod processing_tests {
    use super::*;
    use crate::utils::synthetic::{plane_wall_x, screw_along_y};

    #[test]
    fn test_validate_cloud() {
        let ok = vec![Point3::origin(); 3];
        assert!(validate_cloud("screw", &ok).is_ok());

        let short = vec![Point3::origin(); 2];
        assert!(matches!(
            validate_cloud("screw", &short),
            Err(AnalysisError::TooFewPoints { found: 2, required: 3, .. })
        ));

        let nan = vec![Point3::origin(), Point3::new(f64::NAN, 0.0, 0.0), Point3::origin()];
        assert_eq!(
            validate_cloud("medial", &nan),
            Err(AnalysisError::NonFiniteCoordinate {
                cloud: "medial".to_string(),
                index: 1
            })
        );
    }

    #[test]
    fn test_invalid_wall_fails_before_axis() {
        let screw = vec![Point3::new(1.0, 1.0, 1.0); 5];
        let lateral = plane_wall_x(20.0, (0.0, 5.0), (0.0, 5.0), 1.0);
        // the screw is degenerate too, but the empty wall is reported first
        let err = analyze(&[], &lateral, &screw).unwrap_err();
        assert!(matches!(err, AnalysisError::TooFewPoints { found: 0, .. }));
    }

    #[test]
    fn test_analyze_is_repeatable() {
        let medial = plane_wall_x(0.0, (-10.0, 70.0), (-5.0, 5.0), 1.0);
        let lateral = plane_wall_x(20.0, (-10.0, 70.0), (-5.0, 5.0), 1.0);
        let screw = screw_along_y(12.0, 0.0, 45.5);

        let first = analyze(&medial, &lateral, &screw).unwrap();
        let second = analyze(&medial, &lateral, &screw).unwrap();
        assert_eq!(first, second);
    }
}
