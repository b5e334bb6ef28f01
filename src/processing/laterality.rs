use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalysisError;

/// Anatomical side of the foot the walls belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FootSide {
    Left,
    Right,
}

impl FootSide {
    pub fn is_left(self) -> bool {
        self == FootSide::Left
    }

    pub fn label(self) -> &'static str {
        match self {
            FootSide::Left => "Left Calcaneus",
            FootSide::Right => "Right Calcaneus",
        }
    }
}

impl fmt::Display for FootSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Left foot when the medial wall lies at larger mean x than the lateral wall.
///
/// This is a global heuristic on the wall pair, it does not look at any screw.
pub fn detect_foot_side(
    medial: &[Point3<f64>],
    lateral: &[Point3<f64>],
) -> Result<FootSide, AnalysisError> {
    let medial_x = mean_x(medial, "medial")?;
    let lateral_x = mean_x(lateral, "lateral")?;

    if medial_x > lateral_x {
        Ok(FootSide::Left)
    } else {
        Ok(FootSide::Right)
    }
}

fn mean_x(points: &[Point3<f64>], cloud: &str) -> Result<f64, AnalysisError> {
    if points.is_empty() {
        return Err(AnalysisError::TooFewPoints {
            cloud: cloud.to_string(),
            found: 0,
            required: 1,
        });
    }
    let sum: f64 = points.iter().map(|p| p.x).sum();
    Ok(sum / points.len() as f64)
}

#[cfg(test)]
mod laterality_tests {
    use super::*;

    fn cloud_at_x(x: f64) -> Vec<Point3<f64>> {
        (0..5).map(|i| Point3::new(x, i as f64, -(i as f64))).collect()
    }

    #[test]
    fn test_medial_right_of_lateral_is_left_foot() {
        let side = detect_foot_side(&cloud_at_x(20.0), &cloud_at_x(0.0)).unwrap();
        assert_eq!(side, FootSide::Left);
        assert_eq!(side.label(), "Left Calcaneus");
    }

    #[test]
    fn test_swapping_walls_flips_side() {
        let a = cloud_at_x(-3.0);
        let b = cloud_at_x(7.5);
        let forward = detect_foot_side(&a, &b).unwrap();
        let swapped = detect_foot_side(&b, &a).unwrap();
        assert_eq!(forward, FootSide::Right);
        assert_eq!(swapped, FootSide::Left);
    }

    #[test]
    fn test_equal_means_fall_back_to_right() {
        let side = detect_foot_side(&cloud_at_x(1.0), &cloud_at_x(1.0)).unwrap();
        assert_eq!(side, FootSide::Right);
    }

    #[test]
    fn test_empty_cloud_is_an_error() {
        let err = detect_foot_side(&[], &cloud_at_x(0.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::TooFewPoints { found: 0, .. }));
    }
}
