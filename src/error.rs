use thiserror::Error;

/// Failures of the screw analysis core.
///
/// A wall that is simply out of reach of the probes is not an error; it shows
/// up as `None` in the signed clearance sequences instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("{cloud} point cloud has {found} points, at least {required} are required")]
    TooFewPoints {
        cloud: String,
        found: usize,
        required: usize,
    },

    #[error("{cloud} point cloud has a non-finite coordinate at vertex {index}")]
    NonFiniteCoordinate { cloud: String, index: usize },

    /// All screw vertices coincide, there is no dominant direction.
    #[error("screw point cloud has no dominant direction (spread {spread:e})")]
    DegenerateAxis { spread: f64 },

    /// The screw axis has no horizontal component, so no probe direction can
    /// be built in the XY plane.
    #[error("screw axis is vertical, cannot build a probe direction in the XY plane")]
    VerticalAxis,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
