//! Bone screw breach analysis.
//!
//! A screw mesh is reduced to its principal axis, probed sideways in the
//! horizontal plane at every unit of length, and the probes are matched to
//! the medial and lateral bone walls. The signed clearances along the screw
//! are summarized into the closest safe approach and the deepest breach per
//! wall.
pub mod config;
pub mod entry;
pub mod error;
pub mod io;
pub mod processing;
pub mod utils;
#[cfg(feature = "python")]
mod python_bind;

pub use config::{AnalysisConfig, NearestStrategy};
pub use entry::{analyze_batch, run_from_paths, BatchReport, RunOptions, ScrewOutcome};
pub use error::AnalysisError;
pub use processing::{analyze, analyze_with_config, AnalysisResult, FootSide, WallPair};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// This is the module importable from Python:
///
/// ```python
/// import screwcheck as sc
/// report = sc.analyze_files_py("medial.stl", "lateral.stl", "screws.zip", "out")
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn screwcheck(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use python_bind::{
        analyze_files_py, analyze_points_py, PyAnalysisResult, PyBatchReport, PyScrewOutcome,
    };

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(analyze_points_py, m)?)?;
    m.add_function(wrap_pyfunction!(analyze_files_py, m)?)?;

    m.add_class::<PyAnalysisResult>()?;
    m.add_class::<PyScrewOutcome>()?;
    m.add_class::<PyBatchReport>()?;
    Ok(())
}
