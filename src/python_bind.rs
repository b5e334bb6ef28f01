// File: src/python_bind.rs
use nalgebra::Point3;
use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::entry::{run_from_paths, BatchReport, RunOptions, ScrewOutcome};
use crate::processing::{analyze_with_config, AnalysisResult};

fn to_tuple(p: &Point3<f64>) -> (f64, f64, f64) {
    (p.x, p.y, p.z)
}

fn to_points(points: Vec<(f64, f64, f64)>) -> Vec<Point3<f64>> {
    points.into_iter().map(|(x, y, z)| Point3::new(x, y, z)).collect()
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyAnalysisResult {
    #[pyo3(get)]
    pub foot_side: String,
    #[pyo3(get)]
    pub is_left: bool,
    #[pyo3(get)]
    pub axis_points: Vec<(f64, f64, f64)>,
    #[pyo3(get)]
    pub signed_medial: Vec<Option<f64>>,
    #[pyo3(get)]
    pub signed_lateral: Vec<Option<f64>>,
    #[pyo3(get)]
    pub medial_hit: Vec<Option<(f64, f64, f64)>>,
    #[pyo3(get)]
    pub lateral_hit: Vec<Option<(f64, f64, f64)>>,
    #[pyo3(get)]
    pub medial_shortest_positive: Option<f64>,
    #[pyo3(get)]
    pub medial_longest_negative: Option<f64>,
    #[pyo3(get)]
    pub lateral_shortest_positive: Option<f64>,
    #[pyo3(get)]
    pub lateral_longest_negative: Option<f64>,
}

#[pymethods]
impl PyAnalysisResult {
    fn has_medial_breach(&self) -> bool {
        self.medial_longest_negative.is_some()
    }

    fn has_lateral_breach(&self) -> bool {
        self.lateral_longest_negative.is_some()
    }

    fn __repr__(&self) -> String {
        let fmt = |v: Option<f64>| v.map_or("None".to_string(), |v| format!("{:.2}", v));
        format!(
            "AnalysisResult(side={}, samples={}, medial=({}, {}), lateral=({}, {}))",
            self.foot_side,
            self.axis_points.len(),
            fmt(self.medial_shortest_positive),
            fmt(self.medial_longest_negative),
            fmt(self.lateral_shortest_positive),
            fmt(self.lateral_longest_negative),
        )
    }
}

impl From<&AnalysisResult> for PyAnalysisResult {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            foot_side: result.foot_side.label().to_string(),
            is_left: result.foot_side.is_left(),
            axis_points: result.axis_points.iter().map(to_tuple).collect(),
            signed_medial: result.signed_medial.clone(),
            signed_lateral: result.signed_lateral.clone(),
            medial_hit: result.medial_hit.iter().map(|h| h.as_ref().map(to_tuple)).collect(),
            lateral_hit: result.lateral_hit.iter().map(|h| h.as_ref().map(to_tuple)).collect(),
            medial_shortest_positive: result.medial_shortest_positive,
            medial_longest_negative: result.medial_longest_negative,
            lateral_shortest_positive: result.lateral_shortest_positive,
            lateral_longest_negative: result.lateral_longest_negative,
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyScrewOutcome {
    #[pyo3(get)]
    pub screw_number: usize,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub result: Option<PyAnalysisResult>,
    #[pyo3(get)]
    pub error: Option<String>,
}

impl From<&ScrewOutcome> for PyScrewOutcome {
    fn from(outcome: &ScrewOutcome) -> Self {
        let (result, error) = match &outcome.result {
            Ok(r) => (Some(PyAnalysisResult::from(r)), None),
            Err(e) => (None, Some(e.clone())),
        };
        Self {
            screw_number: outcome.screw_number,
            name: outcome.name.clone(),
            result,
            error,
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyBatchReport {
    #[pyo3(get)]
    pub foot_side: String,
    #[pyo3(get)]
    pub outcomes: Vec<PyScrewOutcome>,
    #[pyo3(get)]
    pub medial_breaches: usize,
    #[pyo3(get)]
    pub lateral_breaches: usize,
}

#[pymethods]
impl PyBatchReport {
    fn __repr__(&self) -> String {
        format!(
            "BatchReport(side={}, screws={}, medial_breaches={}, lateral_breaches={})",
            self.foot_side,
            self.outcomes.len(),
            self.medial_breaches,
            self.lateral_breaches
        )
    }
}

impl From<&BatchReport> for PyBatchReport {
    fn from(report: &BatchReport) -> Self {
        Self {
            foot_side: report.foot_side.label().to_string(),
            outcomes: report.outcomes.iter().map(PyScrewOutcome::from).collect(),
            medial_breaches: report.medial_breaches(),
            lateral_breaches: report.lateral_breaches(),
        }
    }
}

fn load_config(config_path: Option<&str>) -> PyResult<AnalysisConfig> {
    match config_path {
        Some(path) => AnalysisConfig::from_file(path)
            .map_err(|e| PyRuntimeError::new_err(format!("{:#}", e))),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Analyzes one screw given as lists of `(x, y, z)` tuples.
#[pyfunction]
#[pyo3(signature = (medial, lateral, screw, config_path = None))]
pub fn analyze_points_py(
    medial: Vec<(f64, f64, f64)>,
    lateral: Vec<(f64, f64, f64)>,
    screw: Vec<(f64, f64, f64)>,
    config_path: Option<&str>,
) -> PyResult<PyAnalysisResult> {
    let config = load_config(config_path)?;
    let result = analyze_with_config(
        &to_points(medial),
        &to_points(lateral),
        &to_points(screw),
        &config,
    )
    .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok((&result).into())
}

/// Analyzes a ZIP archive or directory of screw STLs against two wall STLs.
#[pyfunction]
#[pyo3(signature = (medial_path, lateral_path, screws_path, output_dir = None, config_path = None))]
pub fn analyze_files_py(
    medial_path: &str,
    lateral_path: &str,
    screws_path: &str,
    output_dir: Option<&str>,
    config_path: Option<&str>,
) -> PyResult<PyBatchReport> {
    let config = load_config(config_path)?;
    let options = RunOptions {
        output_dir: output_dir.map(PathBuf::from),
        ..RunOptions::default()
    };
    let report = run_from_paths(
        Path::new(medial_path),
        Path::new(lateral_path),
        Path::new(screws_path),
        &options,
        &config,
    )
    .map_err(|e| PyRuntimeError::new_err(format!("{:#}", e)))?;
    Ok((&report).into())
}
