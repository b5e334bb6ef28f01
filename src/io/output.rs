use anyhow::Context;
use csv::Writer;
use nalgebra::Point3;
use serde::Serialize;
use std::path::Path;

use crate::entry::BatchReport;
use crate::processing::AnalysisResult;

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    screw_number: usize,
    name: &'a str,
    status: &'a str,
    foot_side: &'a str,
    medial_shortest_positive: Option<f64>,
    medial_longest_negative: Option<f64>,
    lateral_shortest_positive: Option<f64>,
    lateral_longest_negative: Option<f64>,
    medial_breach: Option<bool>,
    lateral_breach: Option<bool>,
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ProfileRow {
    index: usize,
    axis_x: f64,
    axis_y: f64,
    axis_z: f64,
    signed_medial: Option<f64>,
    signed_lateral: Option<f64>,
    medial_hit_x: Option<f64>,
    medial_hit_y: Option<f64>,
    medial_hit_z: Option<f64>,
    lateral_hit_x: Option<f64>,
    lateral_hit_y: Option<f64>,
    lateral_hit_z: Option<f64>,
}

/// One row per screw with the four summary values. Undefined values and the
/// breach flags of failed screws are left empty.
pub fn write_summary_csv<P: AsRef<Path>>(path: P, report: &BatchReport) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("failed to create summary {}", path.display()))?;

    for outcome in &report.outcomes {
        let row = match &outcome.result {
            Ok(r) => SummaryRow {
                screw_number: outcome.screw_number,
                name: &outcome.name,
                status: "ok",
                foot_side: r.foot_side.label(),
                medial_shortest_positive: r.medial_shortest_positive,
                medial_longest_negative: r.medial_longest_negative,
                lateral_shortest_positive: r.lateral_shortest_positive,
                lateral_longest_negative: r.lateral_longest_negative,
                medial_breach: Some(r.has_medial_breach()),
                lateral_breach: Some(r.has_lateral_breach()),
                error: None,
            },
            Err(reason) => SummaryRow {
                screw_number: outcome.screw_number,
                name: &outcome.name,
                status: "failed",
                foot_side: report.foot_side.label(),
                medial_shortest_positive: None,
                medial_longest_negative: None,
                lateral_shortest_positive: None,
                lateral_longest_negative: None,
                medial_breach: None,
                lateral_breach: None,
                error: Some(reason.as_str()),
            },
        };
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}

fn split(p: Option<&Point3<f64>>) -> (Option<f64>, Option<f64>, Option<f64>) {
    match p {
        Some(p) => (Some(p.x), Some(p.y), Some(p.z)),
        None => (None, None, None),
    }
}

/// One row per axis sample: position, both signed clearances and hit points.
pub fn write_profile_csv<P: AsRef<Path>>(path: P, result: &AnalysisResult) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("failed to create profile {}", path.display()))?;

    for (i, axis) in result.axis_points.iter().enumerate() {
        let (medial_hit_x, medial_hit_y, medial_hit_z) = split(result.medial_hit[i].as_ref());
        let (lateral_hit_x, lateral_hit_y, lateral_hit_z) = split(result.lateral_hit[i].as_ref());
        wtr.serialize(ProfileRow {
            index: i,
            axis_x: axis.x,
            axis_y: axis.y,
            axis_z: axis.z,
            signed_medial: result.signed_medial[i],
            signed_lateral: result.signed_lateral[i],
            medial_hit_x,
            medial_hit_y,
            medial_hit_z,
            lateral_hit_x,
            lateral_hit_y,
            lateral_hit_z,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod output_tests {
    use super::*;
    use crate::entry::ScrewOutcome;
    use crate::processing::FootSide;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn small_result() -> AnalysisResult {
        AnalysisResult {
            foot_side: FootSide::Right,
            screw_points: vec![Point3::origin(); 3],
            medial_vertices: Arc::from(vec![Point3::origin(); 3]),
            lateral_vertices: Arc::from(vec![Point3::origin(); 3]),
            axis_direction: nalgebra::Vector3::y(),
            axis_points: vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
            signed_medial: vec![Some(2.5), None],
            signed_lateral: vec![None, Some(-1.0)],
            medial_hit: vec![Some(Point3::new(-1.5, 0.0, 0.0)), None],
            lateral_hit: vec![None, Some(Point3::new(2.0, 1.0, 0.0))],
            medial_shortest_positive: Some(2.5),
            medial_longest_negative: None,
            lateral_shortest_positive: None,
            lateral_longest_negative: Some(-1.0),
        }
    }

    #[test]
    fn test_summary_has_one_row_per_screw() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let report = BatchReport {
            foot_side: FootSide::Right,
            outcomes: vec![
                ScrewOutcome {
                    screw_number: 1,
                    name: "a.stl".to_string(),
                    result: Ok(small_result()),
                },
                ScrewOutcome {
                    screw_number: 2,
                    name: "b.stl".to_string(),
                    result: Err("too few points".to_string()),
                },
            ],
        };
        write_summary_csv(&path, &report).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "screw_number");
        assert_eq!(&headers[10], "error");

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "ok");
        assert_eq!(&rows[0][4], "2.5");
        assert_eq!(&rows[0][5], "");
        assert_eq!(&rows[0][9], "true");
        assert_eq!(&rows[1][2], "failed");
        assert_eq!(&rows[1][10], "too few points");
    }

    #[test]
    fn test_profile_rows_follow_axis() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.csv");
        write_profile_csv(&path, &small_result()).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][4], "2.5");
        assert_eq!(&rows[0][5], "");
        assert_eq!(&rows[1][5], "-1.0");
        assert_eq!(&rows[1][9], "2.0");
    }
}
