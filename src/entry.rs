use anyhow::{anyhow, Context, Result};
use crossbeam::thread;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::io::batch::ScrewBatch;
use crate::io::output::{write_profile_csv, write_summary_csv};
use crate::io::stl::load_stl_vertices;
use crate::io::store::RecordStore;
use crate::processing::{analyze_screw, AnalysisResult, FootSide, WallPair};

/// Result of one screw of a batch, numbered from 1 in batch order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrewOutcome {
    pub screw_number: usize,
    pub name: String,
    pub result: Result<AnalysisResult, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub foot_side: FootSide,
    pub outcomes: Vec<ScrewOutcome>,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScrewOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn medial_breaches(&self) -> usize {
        self.successes().filter(|r| r.has_medial_breach()).count()
    }

    pub fn lateral_breaches(&self) -> usize {
        self.successes().filter(|r| r.has_lateral_breach()).count()
    }
}

/// Analyzes every screw of the batch against the same walls, one rayon task
/// per screw. A screw that fails is reported in its outcome and does not stop
/// the others.
pub fn analyze_batch(walls: &WallPair, batch: &ScrewBatch, config: &AnalysisConfig) -> BatchReport {
    let outcomes: Vec<ScrewOutcome> = batch
        .entries
        .par_iter()
        .enumerate()
        .map(|(i, entry)| {
            let result = match &entry.vertices {
                Ok(points) => analyze_screw(walls, points, config).map_err(|e| e.to_string()),
                Err(reason) => Err(reason.clone()),
            };
            if let Err(reason) = &result {
                tracing::warn!(screw = i + 1, name = %entry.name, %reason, "could not process screw");
            }
            ScrewOutcome {
                screw_number: i + 1,
                name: entry.name.clone(),
                result,
            }
        })
        .collect();

    let report = BatchReport {
        foot_side: walls.foot_side,
        outcomes,
    };
    tracing::info!(
        screws = report.outcomes.len(),
        failed = report.failures().count(),
        medial_breaches = report.medial_breaches(),
        lateral_breaches = report.lateral_breaches(),
        "batch analyzed"
    );
    report
}

/// Where a file based run writes its results.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Directory for `summary.csv` and the per screw profiles.
    pub output_dir: Option<PathBuf>,
    /// JSON record store; a run is only recorded when a patient is given.
    pub store_path: Option<PathBuf>,
    pub patient_id: Option<String>,
    pub notes: Option<String>,
}

/// Loads both walls (in parallel) and the screw batch from disk, analyzes the
/// batch and writes reports and records as requested in `options`.
pub fn run_from_paths(
    medial_path: &Path,
    lateral_path: &Path,
    screws_path: &Path,
    options: &RunOptions,
    config: &AnalysisConfig,
) -> Result<BatchReport> {
    config.validate()?;

    let (medial, lateral) = thread::scope(|s| -> Result<_> {
        let medial_handle = s.spawn(|_| load_stl_vertices(medial_path, "medial"));
        let lateral_handle = s.spawn(|_| load_stl_vertices(lateral_path, "lateral"));

        let medial = medial_handle
            .join()
            .map_err(|_| anyhow!("medial wall loader panicked"))?
            .context("failed to load medial wall")?;
        let lateral = lateral_handle
            .join()
            .map_err(|_| anyhow!("lateral wall loader panicked"))?
            .context("failed to load lateral wall")?;
        Ok((medial, lateral))
    })
    .map_err(|panic_payload| anyhow!("wall loading threads panicked: {:?}", panic_payload))??;

    let batch = ScrewBatch::open(screws_path, config.max_batch_screws)?;
    let walls = WallPair::new(medial, lateral, config)?;
    let report = analyze_batch(&walls, &batch, config);

    if let Some(dir) = &options.output_dir {
        write_outputs(dir, &report)?;
    }

    if let (Some(store_path), Some(patient_id)) = (&options.store_path, &options.patient_id) {
        let mut store = RecordStore::open(store_path)?;
        let results: Vec<(usize, &AnalysisResult)> = report
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (o.screw_number, r)))
            .collect();
        let id = store.add_analysis(patient_id, report.foot_side, &results, options.notes.clone())?;
        store.save()?;
        tracing::info!(analysis_id = id, patient = %patient_id, "recorded analysis");
    }

    Ok(report)
}

fn write_outputs(dir: &Path, report: &BatchReport) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    write_summary_csv(dir.join("summary.csv"), report)?;
    for outcome in &report.outcomes {
        if let Ok(result) = &outcome.result {
            let path = dir.join(format!("screw_{:02}_profile.csv", outcome.screw_number));
            write_profile_csv(&path, result)?;
        }
    }
    tracing::info!(dir = %dir.display(), "wrote reports");
    Ok(())
}

#[cfg(test)]
mod entry_tests {
    use super::*;
    use crate::io::batch::ScrewEntry;
    use crate::utils::synthetic::{plane_wall_x, screw_along_y};
    use nalgebra::Point3;

    fn walls(config: &AnalysisConfig) -> WallPair {
        WallPair::new(
            plane_wall_x(0.0, (-10.0, 70.0), (-5.0, 5.0), 1.0),
            plane_wall_x(20.0, (-10.0, 70.0), (-5.0, 5.0), 1.0),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_batch_partial_failure() {
        let config = AnalysisConfig::default();
        let batch = ScrewBatch {
            entries: vec![
                ScrewEntry {
                    name: "good_1".to_string(),
                    vertices: Ok(screw_along_y(10.0, 0.0, 40.5)),
                },
                ScrewEntry {
                    name: "short".to_string(),
                    vertices: Ok(vec![Point3::origin(), Point3::new(1.0, 1.0, 0.0)]),
                },
                ScrewEntry {
                    name: "good_2".to_string(),
                    vertices: Ok(screw_along_y(24.0, 0.0, 40.5)),
                },
            ],
        };

        let report = analyze_batch(&walls(&config), &batch, &config);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.successes().count(), 2);

        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].screw_number, 2);
        assert_eq!(failed[0].name, "short");

        assert_eq!(report.outcomes[2].screw_number, 3);
        assert_eq!(report.lateral_breaches(), 1);
        assert_eq!(report.medial_breaches(), 0);
    }

    #[test]
    fn test_unreadable_entry_is_a_failed_outcome() {
        let config = AnalysisConfig::default();
        let batch = ScrewBatch {
            entries: vec![ScrewEntry {
                name: "broken.stl".to_string(),
                vertices: Err("failed to parse".to_string()),
            }],
        };
        let report = analyze_batch(&walls(&config), &batch, &config);
        assert_eq!(
            report.outcomes[0].result,
            Err("failed to parse".to_string())
        );
    }
}
