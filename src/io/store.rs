//! File backed record of patients, analysis runs and per screw results.
//!
//! The whole store is one JSON document. Per screw arrays are kept as
//! serialized JSON blobs so a run can be replayed without the meshes.
use anyhow::{anyhow, bail, Context};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::processing::{AnalysisResult, FootSide};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrewRecord {
    pub screw_number: usize,
    pub medial_shortest_positive: Option<f64>,
    pub medial_longest_negative: Option<f64>,
    pub lateral_shortest_positive: Option<f64>,
    pub lateral_longest_negative: Option<f64>,
    pub has_medial_breach: bool,
    pub has_lateral_breach: bool,
    // JSON blobs
    pub axis_points: String,
    pub signed_medial: String,
    pub signed_lateral: String,
}

/// Per sample data decoded from a stored screw.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrewReplay {
    pub axis_points: Vec<Point3<f64>>,
    pub signed_medial: Vec<Option<f64>>,
    pub signed_lateral: Vec<Option<f64>>,
}

impl ScrewRecord {
    pub fn from_result(screw_number: usize, result: &AnalysisResult) -> anyhow::Result<Self> {
        let axis: Vec<[f64; 3]> = result.axis_points.iter().map(|p| [p.x, p.y, p.z]).collect();
        Ok(Self {
            screw_number,
            medial_shortest_positive: result.medial_shortest_positive,
            medial_longest_negative: result.medial_longest_negative,
            lateral_shortest_positive: result.lateral_shortest_positive,
            lateral_longest_negative: result.lateral_longest_negative,
            has_medial_breach: result.has_medial_breach(),
            has_lateral_breach: result.has_lateral_breach(),
            axis_points: serde_json::to_string(&axis)?,
            signed_medial: serde_json::to_string(&result.signed_medial)?,
            signed_lateral: serde_json::to_string(&result.signed_lateral)?,
        })
    }

    pub fn replay(&self) -> anyhow::Result<ScrewReplay> {
        let axis: Vec<[f64; 3]> = serde_json::from_str(&self.axis_points)
            .with_context(|| format!("corrupt axis points for screw {}", self.screw_number))?;
        Ok(ScrewReplay {
            axis_points: axis.into_iter().map(|[x, y, z]| Point3::new(x, y, z)).collect(),
            signed_medial: serde_json::from_str(&self.signed_medial)
                .with_context(|| format!("corrupt medial profile for screw {}", self.screw_number))?,
            signed_lateral: serde_json::from_str(&self.signed_lateral)
                .with_context(|| format!("corrupt lateral profile for screw {}", self.screw_number))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: u64,
    pub patient_id: String,
    pub foot_side: FootSide,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub notes: Option<String>,
    pub screws: Vec<ScrewRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    next_id: u64,
    patients: Vec<PatientRecord>,
    analyses: Vec<AnalysisRecord>,
}

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    data: StoreData,
}

fn now_unix() -> anyhow::Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| anyhow!("system clock before Unix epoch: {}", e))
}

impl RecordStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let file = File::open(&path)
                .with_context(|| format!("failed to open record store {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse record store {}", path.display()))?
        } else {
            StoreData::default()
        };
        Ok(Self { path, data })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // write next to the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)
                .with_context(|| format!("failed to write record store {}", tmp.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &self.data)?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace record store {}", self.path.display()))?;
        Ok(())
    }

    pub fn add_patient(
        &mut self,
        patient_id: &str,
        name: Option<String>,
        age: Option<u32>,
        gender: Option<String>,
    ) -> anyhow::Result<&PatientRecord> {
        if self.patient(patient_id).is_some() {
            bail!("patient {} already exists", patient_id);
        }
        self.data.patients.push(PatientRecord {
            patient_id: patient_id.to_string(),
            name,
            age,
            gender,
            created_at: now_unix()?,
        });
        Ok(&self.data.patients[self.data.patients.len() - 1])
    }

    pub fn patient(&self, patient_id: &str) -> Option<&PatientRecord> {
        self.data.patients.iter().find(|p| p.patient_id == patient_id)
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.data.patients
    }

    /// Records one run. The patient is created on first use; screws keep the
    /// numbers they had in their batch.
    pub fn add_analysis(
        &mut self,
        patient_id: &str,
        foot_side: FootSide,
        results: &[(usize, &AnalysisResult)],
        notes: Option<String>,
    ) -> anyhow::Result<u64> {
        if self.patient(patient_id).is_none() {
            self.add_patient(patient_id, None, None, None)?;
        }

        let screws = results
            .iter()
            .map(|(number, result)| ScrewRecord::from_result(*number, result))
            .collect::<anyhow::Result<Vec<_>>>()?;

        self.data.next_id += 1;
        let id = self.data.next_id;
        self.data.analyses.push(AnalysisRecord {
            id,
            patient_id: patient_id.to_string(),
            foot_side,
            timestamp: now_unix()?,
            notes,
            screws,
        });
        Ok(id)
    }

    pub fn analyses_for_patient(&self, patient_id: &str) -> Vec<&AnalysisRecord> {
        self.data
            .analyses
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .collect()
    }

    pub fn screws_for_analysis(&self, analysis_id: u64) -> Option<&[ScrewRecord]> {
        self.data
            .analyses
            .iter()
            .find(|a| a.id == analysis_id)
            .map(|a| a.screws.as_slice())
    }
}
