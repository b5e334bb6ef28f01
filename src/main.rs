use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use screwcheck::io::stl::points_to_ascii_stl;
use screwcheck::io::store::RecordStore;
use screwcheck::utils::synthetic::{plane_wall_x, screw_along_y};
use screwcheck::{run_from_paths, AnalysisConfig, RunOptions};

#[derive(Parser)]
#[command(name = "screwcheck")]
#[command(about = "Measure bone screw clearance to the medial and lateral walls")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Analyze a batch of screw STLs against two wall STLs
    Analyze {
        #[arg(long)]
        medial: PathBuf,
        #[arg(long)]
        lateral: PathBuf,
        /// ZIP archive or directory of screw STL files
        #[arg(long)]
        screws: PathBuf,
        /// TOML file overriding the analysis constants
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for summary.csv and per screw profiles
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        patient: Option<String>,
        #[arg(long, default_value = "screwcheck_records.json")]
        store: PathBuf,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List the recorded analyses of a patient
    History {
        #[arg(long, default_value = "screwcheck_records.json")]
        store: PathBuf,
        #[arg(long)]
        patient: String,
    },
    /// Write synthetic walls and screws to try the tool on
    Demo {
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cmd = Cmd::parse();
    match cmd.action {
        Action::Analyze {
            medial,
            lateral,
            screws,
            config,
            out,
            patient,
            store,
            notes,
        } => {
            let config = match config {
                Some(path) => AnalysisConfig::from_file(path)?,
                None => AnalysisConfig::default(),
            };
            let options = RunOptions {
                output_dir: out,
                store_path: Some(store),
                patient_id: patient,
                notes,
            };
            analyze(medial, lateral, screws, &options, &config)
        }
        Action::History { store, patient } => history(store, &patient),
        Action::Demo { out } => demo(out),
    }
}

fn fmt_mm(v: Option<f64>) -> String {
    v.map_or("-".to_string(), |v| format!("{:.2} mm", v))
}

fn analyze(
    medial: PathBuf,
    lateral: PathBuf,
    screws: PathBuf,
    options: &RunOptions,
    config: &AnalysisConfig,
) -> Result<()> {
    let report = run_from_paths(&medial, &lateral, &screws, options, config)?;

    println!("{}", report.foot_side);
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(r) => println!(
                "screw {:>2} {:<24} medial closest {:>10}  breach {:>10} | lateral closest {:>10}  breach {:>10}",
                outcome.screw_number,
                outcome.name,
                fmt_mm(r.medial_shortest_positive),
                fmt_mm(r.medial_longest_negative),
                fmt_mm(r.lateral_shortest_positive),
                fmt_mm(r.lateral_longest_negative),
            ),
            Err(reason) => println!(
                "screw {:>2} {:<24} could not be processed: {}",
                outcome.screw_number, outcome.name, reason
            ),
        }
    }
    println!(
        "screws with medial breaches: {}, lateral breaches: {}, failed: {}",
        report.medial_breaches(),
        report.lateral_breaches(),
        report.failures().count()
    );
    Ok(())
}

fn history(store: PathBuf, patient: &str) -> Result<()> {
    if !store.exists() {
        bail!("record store {} does not exist", store.display());
    }
    let store = RecordStore::open(&store)?;
    let runs = store.analyses_for_patient(patient);
    if runs.is_empty() {
        println!("no analyses recorded for {}", patient);
    }
    for run in runs {
        let medial = run.screws.iter().filter(|s| s.has_medial_breach).count();
        let lateral = run.screws.iter().filter(|s| s.has_lateral_breach).count();
        println!(
            "#{} at {} {}: {} screws, {} medial / {} lateral breaches{}",
            run.id,
            run.timestamp,
            run.foot_side,
            run.screws.len(),
            medial,
            lateral,
            run.notes.as_ref().map(|n| format!(" ({})", n)).unwrap_or_default()
        );
    }
    Ok(())
}

fn demo(out: PathBuf) -> Result<()> {
    let screws_dir = out.join("screws");
    fs::create_dir_all(&screws_dir)?;

    let medial = plane_wall_x(0.0, (-10.0, 70.0), (-5.0, 5.0), 1.0);
    let lateral = plane_wall_x(20.0, (-10.0, 70.0), (-5.0, 5.0), 1.0);
    fs::write(out.join("medial.stl"), points_to_ascii_stl("medial", &medial))?;
    fs::write(out.join("lateral.stl"), points_to_ascii_stl("lateral", &lateral))?;

    // centred, close to the lateral wall, through the lateral wall
    for (i, x) in [10.0, 17.5, 23.0].iter().enumerate() {
        let screw = screw_along_y(*x, 0.0, 50.5);
        let name = format!("screw_{:02}", i + 1);
        fs::write(
            screws_dir.join(format!("{}.stl", name)),
            points_to_ascii_stl(&name, &screw),
        )?;
    }

    tracing::info!(dir = %out.display(), "wrote demo meshes");
    Ok(())
}
