use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use mousepose_core::PipelineConfig;
use mousepose_pipeline::{ALL_STEPS, PipelineReport, PipelineRun, run_steps};

/// File name of the run report written into the base directory.
const REPORT_FILE: &str = "pipeline_report.json";

/// Mouse behavior pipeline: SLEAP pose estimation, anipose triangulation,
/// joint angles and plots.
#[derive(Debug, Parser)]
#[command(author, version, about = "SLEAP + anipose mouse pose pipeline")]
struct Args {
    /// Steps to run: setup, videos, annotations, pose, triangulation,
    /// angles, visualize, or all. Steps always run in pipeline order.
    #[arg(long, num_args = 1.., default_value = ALL_STEPS)]
    steps: Vec<String>,

    /// Path to the pipeline configuration (TOML).
    #[arg(long, default_value = "pipeline.toml")]
    config: PathBuf,
}

fn report_path(config: &PipelineConfig) -> PathBuf {
    config.base_dir.join(REPORT_FILE)
}

fn write_report(report: &PipelineReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, report.to_json()?).with_context(|| format!("writing {}", path.display()))
}

fn run_from_config(config_path: &Path, steps: &[String]) -> Result<PipelineReport> {
    let config = PipelineConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let report_path = report_path(&config);
    info!(
        "{} sessions x {} cameras under {}",
        config.sessions.len(),
        config.cameras.len(),
        config.base_dir.display()
    );

    let mut run = PipelineRun::new(config)?;
    let report = run_steps(&mut run, steps)?;
    write_report(&report, &report_path)?;
    info!("report written to {}", report_path.display());
    Ok(report)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match try_main() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether every unit of every step succeeded.
fn try_main() -> Result<bool> {
    let args = Args::parse();
    let report = run_from_config(&args.config, &args.steps)?;
    for (step, outcome) in report.failures() {
        error!(
            "{step} failed for {}: {}",
            outcome.unit,
            outcome.notes.as_deref().unwrap_or("no details")
        );
    }
    Ok(report.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mousepose_pipeline::Step;

    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("pipeline.toml");
        fs::write(
            &path,
            r#"
base_dir = "projects"
sessions = ["m01_day1"]
cameras = ["cam_a", "cam_b"]
"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn default_arguments() {
        let args = Args::try_parse_from(["mousepose"]).unwrap();
        assert_eq!(args.steps, ["all"]);
        assert_eq!(args.config, PathBuf::from("pipeline.toml"));
    }

    #[test]
    fn several_steps() {
        let args =
            Args::try_parse_from(["mousepose", "--steps", "triangulation", "angles"]).unwrap();
        assert_eq!(args.steps, ["triangulation", "angles"]);
    }

    #[test]
    fn setup_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());

        let steps = vec!["setup".to_string(), "bogus".to_string()];
        let report = run_from_config(&config, &steps).unwrap();
        assert!(report.is_success());
        assert_eq!(report.steps(), [Step::Setup]);
        assert_eq!(report.skipped_steps, ["bogus"]);

        let base = dir.path().join("projects");
        assert!(base.join("m01_day1").join("cam_b").is_dir());
        assert!(base.join("m01_day1").join("config.toml").is_file());
        let json = fs::read_to_string(base.join(REPORT_FILE)).unwrap();
        let restored: PipelineReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.skipped_steps, ["bogus"]);
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_from_config(&dir.path().join("nope.toml"), &["all".to_string()]).unwrap_err();
        assert!(format!("{err:#}").contains("pipeline config not found"));
    }
}
