//! Project setup: session folder skeleton and a starter config.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use mousepose_core::{SessionConfig, Skeleton};

use super::Step;
use crate::run::{PipelineRun, StageReport};

/// Create the session, camera and annotation directories of every session.
///
/// A missing `config.toml` is replaced by a template that lists the bundled
/// skeleton's nodes as body parts; existing configs are left alone.
pub fn step_setup(run: &PipelineRun) -> Result<StageReport> {
    run.run_units(Step::Setup, run.session_units(), |unit| {
        setup_session(run, &unit.session)
    })
}

fn setup_session(run: &PipelineRun, session: &str) -> Result<String> {
    let paths = &run.paths;
    create_dir(&paths.session_dir(session))?;
    create_dir(&paths.annotation_root(session))?;
    for camera in &run.config.cameras {
        create_dir(&paths.camera_dir(session, camera))?;
        create_dir(&paths.annotation_dir(session, camera))?;
    }

    let config_path = paths.config_path(session);
    if config_path.exists() {
        return Ok(format!("{} cameras", run.config.cameras.len()));
    }
    let skeleton = Skeleton::bundled()?;
    let template = SessionConfig::template(paths.session_dir(session).join("videos"), skeleton.nodes);
    template
        .save(&config_path)
        .with_context(|| format!("writing {}", config_path.display()))?;
    warn!(
        "wrote template {}; review video_dir and body parts before running later steps",
        config_path.display()
    );
    Ok(format!(
        "{} cameras, template config written",
        run.config.cameras.len()
    ))
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))
}
