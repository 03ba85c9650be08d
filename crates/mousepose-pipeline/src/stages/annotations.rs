//! Annotation preparation: suggest frames and seed a label project per camera.

use anyhow::{Context, Result, bail};
use log::debug;
use mousepose_core::{LabelProject, Skeleton, SuggestionParams};

use super::Step;
use crate::run::{PipelineRun, StageReport, Unit};

/// Write a label project with suggested frames for every camera video.
///
/// The annotation directories must already exist (see
/// [`step_setup`](super::step_setup)); existing projects are replaced.
pub fn step_annotations(run: &PipelineRun) -> Result<StageReport> {
    let skeleton = Skeleton::bundled()?;
    let params = SuggestionParams::default();
    run.run_units(Step::Annotations, run.camera_units(), |unit| {
        prepare_annotations(run, unit, &skeleton, &params)
    })
}

fn prepare_annotations(
    run: &PipelineRun,
    unit: &Unit,
    skeleton: &Skeleton,
    params: &SuggestionParams,
) -> Result<String> {
    let (session, Some(camera)) = (unit.session.as_str(), unit.camera.as_deref()) else {
        bail!("annotation preparation needs a camera");
    };
    let video = run.paths.video_path(session, camera)?;
    let dir = run.paths.annotation_dir(session, camera);
    if !dir.is_dir() {
        bail!(
            "annotation directory {} does not exist; run setup first",
            dir.display()
        );
    }

    let frames = run
        .tools
        .suggester
        .suggest(&video, params)
        .with_context(|| format!("suggesting frames from {}", video.display()))?;
    debug!("{unit}: suggested frames {frames:?}");

    let project = LabelProject::seeded(skeleton.clone(), &video, &frames, params.clone());
    let labels = run.paths.labels_path(session, camera);
    project.save(&labels)?;
    Ok(format!("{} frames suggested", frames.len()))
}
