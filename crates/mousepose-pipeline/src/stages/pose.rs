//! Pose estimation: train, track and export per camera, then assemble the
//! session's multi-camera track file.

use anyhow::{Context, Result, bail};
use mousepose_core::TrackArray;

use super::Step;
use crate::run::{PipelineRun, StageReport, Unit};
use crate::tools::{TrackJob, TrainJob};

/// Task label of the per-session assembly unit.
pub const ASSEMBLE_TASK: &str = "assemble tracks";

/// Train a model per camera, run it over the camera video, export the
/// predictions, and stack every camera's tracks into the session's
/// pose-estimation file.
pub fn step_pose(run: &PipelineRun) -> Result<StageReport> {
    let mut report = StageReport::begin(Step::Pose);
    for session in &run.config.sessions {
        let mut all_cameras_ok = true;
        for camera in &run.config.cameras {
            let ok = run.attempt(&mut report, Unit::camera(session, camera), |unit| {
                estimate_camera(run, unit)
            })?;
            all_cameras_ok &= ok;
        }

        let unit = Unit::session(session).with_task(ASSEMBLE_TASK);
        run.attempt(&mut report, unit, |_| {
            if !all_cameras_ok {
                bail!("skipped: pose estimation failed for at least one camera");
            }
            assemble_tracks(run, session)
        })?;
    }
    Ok(report.finish())
}

fn estimate_camera(run: &PipelineRun, unit: &Unit) -> Result<String> {
    let (session, Some(camera)) = (unit.session.as_str(), unit.camera.as_deref()) else {
        bail!("pose estimation needs a camera");
    };
    let paths = &run.paths;
    let video = paths.video_path(session, camera)?;
    let labels = paths.labels_path(session, camera);
    let model_prefix = paths.model_prefix(session, camera);
    let prediction = paths.prediction_path(session, camera);
    let analysis = paths.analysis_path(session, camera);

    run.tools.trainer.train(&TrainJob {
        profile: &run.config.tools.training_profile,
        labels: &labels,
        output_prefix: &model_prefix,
    })?;
    run.tools.tracker.track(&TrackJob {
        video: &video,
        model: &paths.model_config_path(session, camera),
        output: &prediction,
    })?;
    run.tools.exporter.export_analysis(&prediction, &analysis)?;
    Ok(format!("predictions in {}", prediction.display()))
}

fn assemble_tracks(run: &PipelineRun, session: &str) -> Result<String> {
    let cameras = run
        .config
        .cameras
        .iter()
        .map(|camera| {
            let path = run.paths.analysis_path(session, camera);
            run.tools.track_store.read_camera_tracks(&path)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let tracks = TrackArray::stack(&cameras)
        .with_context(|| format!("stacking camera tracks of {session}"))?;
    let output = run.paths.pose_estimation_path(session);
    run.tools.track_store.write_tracks(&output, &tracks)?;
    Ok(format!(
        "{} cameras, {} frames, {} nodes",
        tracks.n_cameras(),
        tracks.n_frames(),
        tracks.n_nodes()
    ))
}
