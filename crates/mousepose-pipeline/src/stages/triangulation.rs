//! Triangulation: 2D tracks from every camera to one 3D point array.

use anyhow::{Context, Result, bail};
use mousepose_core::{ArrayError, write_array};

use super::Step;
use crate::run::{PipelineRun, StageReport};
use crate::tools::TriangulationJob;

/// Triangulate each session's pose-estimation file into `{s}_3d_points.npy`.
pub fn step_triangulation(run: &PipelineRun) -> Result<StageReport> {
    run.run_units(Step::Triangulation, run.session_units(), |unit| {
        triangulate_session(run, &unit.session)
    })
}

fn triangulate_session(run: &PipelineRun, session: &str) -> Result<String> {
    let paths = &run.paths;
    let config = paths.load_session_config(session)?;
    let tracks = run
        .tools
        .track_store
        .read_tracks(&paths.pose_estimation_path(session))?;
    let body_parts = config.body_part_count();
    if tracks.n_nodes() != body_parts {
        bail!(
            "tracks have {} nodes but the session config lists {} body parts",
            tracks.n_nodes(),
            body_parts
        );
    }

    let config_path = paths.config_path(session);
    let tracks_path = paths.tracks_2d_path(session);
    let output_path = paths.triangulated_path(session);
    let points = run
        .tools
        .triangulator
        .triangulate(&TriangulationJob {
            session,
            tracks: &tracks,
            config: &config,
            config_path: &config_path,
            tracks_path: &tracks_path,
            output_path: &output_path,
        })
        .with_context(|| format!("triangulating {session}"))?;

    let frames = tracks.n_frames();
    let found = points.shape().to_vec();
    let points = points
        .into_shape_with_order((frames, body_parts, 3))
        .map_err(|_| ArrayError::Shape {
            expected: vec![frames, body_parts, 3],
            found,
        })
        .with_context(|| format!("triangulated points of {session}"))?;
    write_array(&paths.points_3d_path(session), &points)?;
    Ok(format!("{frames} frames, {body_parts} body parts"))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use mousepose_core::{
        PipelineConfig, SessionConfig, TrackArray, TrackError, TrackStore, read_array,
    };
    use ndarray::{Array3, Array4, ArrayD, IxDyn};

    use super::*;
    use crate::tools::{Toolbox, Triangulator};

    struct Tracks(usize, usize);

    impl TrackStore for Tracks {
        fn read_camera_tracks(
            &self,
            _path: &Path,
        ) -> Result<Array3<f64>, TrackError> {
            unreachable!("triangulation reads assembled tracks")
        }

        fn read_tracks(&self, _path: &Path) -> Result<TrackArray, TrackError> {
            TrackArray::new(Array4::zeros((2, self.0, self.1, 2)))
        }

        fn write_tracks(&self, _path: &Path, _tracks: &TrackArray) -> Result<(), TrackError> {
            Ok(())
        }
    }

    struct Stub(Vec<usize>);

    impl Triangulator for Stub {
        fn triangulate(&self, job: &TriangulationJob<'_>) -> Result<ArrayD<f64>> {
            assert_eq!(job.tracks.n_cameras(), 2);
            Ok(ArrayD::from_elem(IxDyn(&self.0), 1.0))
        }
    }

    fn run(dir: &Path, nodes: usize, output_shape: &[usize]) -> PipelineRun {
        let config = PipelineConfig::new(dir)
            .with_sessions(["s1"])
            .with_cameras(["cam_a", "cam_b"]);
        let mut tools = Toolbox::default();
        tools.track_store = Box::new(Tracks(10, nodes));
        tools.triangulator = Box::new(Stub(output_shape.to_vec()));
        let run = PipelineRun::with_tools(config, tools).unwrap();
        std::fs::create_dir_all(run.paths.session_dir("s1")).unwrap();
        let parts = ["nose", "neck", "spine", "tail_base"].map(String::from).to_vec();
        SessionConfig::template(dir.join("videos"), parts)
            .save(&run.paths.config_path("s1"))
            .unwrap();
        run
    }

    #[test]
    fn writes_frame_major_points() {
        let dir = tempfile::tempdir().unwrap();
        let run = run(dir.path(), 4, &[10, 4, 3]);
        let report = step_triangulation(&run).unwrap();
        assert!(report.is_success());
        let points = read_array(&run.paths.points_3d_path("s1")).unwrap();
        assert_eq!(points.shape(), &[10, 4, 3]);
    }

    #[test]
    fn flat_output_is_reshaped() {
        let dir = tempfile::tempdir().unwrap();
        let run = run(dir.path(), 4, &[120]);
        step_triangulation(&run).unwrap();
        let points = read_array(&run.paths.points_3d_path("s1")).unwrap();
        assert_eq!(points.shape(), &[10, 4, 3]);
    }

    #[test]
    fn node_count_must_match_body_parts() {
        let dir = tempfile::tempdir().unwrap();
        let run = run(dir.path(), 5, &[10, 5, 3]);
        let report = step_triangulation(&run).unwrap();
        assert_eq!(report.failed(), 1);
        assert!(!run.paths.points_3d_path("s1").exists());
    }

    #[test]
    fn wrong_element_count_fails() {
        let dir = tempfile::tempdir().unwrap();
        let run = run(dir.path(), 4, &[9, 4, 3]);
        let report = step_triangulation(&run).unwrap();
        assert_eq!(report.failed(), 1);
    }
}
