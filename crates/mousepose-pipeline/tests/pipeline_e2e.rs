use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Result, bail};
use mousepose_core::{
    Column, DEFAULT_ANGLE_COLUMNS, FailurePolicy, PipelineConfig, PlotWindow, SessionConfig,
    Table, TrackArray, TrackError, TrackStore,
};
use mousepose_pipeline::tools::{
    AngleCalculator, AngleJob, PredictionExporter, Toolbox, TrackJob, Tracker, TrainJob, Trainer,
    TriangulationJob, Triangulator,
};
use mousepose_pipeline::{PipelineRun, Step, run_steps};
use ndarray::{Array3, ArrayD, IxDyn};

const FRAMES: usize = 10;
const BODY_PARTS: [&str; 4] = ["nose", "neck", "spine", "tail_base"];

struct NoopSleap;

impl Trainer for NoopSleap {
    fn train(&self, _job: &TrainJob<'_>) -> Result<()> {
        Ok(())
    }
}

impl Tracker for NoopSleap {
    fn track(&self, _job: &TrackJob<'_>) -> Result<()> {
        Ok(())
    }
}

impl PredictionExporter for NoopSleap {
    fn export_analysis(&self, _predictions: &Path, _output: &Path) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct MemoryStore(Rc<RefCell<BTreeMap<PathBuf, TrackArray>>>);

impl TrackStore for MemoryStore {
    fn read_camera_tracks(&self, _path: &Path) -> Result<Array3<f64>, TrackError> {
        Ok(Array3::from_elem((FRAMES, BODY_PARTS.len(), 2), 320.0))
    }

    fn read_tracks(&self, path: &Path) -> Result<TrackArray, TrackError> {
        self.0
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| TrackError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn write_tracks(&self, path: &Path, tracks: &TrackArray) -> Result<(), TrackError> {
        self.0.borrow_mut().insert(path.to_path_buf(), tracks.clone());
        Ok(())
    }
}

struct StubTriangulator;

impl Triangulator for StubTriangulator {
    fn triangulate(&self, job: &TriangulationJob<'_>) -> Result<ArrayD<f64>> {
        let shape = [job.tracks.n_frames(), job.tracks.n_nodes(), 3];
        Ok(ArrayD::from_shape_fn(IxDyn(&shape), |ix| {
            (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64
        }))
    }
}

/// Writes the six default angle columns; fails for the listed sessions.
struct StubAngles {
    fail_for: Vec<&'static str>,
}

impl AngleCalculator for StubAngles {
    fn compute_angles(&self, job: &AngleJob<'_>) -> Result<()> {
        if self.fail_for.iter().any(|s| *s == job.session) {
            bail!("anipose-angles exited with status 1");
        }
        let rows = Table::read_csv(job.points_csv)?.n_rows();
        let columns = DEFAULT_ANGLE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, name)| Column::float(*name, vec![90.0 + i as f64; rows]))
            .collect();
        Table::from_columns(columns)?.write_csv(job.output)?;
        Ok(())
    }
}

fn toolbox(store: &MemoryStore, fail_angles_for: Vec<&'static str>) -> Toolbox {
    let mut tools = Toolbox::default();
    tools.trainer = Box::new(NoopSleap);
    tools.tracker = Box::new(NoopSleap);
    tools.exporter = Box::new(NoopSleap);
    tools.track_store = Box::new(store.clone());
    tools.triangulator = Box::new(StubTriangulator);
    tools.angles = Box::new(StubAngles {
        fail_for: fail_angles_for,
    });
    tools
}

fn config(base: &Path, policy: FailurePolicy) -> PipelineConfig {
    let mut config = PipelineConfig::new(base)
        .with_sessions(["m01_day1", "m02_day1"])
        .with_cameras(["cam_a", "cam_b"]);
    config.failure_policy = policy;
    config.analysis.plot_window = PlotWindow { start: 2, end: 8 };
    config
}

/// Run setup, then replace the template configs with the test body parts.
fn prepare(run: &mut PipelineRun) {
    let report = run_steps(run, &["setup"]).unwrap();
    assert!(report.is_success());
    for session in run.config.sessions.clone() {
        let parts = BODY_PARTS.map(String::from).to_vec();
        let config = SessionConfig::template(run.paths.session_dir(&session).join("videos"), parts);
        config.save(&run.paths.config_path(&session)).unwrap();
    }
}

#[test]
fn two_sessions_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default();
    let mut run = PipelineRun::with_tools(
        config(dir.path(), FailurePolicy::Isolate),
        toolbox(&store, vec![]),
    )
    .unwrap();
    prepare(&mut run);

    let report = run_steps(
        &mut run,
        &["visualize", "pose", "triangulation", "angles", "pose"],
    )
    .unwrap();
    assert_eq!(
        report.steps(),
        [Step::Pose, Step::Triangulation, Step::Angles, Step::Visualize]
    );
    assert!(report.is_success(), "{}", report.to_json().unwrap());

    for session in ["m01_day1", "m02_day1"] {
        let combined = Table::read_csv(&run.paths.combined_path(session)).unwrap();
        assert_eq!(combined.n_rows(), FRAMES);
        assert_eq!(combined.n_cols(), 19);
        assert_eq!(combined.column_names()[..3], ["nose_x", "nose_y", "nose_z"]);
        assert_eq!(combined.column_names()[12], "fnum");
        assert_eq!(combined.column("fnum").unwrap().values[9], 10.0);
        // frame 3, body part 2 (spine), axis y
        assert_eq!(combined.column("spine_y").unwrap().values[3], 321.0);

        let points = Table::read_csv(&run.paths.points_csv_path(session)).unwrap();
        assert_eq!(points.n_cols(), 13);

        let svg = fs::read_to_string(run.paths.plot_path(session)).unwrap();
        assert!(svg.contains(&format!("Joint Angles for Session {session}")));
        assert_eq!(svg.matches("<path").count(), 6);
    }
}

#[test]
fn angle_failure_is_isolated_to_its_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default();
    let mut run = PipelineRun::with_tools(
        config(dir.path(), FailurePolicy::Isolate),
        toolbox(&store, vec!["m01_day1"]),
    )
    .unwrap();
    prepare(&mut run);

    let report = run_steps(&mut run, &["all_but_videos", "pose", "triangulation", "angles"]).unwrap();
    assert_eq!(report.skipped_steps, ["all_but_videos"]);
    assert!(!report.is_success());

    let failures: Vec<_> = report
        .failures()
        .map(|(step, outcome)| (step, outcome.unit.to_string()))
        .collect();
    assert_eq!(failures, [(Step::Angles, "m01_day1".to_string())]);
    assert!(!run.paths.combined_path("m01_day1").exists());
    assert!(run.paths.combined_path("m02_day1").exists());
}

#[test]
fn fail_fast_aborts_on_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default();
    let mut run = PipelineRun::with_tools(
        config(dir.path(), FailurePolicy::FailFast),
        toolbox(&store, vec!["m01_day1"]),
    )
    .unwrap();
    prepare(&mut run);

    let err = run_steps(&mut run, &["pose", "triangulation", "angles", "visualize"]).unwrap_err();
    assert!(format!("{err:#}").contains("anipose-angles exited with status 1"));
    assert!(run.paths.points_csv_path("m01_day1").exists());
    assert!(!run.paths.points_csv_path("m02_day1").exists());
}

#[test]
fn missing_session_config_fails_only_that_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default();
    let mut run = PipelineRun::with_tools(
        config(dir.path(), FailurePolicy::Isolate),
        toolbox(&store, vec![]),
    )
    .unwrap();
    prepare(&mut run);
    fs::remove_file(run.paths.config_path("m02_day1")).unwrap();

    let report = run_steps(&mut run, &["pose", "triangulation"]).unwrap();
    let triangulation = &report.stages[1];
    assert_eq!(triangulation.step, Step::Triangulation);
    assert_eq!(triangulation.succeeded(), 1);
    let failure = &triangulation.outcomes[1];
    assert!(!failure.success);
    assert!(failure.notes.as_deref().unwrap().contains("config file not found"));
}
