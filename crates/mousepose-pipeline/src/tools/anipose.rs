//! Triangulation and angle geometry through external commands.
//!
//! Both tools exchange files with the pipeline: the triangulation command
//! reads a `(cameras, frames, nodes, 2)` track array and writes a 3D point
//! array, both as `.npy`; the angle command reads the point CSV and writes
//! an angle CSV.

use anyhow::{Context, Result, bail};
use log::debug;
use mousepose_core::{CommandSpec, read_array, write_array};
use ndarray::ArrayD;

use super::command::{command_from_spec, run_checked};
use super::{AngleCalculator, AngleJob, TriangulationJob, Triangulator};

/// Runs a configured triangulation command.
///
/// Placeholders: `{session}`, `{tracks}`, `{config}`, `{output}`.
#[derive(Debug, Clone)]
pub struct CommandTriangulator {
    spec: CommandSpec,
}

impl CommandTriangulator {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl Triangulator for CommandTriangulator {
    fn triangulate(&self, job: &TriangulationJob<'_>) -> Result<ArrayD<f64>> {
        write_array(job.tracks_path, job.tracks.data())?;
        debug!(
            "staged {} camera tracks for {} at {}",
            job.tracks.n_cameras(),
            job.session,
            job.tracks_path.display()
        );
        let command = command_from_spec(
            &self.spec,
            &[
                ("session", job.session.to_string()),
                ("tracks", job.tracks_path.display().to_string()),
                ("config", job.config_path.display().to_string()),
                ("output", job.output_path.display().to_string()),
            ],
        );
        run_checked(command).with_context(|| format!("triangulating {}", job.session))?;
        let points = read_array(job.output_path)?;
        Ok(points)
    }
}

/// Runs a configured angle command.
///
/// Placeholders: `{session}`, `{config}`, `{points}`, `{output}`.
#[derive(Debug, Clone)]
pub struct CommandAngleCalculator {
    spec: CommandSpec,
}

impl CommandAngleCalculator {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl AngleCalculator for CommandAngleCalculator {
    fn compute_angles(&self, job: &AngleJob<'_>) -> Result<()> {
        let command = command_from_spec(
            &self.spec,
            &[
                ("session", job.session.to_string()),
                ("config", job.config_path.display().to_string()),
                ("points", job.points_csv.display().to_string()),
                ("output", job.output.display().to_string()),
            ],
        );
        run_checked(command).with_context(|| format!("computing angles for {}", job.session))?;
        if !job.output.is_file() {
            bail!(
                "angle command finished without writing {}",
                job.output.display()
            );
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use mousepose_core::{SessionConfig, TrackArray};
    use ndarray::{Array3, Array4};

    use super::*;

    #[test]
    fn triangulator_stages_tracks_and_reads_output() {
        let dir = tempfile::tempdir().unwrap();
        let tracks_path = dir.path().join("s1_2d.npy");
        let output_path = dir.path().join("s1_raw.npy");
        let config_path = dir.path().join("config.toml");

        // `cp` stands in for the real tool: the staged tracks become the output.
        let triangulator =
            CommandTriangulator::new(CommandSpec::new("cp", &["{tracks}", "{output}"]));
        let tracks = TrackArray::new(Array4::from_elem((2, 5, 3, 2), 1.5)).unwrap();
        let config = SessionConfig::template(dir.path(), vec!["a".into()]);
        let points = triangulator
            .triangulate(&TriangulationJob {
                session: "s1",
                tracks: &tracks,
                config: &config,
                config_path: &config_path,
                tracks_path: &tracks_path,
                output_path: &output_path,
            })
            .unwrap();
        assert_eq!(points.shape(), &[2, 5, 3, 2]);
        assert!(points.iter().all(|&v| v == 1.5));
        assert!(tracks_path.is_file());
    }

    #[test]
    fn failing_triangulation_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let triangulator = CommandTriangulator::new(CommandSpec::new("false", &[]));
        let tracks = TrackArray::stack(&[Array3::zeros((1, 1, 2))]).unwrap();
        let config = SessionConfig::template(dir.path(), vec!["a".into()]);
        let result = triangulator.triangulate(&TriangulationJob {
            session: "s1",
            tracks: &tracks,
            config: &config,
            config_path: &dir.path().join("config.toml"),
            tracks_path: &dir.path().join("t.npy"),
            output_path: &dir.path().join("o.npy"),
        });
        assert!(result.is_err());
    }

    #[test]
    fn angle_command_must_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("points.csv");
        let output = dir.path().join("angles.csv");
        fs::write(&points, "a_x,a_y,a_z,fnum\n1.0,2.0,3.0,1\n").unwrap();
        let job = AngleJob {
            session: "s1",
            config_path: &dir.path().join("config.toml"),
            points_csv: &points,
            output: &output,
        };

        let silent = CommandAngleCalculator::new(CommandSpec::new("true", &[]));
        assert!(silent.compute_angles(&job).is_err());

        let copying = CommandAngleCalculator::new(CommandSpec::new("cp", &["{points}", "{output}"]));
        copying.compute_angles(&job).unwrap();
        assert!(output.is_file());
    }
}
