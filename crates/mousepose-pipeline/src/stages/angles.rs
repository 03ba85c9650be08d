//! Angle computation and the combined points + angles table.

use anyhow::{Context, Result};
use mousepose_core::{Table, TableError, points_to_table, read_array};

use super::Step;
use crate::run::{PipelineRun, StageReport};
use crate::tools::AngleJob;

/// Flatten each session's 3D points to CSV, compute joint angles, and write
/// the combined `{s}_3dpts_angles.csv`.
pub fn step_angles(run: &PipelineRun) -> Result<StageReport> {
    run.run_units(Step::Angles, run.session_units(), |unit| {
        angles_for_session(run, &unit.session)
    })
}

/// Append the selected angle columns to the point table.
///
/// Both tables must have the same number of rows.
pub fn combine_points_and_angles<S: AsRef<str>>(
    points: Table,
    angles: &Table,
    angle_columns: &[S],
) -> Result<Table, TableError> {
    let selected = angles.select(angle_columns)?;
    points.hconcat(selected)
}

fn angles_for_session(run: &PipelineRun, session: &str) -> Result<String> {
    let paths = &run.paths;
    let config = paths.load_session_config(session)?;
    let points_path = paths.points_3d_path(session);
    let points = read_array(&points_path)?;
    let table = points_to_table(&points, &config.labeling.bodyparts)
        .with_context(|| format!("flattening {}", points_path.display()))?;

    let points_csv = paths.points_csv_path(session);
    table.write_csv(&points_csv)?;

    let angles_path = paths.angles_path(session);
    run.tools.angles.compute_angles(&AngleJob {
        session,
        config_path: &paths.config_path(session),
        points_csv: &points_csv,
        output: &angles_path,
    })?;

    let angles = Table::read_csv(&angles_path)?;
    let combined =
        combine_points_and_angles(table, &angles, &run.config.analysis.angle_columns)
            .with_context(|| format!("combining points with {}", angles_path.display()))?;
    combined.write_csv(&paths.combined_path(session))?;
    Ok(format!(
        "{} rows x {} columns",
        combined.n_rows(),
        combined.n_cols()
    ))
}
