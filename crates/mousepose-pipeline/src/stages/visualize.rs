//! Joint-angle plots.

use anyhow::Result;
use log::warn;
use mousepose_core::{AnalysisConfig, Table, TableError};

use super::Step;
use crate::run::{PipelineRun, StageReport};
use crate::tools::{Figure, Series};

const LEGEND_FONT_SIZE: f64 = 8.0;

/// Plot the configured angle columns over the configured frame window.
pub fn step_visualize(run: &PipelineRun) -> Result<StageReport> {
    run.run_units(Step::Visualize, run.session_units(), |unit| {
        visualize_session(run, &unit.session)
    })
}

/// Build the angle figure of one session.
///
/// The plot window is clamped to the rows present. A window past the end of
/// the table yields series without points, which plot as bare axes. The x
/// axis is the row index of the angle table.
pub fn angle_figure(
    session: &str,
    angles: &Table,
    analysis: &AnalysisConfig,
) -> Result<Figure, TableError> {
    let selected = angles.select(&analysis.angle_columns)?;
    let rows = selected.n_rows();
    let window = analysis.plot_window;
    let (range, clamped) = window.clamp(rows);
    if range.is_empty() {
        warn!(
            "{session}: plot window {}..{} is past the last row ({rows} rows), plotting axes only",
            window.start, window.end
        );
    } else if clamped {
        warn!(
            "{session}: plot window {}..{} clamped to {}..{} ({rows} rows)",
            window.start, window.end, range.start, range.end
        );
    }

    let first_row = range.start;
    let series = selected
        .slice_rows(range)
        .columns()
        .iter()
        .map(|column| Series {
            name: column.name.clone(),
            points: column
                .values
                .iter()
                .enumerate()
                .map(|(i, &value)| ((first_row + i) as f64, value))
                .collect(),
        })
        .collect();
    Ok(Figure {
        title: format!("Joint Angles for Session {session}"),
        x_label: "Frame".to_string(),
        y_label: "Angle (degrees)".to_string(),
        width: analysis.plot_width,
        height: analysis.plot_height,
        legend_font_size: LEGEND_FONT_SIZE,
        series,
    })
}

fn visualize_session(run: &PipelineRun, session: &str) -> Result<String> {
    let angles = Table::read_csv(&run.paths.angles_path(session))?;
    let figure = angle_figure(session, &angles, &run.config.analysis)?;
    let output = run.paths.plot_path(session);
    run.tools.plotter.plot(&figure, &output)?;
    Ok(format!("plot in {}", output.display()))
}
