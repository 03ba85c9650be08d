//! `.npy` array I/O and the 3D point table hand-off.

use std::path::Path;

use ndarray::{ArrayBase, ArrayD, Data, Dimension};
use ndarray_npy::WritableElement;

use crate::error::ArrayError;
use crate::table::{Column, Table};

/// Name of the 1-based frame number column appended to the point table.
pub const FRAME_COLUMN: &str = "fnum";

const AXES: [&str; 3] = ["x", "y", "z"];

/// Read an `f64` `.npy` array of any dimensionality.
pub fn read_array(path: &Path) -> Result<ArrayD<f64>, ArrayError> {
    ndarray_npy::read_npy(path).map_err(|source| ArrayError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Write an array as `.npy`.
pub fn write_array<S, D>(path: &Path, array: &ArrayBase<S, D>) -> Result<(), ArrayError>
where
    S: Data,
    S::Elem: WritableElement,
    D: Dimension,
{
    ndarray_npy::write_npy(path, array).map_err(|source| ArrayError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Column names `{bodypart}_{x|y|z}`, body-part major.
pub fn point_columns<S: AsRef<str>>(body_parts: &[S]) -> Vec<String> {
    body_parts
        .iter()
        .flat_map(|bp| AXES.iter().map(move |axis| format!("{}_{axis}", bp.as_ref())))
        .collect()
}

/// Flatten a 3D point array into one row per frame.
///
/// The array is read in row-major order and split into rows of
/// `3 * body_parts.len()` values, so `(frames, body_parts, 3)` arrays and
/// already-flat arrays give the same table. A `fnum` column numbering the
/// frames from 1 is appended.
///
/// # Errors
///
/// [`ArrayError::NoBodyParts`] for an empty body-part list and
/// [`ArrayError::Indivisible`] when the element count is not a multiple of
/// the row width.
pub fn points_to_table<S: AsRef<str>>(
    points: &ArrayD<f64>,
    body_parts: &[S],
) -> Result<Table, ArrayError> {
    if body_parts.is_empty() {
        return Err(ArrayError::NoBodyParts);
    }
    let width = body_parts.len() * 3;
    let elements = points.len();
    if elements % width != 0 {
        return Err(ArrayError::Indivisible {
            elements,
            body_parts: body_parts.len(),
        });
    }
    let frames = elements / width;
    let flat: Vec<f64> = points.iter().copied().collect();

    let mut columns: Vec<Column> = point_columns(body_parts)
        .into_iter()
        .enumerate()
        .map(|(j, name)| {
            let values = (0..frames).map(|f| flat[f * width + j]).collect();
            Column::float(name, values)
        })
        .collect();
    columns.push(Column::integer(
        FRAME_COLUMN,
        (1..=frames).map(|f| f as f64).collect(),
    ));

    Ok(Table::from_columns(columns)?)
}
