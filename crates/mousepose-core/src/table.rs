//! Column-oriented numeric tables with CSV I/O.
//!
//! The CSV dialect matches what pandas reads and writes by default: a header
//! row, comma separators, and empty cells for missing values (`NaN`).

use std::ops::Range;
use std::path::Path;

use crate::error::TableError;

/// One named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
    /// Written without a fractional part (frame numbers, indices).
    pub integer: bool,
}

impl Column {
    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            integer: false,
        }
    }

    pub fn integer(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            integer: true,
        }
    }
}

/// A rectangular table of `f64` columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns of equal length and unique names.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut table = Self::new();
        for column in columns {
            table.push(column)?;
        }
        Ok(table)
    }

    /// Append a column.
    ///
    /// # Errors
    ///
    /// Fails if the name already exists or the length differs from the
    /// existing columns.
    pub fn push(&mut self, column: Column) -> Result<(), TableError> {
        if self.column(&column.name).is_some() {
            return Err(TableError::DuplicateColumn(column.name));
        }
        if !self.columns.is_empty() && column.values.len() != self.n_rows() {
            return Err(TableError::RaggedColumn {
                expected: self.n_rows(),
                found: column.values.len(),
                column: column.name,
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// New table with the named columns, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, TableError> {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column(name)
                    .cloned()
                    .ok_or_else(|| TableError::MissingColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_columns(columns)
    }

    /// Column-wise concatenation by row position.
    ///
    /// There is no join key: both tables must have the same number of rows,
    /// otherwise [`TableError::RowCountMismatch`] is returned.
    pub fn hconcat(mut self, other: Table) -> Result<Self, TableError> {
        if !self.columns.is_empty()
            && !other.columns.is_empty()
            && self.n_rows() != other.n_rows()
        {
            return Err(TableError::RowCountMismatch {
                left: self.n_rows(),
                right: other.n_rows(),
            });
        }
        for column in other.columns {
            self.push(column)?;
        }
        Ok(self)
    }

    /// Rows in `range`; the range must lie inside the table.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[range.clone()].to_vec(),
                    integer: c.integer,
                })
                .collect(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // CSV
    // ─────────────────────────────────────────────────────────────────────────

    /// Read a CSV file with a header row.
    ///
    /// Empty cells and `nan` parse as `NaN`. A column is flagged integer when
    /// every cell parses as `i64`.
    pub fn read_csv(path: &Path) -> Result<Self, TableError> {
        let csv_err = |source: csv::Error| TableError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
        let headers = reader.headers().map_err(csv_err)?.clone();

        let mut values: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
        let mut integer = vec![true; headers.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            for (col, cell) in record.iter().enumerate() {
                let cell = cell.trim();
                let value = parse_cell(cell).ok_or_else(|| TableError::Parse {
                    column: headers[col].to_string(),
                    row,
                    value: cell.to_string(),
                })?;
                integer[col] &= cell.parse::<i64>().is_ok();
                values[col].push(value);
            }
        }

        let columns = headers
            .iter()
            .zip(values)
            .zip(integer)
            .map(|((name, values), integer)| Column {
                name: name.to_string(),
                values,
                integer,
            })
            .collect();
        Self::from_columns(columns)
    }

    /// Write the table as CSV with a header row and no index column.
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let csv_err = |source: csv::Error| TableError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
        writer.write_record(self.column_names()).map_err(csv_err)?;
        for row in 0..self.n_rows() {
            let record = self
                .columns
                .iter()
                .map(|c| format_cell(c.values[row], c.integer));
            writer.write_record(record).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

fn format_cell(value: f64, integer: bool) -> String {
    if value.is_nan() {
        String::new()
    } else if integer && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{value:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::float("a", vec![1.0, 2.5, 3.0]),
            Column::float("b", vec![0.1, f64::NAN, -4.0]),
            Column::integer("fnum", vec![1.0, 2.0, 3.0]),
        ])
        .unwrap()
    }

    #[test]
    fn select_keeps_requested_order() {
        let table = sample();
        let picked = table.select(&["fnum", "a"]).unwrap();
        assert_eq!(picked.column_names(), vec!["fnum", "a"]);
        assert_eq!(picked.n_rows(), 3);
    }

    #[test]
    fn select_reports_missing_column() {
        let err = sample().select(&["a", "zzz"]).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(name) if name == "zzz"));
    }

    #[test]
    fn push_rejects_ragged_and_duplicate_columns() {
        let mut table = sample();
        let ragged = table.push(Column::float("c", vec![1.0]));
        assert!(matches!(ragged, Err(TableError::RaggedColumn { expected: 3, found: 1, .. })));
        let dup = table.push(Column::float("a", vec![0.0; 3]));
        assert!(matches!(dup, Err(TableError::DuplicateColumn(_))));
    }

    #[test]
    fn hconcat_requires_equal_row_counts() {
        let left = sample();
        let right = Table::from_columns(vec![Column::float("c", vec![7.0, 8.0, 9.0])]).unwrap();
        let combined = left.clone().hconcat(right).unwrap();
        assert_eq!(combined.n_cols(), 4);
        assert_eq!(combined.n_rows(), 3);
        assert_eq!(combined.column("c").unwrap().values, vec![7.0, 8.0, 9.0]);

        let short = Table::from_columns(vec![Column::float("c", vec![7.0, 8.0])]).unwrap();
        let err = left.hconcat(short).unwrap_err();
        assert!(matches!(err, TableError::RowCountMismatch { left: 3, right: 2 }));
    }

    #[test]
    fn slice_rows_takes_window() {
        let rows = sample().slice_rows(1..3);
        assert_eq!(rows.n_rows(), 2);
        assert_eq!(rows.column("a").unwrap().values, vec![2.5, 3.0]);
    }

    #[test]
    fn csv_round_trip_preserves_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        sample().write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("a,b,fnum"));
        assert_eq!(lines.next(), Some("1.0,0.1,1"));
        assert_eq!(lines.next(), Some("2.5,,2"));

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(back.column_names(), vec!["a", "b", "fnum"]);
        assert!(back.column("b").unwrap().values[1].is_nan());
        assert!(back.column("fnum").unwrap().integer);
        assert!(!back.column("a").unwrap().integer);
    }

    #[test]
    fn read_csv_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "x,y\n1,2\n3,oops\n").unwrap();
        let err = Table::read_csv(&path).unwrap_err();
        assert!(matches!(err, TableError::Parse { row: 1, .. }));
    }
}
