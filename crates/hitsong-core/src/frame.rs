//! Column-oriented table for song records.
//!
//! A `Frame` holds named columns of equal length. Numeric columns use `f64`
//! with `NaN` marking missing values; categorical columns use `String` with
//! the empty string marking missing values. Column order is preserved, which
//! keeps the engineered feature set deterministic.

use crate::error::{CoreError, Result};

/// Columns that never enter the feature matrix: the label, the partitioning
/// key and identifier/text columns from the source dataset.
pub const EXCLUDED_COLUMNS: [&str; 6] = ["target", "decade", "uri", "track", "artist", "id"];

/// A single column of data.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric values; `NaN` marks a missing entry.
    Numeric(Vec<f64>),
    /// Categorical values; the empty string marks a missing entry.
    Categorical(Vec<String>),
}

impl Column {
    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    /// Whether the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the column holds numeric data.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Column::Numeric(_) => "numeric",
            Column::Categorical(_) => "categorical",
        }
    }
}

/// An in-memory table of named, equally sized columns.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Frame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from named columns, validating equal lengths.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut frame = Frame::new();
        for (name, column) in columns {
            frame.insert(name, column)?;
        }
        Ok(frame)
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Borrow a numeric column's values.
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Numeric(v)) => Ok(v),
            Some(Column::Categorical(_)) => Err(CoreError::TypeMismatch {
                name: name.to_string(),
                expected: "numeric",
            }),
            None => Err(CoreError::ColumnNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Borrow a categorical column's values.
    pub fn categorical(&self, name: &str) -> Result<&[String]> {
        match self.column(name) {
            Some(Column::Categorical(v)) => Ok(v),
            Some(Column::Numeric(_)) => Err(CoreError::TypeMismatch {
                name: name.to_string(),
                expected: "categorical",
            }),
            None => Err(CoreError::ColumnNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Insert a column, replacing any existing column of the same name.
    pub fn insert(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(CoreError::LengthMismatch {
                name,
                expected: self.n_rows,
                actual: column.len(),
            });
        }
        if let Some(i) = self.names.iter().position(|n| *n == name) {
            self.columns[i] = column;
        } else {
            if self.columns.is_empty() {
                self.n_rows = column.len();
            }
            self.names.push(name);
            self.columns.push(column);
        }
        Ok(())
    }

    /// Rename a column in place.
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> Result<()> {
        match self.names.iter_mut().find(|n| *n == from) {
            Some(name) => {
                *name = to.into();
                Ok(())
            }
            None => Err(CoreError::ColumnNotFound {
                name: from.to_string(),
            }),
        }
    }

    /// Names of all numeric columns, in column order.
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.names
            .iter()
            .zip(self.columns.iter())
            .filter(|(_, c)| c.is_numeric())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Build a new frame from a subset of rows, preserving column order.
    pub fn select_rows(&self, indices: &[usize]) -> Frame {
        let mut frame = Frame::new();
        for (name, column) in self.names.iter().zip(self.columns.iter()) {
            let taken = match column {
                Column::Numeric(v) => Column::Numeric(indices.iter().map(|&i| v[i]).collect()),
                Column::Categorical(v) => {
                    Column::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
                }
            };
            // Lengths agree by construction.
            let _ = frame.insert(name.clone(), taken);
        }
        frame
    }

    /// Drop exact-duplicate rows, keeping the first occurrence.
    pub fn drop_duplicates(&self) -> Frame {
        use std::collections::HashSet;

        let mut seen: HashSet<String> = HashSet::with_capacity(self.n_rows);
        let mut keep: Vec<usize> = Vec::with_capacity(self.n_rows);
        for row in 0..self.n_rows {
            let key = self.row_key(row);
            if seen.insert(key) {
                keep.push(row);
            }
        }
        self.select_rows(&keep)
    }

    /// Replace `NaN` entries in every numeric column with that column's
    /// median. Columns with no finite values are left untouched.
    pub fn impute_numeric_median(&mut self) {
        for column in self.columns.iter_mut() {
            if let Column::Numeric(values) = column {
                if let Some(median) = median(values) {
                    for v in values.iter_mut() {
                        if v.is_nan() {
                            *v = median;
                        }
                    }
                }
            }
        }
    }

    /// Concatenate frames row-wise with column-union semantics: columns
    /// missing from a frame are filled with `NaN` (numeric) or the empty
    /// string (categorical). Type conflicts between frames are an error.
    pub fn concat(frames: &[Frame]) -> Result<Frame> {
        let total_rows: usize = frames.iter().map(|f| f.n_rows).sum();

        // Column order: first appearance across the inputs.
        let mut names: Vec<String> = Vec::new();
        let mut kinds: Vec<&'static str> = Vec::new();
        for frame in frames {
            for (name, column) in frame.names.iter().zip(frame.columns.iter()) {
                match names.iter().position(|n| n == name) {
                    Some(i) => {
                        if kinds[i] != column.kind() {
                            return Err(CoreError::SchemaMismatch {
                                name: name.clone(),
                                reason: format!("{} vs {}", kinds[i], column.kind()),
                            });
                        }
                    }
                    None => {
                        names.push(name.clone());
                        kinds.push(column.kind());
                    }
                }
            }
        }

        let mut out = Frame::new();
        for (name, kind) in names.iter().zip(kinds.iter()) {
            let column = if *kind == "numeric" {
                let mut values = Vec::with_capacity(total_rows);
                for frame in frames {
                    match frame.column(name) {
                        Some(Column::Numeric(v)) => values.extend_from_slice(v),
                        _ => values.extend(std::iter::repeat(f64::NAN).take(frame.n_rows)),
                    }
                }
                Column::Numeric(values)
            } else {
                let mut values = Vec::with_capacity(total_rows);
                for frame in frames {
                    match frame.column(name) {
                        Some(Column::Categorical(v)) => values.extend_from_slice(v),
                        _ => values.extend(std::iter::repeat(String::new()).take(frame.n_rows)),
                    }
                }
                Column::Categorical(values)
            };
            out.insert(name.clone(), column)?;
        }
        Ok(out)
    }

    /// Sorted unique values of a categorical column.
    pub fn unique_categories(&self, name: &str) -> Result<Vec<String>> {
        let values = self.categorical(name)?;
        let mut unique: Vec<String> = values.to_vec();
        unique.sort();
        unique.dedup();
        Ok(unique)
    }

    fn row_key(&self, row: usize) -> String {
        let mut key = String::new();
        for column in &self.columns {
            match column {
                // Bit pattern keeps NaN rows comparable.
                Column::Numeric(v) => key.push_str(&format!("{:x}", v[row].to_bits())),
                Column::Categorical(v) => key.push_str(&v[row]),
            }
            key.push('\u{1f}');
        }
        key
    }
}

/// Median of the finite values in a slice; `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    } else {
        Some(finite[mid])
    }
}
