//! Z-score standardization with stored parameters.
//!
//! The scaler is fit once and applied many times: fitted per-column means
//! and standard deviations are kept on the struct (and serialize with it),
//! so a scaler fit on training data transforms later batches consistently.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Standardize columns to zero mean and unit variance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
    fitted: bool,
}

impl StandardScaler {
    /// Create an unfitted scaler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the scaler has been fitted.
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Number of columns the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Fitted per-column means.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fitted per-column standard deviations.
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Learn per-column mean and standard deviation. Non-finite values are
    /// ignored in the statistics; near-constant columns get unit scale so
    /// transforming maps them to zero.
    pub fn fit(&mut self, columns: &[Vec<f64>]) {
        self.means.clear();
        self.stds.clear();
        for column in columns {
            let finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
            if finite.is_empty() {
                self.means.push(0.0);
                self.stds.push(1.0);
                continue;
            }
            let n = finite.len() as f64;
            let mean = finite.iter().sum::<f64>() / n;
            let variance = finite.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();
            self.means.push(mean);
            self.stds.push(if std_dev < 1e-10 { 1.0 } else { std_dev });
        }
        self.fitted = true;
    }

    /// Transform columns with the fitted parameters.
    pub fn transform(&self, columns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if !self.fitted {
            return Err(CoreError::NotFitted);
        }
        if columns.len() != self.means.len() {
            return Err(CoreError::LengthMismatch {
                name: "columns".to_string(),
                expected: self.means.len(),
                actual: columns.len(),
            });
        }
        Ok(columns
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(column, (mean, std))| column.iter().map(|x| (x - mean) / std).collect())
            .collect())
    }

    /// Fit then transform in one call.
    pub fn fit_transform(&mut self, columns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.fit(columns);
        self.transform(columns)
    }

    /// Undo the transformation.
    pub fn inverse_transform(&self, columns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if !self.fitted {
            return Err(CoreError::NotFitted);
        }
        if columns.len() != self.means.len() {
            return Err(CoreError::LengthMismatch {
                name: "columns".to_string(),
                expected: self.means.len(),
                actual: columns.len(),
            });
        }
        Ok(columns
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(column, (mean, std))| column.iter().map(|x| x * std + mean).collect())
            .collect())
    }

    /// Fit on row-major feature vectors (one `Vec<f64>` per sample).
    pub fn fit_rows(&mut self, rows: &[Vec<f64>]) {
        let columns = transpose(rows);
        self.fit(&columns);
    }

    /// Transform row-major feature vectors with the fitted parameters.
    pub fn transform_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if !self.fitted {
            return Err(CoreError::NotFitted);
        }
        rows.iter()
            .map(|row| {
                if row.len() != self.means.len() {
                    return Err(CoreError::LengthMismatch {
                        name: "row".to_string(),
                        expected: self.means.len(),
                        actual: row.len(),
                    });
                }
                Ok(row
                    .iter()
                    .zip(self.means.iter().zip(self.stds.iter()))
                    .map(|(x, (mean, std))| (x - mean) / std)
                    .collect())
            })
            .collect()
    }
}

fn transpose(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n_cols = rows.first().map_or(0, |r| r.len());
    let mut columns = vec![Vec::with_capacity(rows.len()); n_cols];
    for row in rows {
        for (j, value) in row.iter().enumerate() {
            columns[j].push(*value);
        }
    }
    columns
}
