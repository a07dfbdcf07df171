//! Common trait for binary classifiers.

use crate::{ModelError, Result};

/// A binary classifier over row-major feature vectors.
///
/// Labels are `f64` values in {0, 1}. `predict_proba` returns the class-1
/// probability per sample; the default `predict` thresholds it at 0.5.
pub trait Classifier: Send + Sync {
    /// Fit the model to training data.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Class-1 probability per sample.
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Hard class labels per sample.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| f64::from(p >= 0.5))
            .collect())
    }

    /// Native per-feature importances, for models that expose them.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// Whether the model has been fitted.
    fn is_fitted(&self) -> bool;
}

/// Validate a training set and return the feature count.
pub(crate) fn validate_fit(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    if x.is_empty() {
        return Err(ModelError::FitError("empty training set".to_string()));
    }
    if x.len() != y.len() {
        return Err(ModelError::FitError(format!(
            "{} samples but {} labels",
            x.len(),
            y.len()
        )));
    }
    let n_features = x[0].len();
    if n_features == 0 {
        return Err(ModelError::FitError("no features".to_string()));
    }
    if x.iter().any(|row| row.len() != n_features) {
        return Err(ModelError::FitError("ragged feature rows".to_string()));
    }
    Ok(n_features)
}

/// Validate a prediction batch against the fitted feature count.
pub(crate) fn validate_predict(x: &[Vec<f64>], n_features: usize, fitted: bool) -> Result<()> {
    if !fitted {
        return Err(ModelError::NotFitted);
    }
    if let Some(row) = x.iter().find(|row| row.len() != n_features) {
        return Err(ModelError::PredictionError(format!(
            "expected {} features, got {}",
            n_features,
            row.len()
        )));
    }
    Ok(())
}

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Dot product plus bias.
pub(crate) fn linear_score(weights: &[f64], bias: f64, row: &[f64]) -> f64 {
    weights.iter().zip(row.iter()).map(|(w, x)| w * x).sum::<f64>() + bias
}
