//! Logistic regression fitted by batch gradient descent.
//!
//! Works directly on the upstream-standardized feature table, so plain
//! gradient descent with a fixed learning rate converges well. L2
//! regularization keeps weights bounded on the near-collinear ratio
//! features.

use serde::{Deserialize, Serialize};

use crate::classifier::{linear_score, sigmoid, validate_fit, validate_predict, Classifier};
use crate::{ModelError, Result};

/// Binary logistic regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
    learning_rate: f64,
    l2: f64,
    max_iter: usize,
    fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create an unfitted model with default hyperparameters.
    pub fn new() -> Self {
        Self {
            weights: Vec::new(),
            bias: 0.0,
            learning_rate: 0.1,
            l2: 1e-4,
            max_iter: 1000,
            fitted: false,
        }
    }

    /// Set the gradient-descent step size.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the number of gradient-descent iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Fitted weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Fitted intercept.
    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n_features = validate_fit(x, y)?;
        let n = x.len() as f64;

        self.weights = vec![0.0; n_features];
        self.bias = 0.0;

        for _ in 0..self.max_iter {
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;
            for (row, &label) in x.iter().zip(y.iter()) {
                let error = sigmoid(linear_score(&self.weights, self.bias, row)) - label;
                for (g, value) in grad_w.iter_mut().zip(row.iter()) {
                    *g += error * value;
                }
                grad_b += error;
            }
            for (w, g) in self.weights.iter_mut().zip(grad_w.iter()) {
                *w -= self.learning_rate * (g / n + self.l2 * *w);
            }
            self.bias -= self.learning_rate * grad_b / n;
        }

        if self.weights.iter().any(|w| !w.is_finite()) || !self.bias.is_finite() {
            return Err(ModelError::FitError(
                "gradient descent diverged".to_string(),
            ));
        }
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        validate_predict(x, self.weights.len(), self.fitted)?;
        Ok(x.iter()
            .map(|row| sigmoid(linear_score(&self.weights, self.bias, row)))
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // Class 1 clusters around +1, class 0 around -1.
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let jitter = (i as f64) * 0.01;
            x.push(vec![1.0 + jitter, 0.8 - jitter]);
            y.push(1.0);
            x.push(vec![-1.0 - jitter, -0.8 + jitter]);
            y.push(0.0);
        }
        (x, y)
    }

    #[test]
    fn test_fit_separates_clusters() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        assert_eq!(correct, x.len());
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        for p in model.predict_proba(&x).unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_feature_count_mismatch_fails() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0, 2.0, 3.0]]),
            Err(ModelError::PredictionError(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let (x, y) = separable_data();
        let mut a = LogisticRegression::new();
        let mut b = LogisticRegression::new();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn test_no_native_importances() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert!(model.feature_importances().is_none());
    }
}
