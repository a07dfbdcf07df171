//! Linear support vector machine with probability calibration.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::{linear_score, sigmoid, validate_fit, validate_predict, Classifier};
use crate::{ModelError, Result};

/// Linear SVM trained with the Pegasos stochastic subgradient method.
///
/// Hinge loss drives the margin; a Platt sigmoid fitted to the training
/// decision values maps margins to probabilities so the model plugs into
/// the same probability-based evaluation as the rest of the family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    weights: Vec<f64>,
    bias: f64,
    lambda: f64,
    epochs: usize,
    seed: u64,
    platt_a: f64,
    platt_b: f64,
    fitted: bool,
}

impl Default for SvmClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SvmClassifier {
    /// Create an unfitted model with default hyperparameters.
    pub fn new() -> Self {
        Self {
            weights: Vec::new(),
            bias: 0.0,
            lambda: 1e-4,
            epochs: 50,
            seed: 42,
            platt_a: 1.0,
            platt_b: 0.0,
            fitted: false,
        }
    }

    /// Set the number of passes over the training set.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs.max(1);
        self
    }

    /// Set the regularization strength.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Set the sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Signed distance to the separating hyperplane.
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        linear_score(&self.weights, self.bias, row)
    }

    fn fit_platt(&mut self, decisions: &[f64], y: &[f64]) {
        // Gradient descent on the calibration log loss.
        let n = decisions.len() as f64;
        let mut a = 1.0;
        let mut b = 0.0;
        for _ in 0..200 {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;
            for (&d, &label) in decisions.iter().zip(y.iter()) {
                let error = sigmoid(a * d + b) - label;
                grad_a += error * d;
                grad_b += error;
            }
            a -= 0.1 * grad_a / n;
            b -= 0.1 * grad_b / n;
        }
        self.platt_a = a;
        self.platt_b = b;
    }
}

impl Classifier for SvmClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n_features = validate_fit(x, y)?;
        let n = x.len();

        // Hinge loss wants labels in {-1, +1}.
        let signed: Vec<f64> = y.iter().map(|&v| if v > 0.5 { 1.0 } else { -1.0 }).collect();

        self.weights = vec![0.0; n_features];
        self.bias = 0.0;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut t = 0usize;

        for _ in 0..self.epochs {
            for _ in 0..n {
                t += 1;
                let i = rng.gen_range(0..n);
                let eta = 1.0 / (self.lambda * t as f64);
                let margin = signed[i] * linear_score(&self.weights, self.bias, &x[i]);

                let shrink = 1.0 - eta * self.lambda;
                for w in self.weights.iter_mut() {
                    *w *= shrink;
                }
                if margin < 1.0 {
                    for (w, &value) in self.weights.iter_mut().zip(x[i].iter()) {
                        *w += eta * signed[i] * value;
                    }
                    self.bias += eta * signed[i];
                }
            }
        }

        if self.weights.iter().any(|w| !w.is_finite()) || !self.bias.is_finite() {
            return Err(ModelError::FitError(
                "subgradient descent diverged".to_string(),
            ));
        }

        let decisions: Vec<f64> = x.iter().map(|row| self.decision_function(row)).collect();
        self.fit_platt(&decisions, y);
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        validate_predict(x, self.weights.len(), self.fitted)?;
        Ok(x.iter()
            .map(|row| sigmoid(self.platt_a * self.decision_function(row) + self.platt_b))
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
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let jitter = (i as f64) * 0.01;
            x.push(vec![1.5 + jitter, 1.0 - jitter]);
            y.push(1.0);
            x.push(vec![-1.5 - jitter, -1.0 + jitter]);
            y.push(0.0);
        }
        (x, y)
    }

    #[test]
    fn test_fit_separates_clusters() {
        let (x, y) = separable_data();
        let mut model = SvmClassifier::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_calibrated_probabilities_track_margin_sign() {
        let (x, y) = separable_data();
        let mut model = SvmClassifier::new();
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&x).unwrap();
        for (p, &label) in probs.iter().zip(y.iter()) {
            assert!((0.0..=1.0).contains(p));
            if label > 0.5 {
                assert!(*p > 0.5);
            } else {
                assert!(*p < 0.5);
            }
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let (x, y) = separable_data();
        let run = || {
            let mut model = SvmClassifier::new().with_seed(3);
            model.fit(&x, &y).unwrap();
            model.predict_proba(&[vec![0.2, -0.1]]).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = SvmClassifier::new();
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_no_native_importances() {
        let (x, y) = separable_data();
        let mut model = SvmClassifier::new();
        model.fit(&x, &y).unwrap();
        assert!(model.feature_importances().is_none());
    }
}
