//! Gradient boosting with logistic loss.

use serde::{Deserialize, Serialize};

use crate::classifier::{sigmoid, validate_fit, validate_predict, Classifier};
use crate::tree::DecisionTree;
use crate::Result;

/// Stage-wise additive ensemble of shallow regression trees.
///
/// The raw score starts at the training log-odds and each stage fits a
/// depth-3 variance tree to the residual `y - sigmoid(score)`, added back
/// with a shrinkage factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    base_score: f64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    fitted: bool,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientBoostingClassifier {
    /// Create an unfitted model with default hyperparameters.
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: 0,
            fitted: false,
        }
    }

    /// Set the number of boosting stages.
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators.max(1);
        self
    }

    /// Set the shrinkage applied to each stage.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    fn raw_score(&self, row: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.predict_value(row)).sum();
        self.base_score + self.learning_rate * boost
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.n_features = validate_fit(x, y)?;
        let n = x.len() as f64;

        // Log-odds prior, clamped away from pure classes.
        let positives: f64 = y.iter().sum();
        let p = (positives / n).clamp(1e-6, 1.0 - 1e-6);
        self.base_score = (p / (1.0 - p)).ln();

        let mut scores = vec![self.base_score; x.len()];
        self.trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let residuals: Vec<f64> = scores
                .iter()
                .zip(y.iter())
                .map(|(&score, &label)| label - sigmoid(score))
                .collect();

            let mut tree = DecisionTree::regressor().with_max_depth(self.max_depth);
            tree.fit(x, &residuals)?;
            for (score, row) in scores.iter_mut().zip(x.iter()) {
                *score += self.learning_rate * tree.predict_value(row);
            }
            self.trees.push(tree);
        }

        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        validate_predict(x, self.n_features, self.fitted)?;
        Ok(x.iter().map(|row| sigmoid(self.raw_score(row))).collect())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        if !self.fitted {
            return None;
        }
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(tree.importances()) {
                *total += value;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            for value in totals.iter_mut() {
                *value /= sum;
            }
        }
        Some(totals)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelError;

    fn clustered_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..15 {
            let jitter = (i as f64) * 0.02;
            x.push(vec![1.0 + jitter, -0.5 + jitter]);
            y.push(1.0);
            x.push(vec![-1.0 - jitter, 0.5 - jitter]);
            y.push(0.0);
        }
        (x, y)
    }

    #[test]
    fn test_fit_separates_clusters() {
        let (x, y) = clustered_data();
        let mut model = GradientBoostingClassifier::new().with_n_estimators(30);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_base_score_is_log_odds() {
        let x = vec![vec![0.0], vec![0.0], vec![0.0], vec![0.0]];
        let y = vec![1.0, 1.0, 1.0, 0.0];
        let mut model = GradientBoostingClassifier::new().with_n_estimators(1);
        model.fit(&x, &y).unwrap();
        assert!((model.base_score - (3.0_f64).ln()).abs() < 1e-10);
    }

    #[test]
    fn test_more_stages_reduce_training_error() {
        let (x, y) = clustered_data();
        let log_loss = |model: &GradientBoostingClassifier| -> f64 {
            model
                .predict_proba(&x)
                .unwrap()
                .iter()
                .zip(y.iter())
                .map(|(&p, &label)| {
                    let p = p.clamp(1e-12, 1.0 - 1e-12);
                    -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
                })
                .sum()
        };
        let mut small = GradientBoostingClassifier::new().with_n_estimators(2);
        let mut large = GradientBoostingClassifier::new().with_n_estimators(40);
        small.fit(&x, &y).unwrap();
        large.fit(&x, &y).unwrap();
        assert!(log_loss(&large) < log_loss(&small));
    }

    #[test]
    fn test_importances_normalized() {
        let (x, y) = clustered_data();
        let mut model = GradientBoostingClassifier::new().with_n_estimators(10);
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = GradientBoostingClassifier::new();
        assert!(matches!(
            model.predict_proba(&[vec![1.0]]),
            Err(ModelError::NotFitted)
        ));
    }
}
