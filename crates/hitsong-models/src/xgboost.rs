//! Second-order gradient boosting in the XGBoost style.

use serde::{Deserialize, Serialize};

use crate::classifier::{sigmoid, validate_fit, validate_predict, Classifier};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum BoostNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single boosted tree grown on gradient and hessian statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoostTree {
    nodes: Vec<BoostNode>,
}

impl BoostTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut index = self.nodes.len() - 1;
        loop {
            match &self.nodes[index] {
                BoostNode::Leaf { value } => return *value,
                BoostNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    lambda: f64,
    max_depth: usize,
    nodes: Vec<BoostNode>,
    gains: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn leaf_value(&self, indices: &[usize]) -> f64 {
        let g: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        -g / (h + self.lambda)
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.lambda)
    }

    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        if depth >= self.max_depth || indices.len() < 2 {
            let value = self.leaf_value(&indices);
            self.nodes.push(BoostNode::Leaf { value });
            return self.nodes.len() - 1;
        }

        let Some((feature, threshold, gain)) = self.best_split(&indices) else {
            let value = self.leaf_value(&indices);
            self.nodes.push(BoostNode::Leaf { value });
            return self.nodes.len() - 1;
        };

        self.gains[feature] += gain;
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][feature] <= threshold);
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes.push(BoostNode::Split {
            feature,
            threshold,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    fn best_split(&self, indices: &[usize]) -> Option<(usize, f64, f64)> {
        let total_g: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let total_h: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        let parent = self.score(total_g, total_h);
        let n_features = self.x[0].len();
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in 0..n_features {
            let mut triples: Vec<(f64, f64, f64)> = indices
                .iter()
                .map(|&i| (self.x[i][feature], self.grad[i], self.hess[i]))
                .collect();
            triples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_g = 0.0;
            let mut left_h = 0.0;
            for i in 1..triples.len() {
                let (value, g, h) = triples[i - 1];
                left_g += g;
                left_h += h;
                if value == triples[i].0 {
                    continue;
                }
                let gain = 0.5
                    * (self.score(left_g, left_h)
                        + self.score(total_g - left_g, total_h - left_h)
                        - parent);
                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    let threshold = (value + triples[i].0) / 2.0;
                    best = Some((feature, threshold, gain));
                }
            }
        }
        best
    }
}

/// Boosted ensemble using second-order loss statistics.
///
/// Each round grows a depth-limited tree on the per-sample gradient
/// `p - y` and hessian `p(1 - p)` of the logistic loss; leaves take the
/// L2-regularized Newton step `-G / (H + lambda)`. The raw score starts
/// at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XgboostClassifier {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    lambda: f64,
    trees: Vec<BoostTree>,
    gains: Vec<f64>,
    n_features: usize,
    fitted: bool,
}

impl Default for XgboostClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl XgboostClassifier {
    /// Create an unfitted model with default hyperparameters.
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            trees: Vec::new(),
            gains: Vec::new(),
            n_features: 0,
            fitted: false,
        }
    }

    /// Set the number of boosting rounds.
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators.max(1);
        self
    }

    /// Set the maximum depth per tree.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    fn raw_score(&self, row: &[f64]) -> f64 {
        self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

impl Classifier for XgboostClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.n_features = validate_fit(x, y)?;
        self.trees = Vec::with_capacity(self.n_estimators);
        self.gains = vec![0.0; self.n_features];

        let mut scores = vec![0.0; x.len()];
        for _ in 0..self.n_estimators {
            let mut grad = Vec::with_capacity(x.len());
            let mut hess = Vec::with_capacity(x.len());
            for (&score, &label) in scores.iter().zip(y.iter()) {
                let p = sigmoid(score);
                grad.push(p - label);
                hess.push((p * (1.0 - p)).max(1e-16));
            }

            let mut builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                lambda: self.lambda,
                max_depth: self.max_depth,
                nodes: Vec::new(),
                gains: vec![0.0; self.n_features],
            };
            builder.build((0..x.len()).collect(), 0);
            let tree = BoostTree {
                nodes: builder.nodes,
            };
            for (total, gain) in self.gains.iter_mut().zip(builder.gains.iter()) {
                *total += gain;
            }

            for (score, row) in scores.iter_mut().zip(x.iter()) {
                *score += self.learning_rate * tree.predict(row);
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
        let sum: f64 = self.gains.iter().sum();
        if sum > 0.0 {
            Some(self.gains.iter().map(|g| g / sum).collect())
        } else {
            Some(self.gains.clone())
        }
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
            x.push(vec![1.2 + jitter, -0.3 + jitter]);
            y.push(1.0);
            x.push(vec![-1.2 - jitter, 0.3 - jitter]);
            y.push(0.0);
        }
        (x, y)
    }

    #[test]
    fn test_fit_separates_clusters() {
        let (x, y) = clustered_data();
        let mut model = XgboostClassifier::new().with_n_estimators(20);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_single_round_newton_leaf() {
        // One constant-feature round: leaf = -G / (H + lambda) with p = 0.5.
        let x = vec![vec![0.0], vec![0.0]];
        let y = vec![1.0, 1.0];
        let mut model = XgboostClassifier::new().with_n_estimators(1);
        model.fit(&x, &y).unwrap();
        let expected_leaf = 1.0 / (0.5 + 1.0);
        let expected_p = sigmoid(0.3 * expected_leaf);
        let p = model.predict_proba(&[vec![0.0]]).unwrap()[0];
        assert!((p - expected_p).abs() < 1e-10);
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let (x, y) = clustered_data();
        let mut model = XgboostClassifier::new().with_n_estimators(10);
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert!(imp[0] > imp[1]);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_deterministic() {
        let (x, y) = clustered_data();
        let run = || {
            let mut model = XgboostClassifier::new().with_n_estimators(5);
            model.fit(&x, &y).unwrap();
            model.predict_proba(&[vec![0.4, 0.0]]).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = XgboostClassifier::new();
        assert!(matches!(
            model.predict_proba(&[vec![1.0]]),
            Err(ModelError::NotFitted)
        ));
    }
}
