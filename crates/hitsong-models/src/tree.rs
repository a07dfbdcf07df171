//! Decision tree shared by the ensemble models.
//!
//! One arena-based implementation covers both uses: gini impurity with
//! mean-label leaves for classification, variance reduction with mean-target
//! leaves for regression (the boosting base learner). Feature subsampling
//! for forests is seeded per tree.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::validate_fit;
use crate::Result;

/// Split quality criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity over binary labels.
    Gini,
    /// Variance of a continuous target.
    Variance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
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

/// A CART-style decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    criterion: Criterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: Option<usize>,
    seed: u64,
    nodes: Vec<Node>,
    importances: Vec<f64>,
    n_features: usize,
    fitted: bool,
}

impl DecisionTree {
    /// Classification tree (gini, leaves hold the class-1 fraction).
    pub fn classifier() -> Self {
        Self::with_criterion(Criterion::Gini)
    }

    /// Regression tree (variance reduction, leaves hold the target mean).
    pub fn regressor() -> Self {
        Self::with_criterion(Criterion::Variance)
    }

    fn with_criterion(criterion: Criterion) -> Self {
        Self {
            criterion,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
            nodes: Vec::new(),
            importances: Vec::new(),
            n_features: 0,
            fitted: false,
        }
    }

    /// Limit tree depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Minimum samples needed to attempt a split.
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split.max(2);
        self
    }

    /// Number of random features considered per split.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Seed for feature subsampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether the tree has been fitted.
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Normalized impurity-decrease importances.
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Fit the tree on row-major features and targets.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.n_features = validate_fit(x, y)?;
        self.nodes.clear();
        self.importances = vec![0.0; self.n_features];

        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n_total = x.len() as f64;
        self.build(x, y, indices, 0, n_total, &mut rng);

        let total: f64 = self.importances.iter().sum();
        if total > 0.0 {
            for value in self.importances.iter_mut() {
                *value /= total;
            }
        }
        self.fitted = true;
        Ok(())
    }

    /// Predicted value for one sample (class-1 fraction or target mean).
    pub fn predict_value(&self, row: &[f64]) -> f64 {
        // Root is the last node pushed (children are built first).
        let mut index = self.nodes.len() - 1;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
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

    /// Predicted values for a batch.
    pub fn predict_values(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_value(row)).collect()
    }

    fn build(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        n_total: f64,
        rng: &mut StdRng,
    ) -> usize {
        let (impurity, mean) = node_stats(y, &indices, self.criterion);

        let depth_reached = self.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || indices.len() < self.min_samples_split || impurity < 1e-12 {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        }

        let split = self.best_split(x, y, &indices, impurity, rng);
        let Some((feature, threshold, gain)) = split else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        self.importances[feature] += (indices.len() as f64 / n_total) * gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][feature] <= threshold);

        let left = self.build(x, y, left_idx, depth + 1, n_total, rng);
        let right = self.build(x, y, right_idx, depth + 1, n_total, rng);
        self.nodes.push(Node::Split {
            feature,
            threshold,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut StdRng,
    ) -> Option<(usize, f64, f64)> {
        let features: Vec<usize> = match self.max_features {
            Some(m) if m < self.n_features => {
                let mut all: Vec<usize> = (0..self.n_features).collect();
                all.shuffle(rng);
                all.truncate(m);
                all
            }
            _ => (0..self.n_features).collect(),
        };

        let n = indices.len() as f64;
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in features {
            let mut pairs: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (x[i][feature], y[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let total_sum: f64 = pairs.iter().map(|(_, t)| t).sum();
            let total_sq: f64 = pairs.iter().map(|(_, t)| t * t).sum();

            let mut left_n = 0.0;
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for i in 1..pairs.len() {
                let (value, target) = pairs[i - 1];
                left_n += 1.0;
                left_sum += target;
                left_sq += target * target;

                if value == pairs[i].0 {
                    continue;
                }
                let right_n = n - left_n;
                let left_impurity = impurity(left_n, left_sum, left_sq, self.criterion);
                let right_impurity = impurity(
                    right_n,
                    total_sum - left_sum,
                    total_sq - left_sq,
                    self.criterion,
                );
                let weighted = (left_n * left_impurity + right_n * right_impurity) / n;
                let gain = parent_impurity - weighted;
                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    let threshold = (value + pairs[i].0) / 2.0;
                    best = Some((feature, threshold, gain));
                }
            }
        }
        best
    }
}

fn node_stats(y: &[f64], indices: &[usize], criterion: Criterion) -> (f64, f64) {
    let n = indices.len() as f64;
    let sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let sum_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    (impurity(n, sum, sum_sq, criterion), sum / n)
}

fn impurity(n: f64, sum: f64, sum_sq: f64, criterion: Criterion) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    match criterion {
        Criterion::Gini => {
            let p = sum / n;
            2.0 * p * (1.0 - p)
        }
        Criterion::Variance => (sum_sq / n - (sum / n).powi(2)).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_free_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // Single axis-aligned split at x0 = 0.5 separates the classes.
        let x = vec![
            vec![0.1, 5.0],
            vec![0.2, -3.0],
            vec![0.3, 1.0],
            vec![0.7, 2.0],
            vec![0.8, -1.0],
            vec![0.9, 4.0],
        ];
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier_learns_axis_split() {
        let (x, y) = xor_free_data();
        let mut tree = DecisionTree::classifier();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict_values(&x), y);
        assert_eq!(tree.predict_value(&[0.05, 0.0]), 0.0);
        assert_eq!(tree.predict_value(&[0.95, 0.0]), 1.0);
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let (x, y) = xor_free_data();
        let mut tree = DecisionTree::classifier();
        tree.fit(&x, &y).unwrap();
        let imp = tree.importances();
        assert!(imp[0] > imp[1]);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_pure_node_is_single_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![1.0, 1.0, 1.0];
        let mut tree = DecisionTree::classifier();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict_value(&[10.0]), 1.0);
        assert!(tree.importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..16).map(|i| f64::from(i % 2 == 0)).collect();
        let mut tree = DecisionTree::classifier().with_max_depth(1);
        tree.fit(&x, &y).unwrap();
        // Depth 1 means at most one split: three nodes.
        let values = tree.predict_values(&x);
        let distinct: std::collections::BTreeSet<u64> =
            values.iter().map(|v| v.to_bits()).collect();
        assert!(distinct.len() <= 2);
    }

    #[test]
    fn test_regressor_fits_step_function() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 2.0 } else { 8.0 }).collect();
        let mut tree = DecisionTree::regressor().with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        assert!((tree.predict_value(&[1.0]) - 2.0).abs() < 1e-10);
        assert!((tree.predict_value(&[9.0]) - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_feature_subsampling_is_seeded() {
        let (x, y) = xor_free_data();
        let fit_with_seed = |seed| {
            let mut tree = DecisionTree::classifier()
                .with_max_features(1)
                .with_seed(seed);
            tree.fit(&x, &y).unwrap();
            tree.predict_values(&x)
        };
        assert_eq!(fit_with_seed(7), fit_with_seed(7));
    }

    #[test]
    fn test_constant_features_become_leaf() {
        let x = vec![vec![1.0], vec![1.0], vec![1.0], vec![1.0]];
        let y = vec![0.0, 1.0, 0.0, 1.0];
        let mut tree = DecisionTree::classifier();
        tree.fit(&x, &y).unwrap();
        // No valid split exists: the leaf holds the class balance.
        assert!((tree.predict_value(&[1.0]) - 0.5).abs() < 1e-10);
    }
}
