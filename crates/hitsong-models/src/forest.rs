//! Random forest of bagged decision trees.

use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::{validate_fit, validate_predict, Classifier};
use crate::tree::DecisionTree;
use crate::Result;

/// Bagged ensemble of gini decision trees.
///
/// Each tree fits a bootstrap resample and considers sqrt(k) random
/// features per split. Trees are fitted in parallel; per-tree seeds are
/// derived from the forest seed so results do not depend on scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_trees: usize,
    max_depth: Option<usize>,
    seed: u64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    fitted: bool,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomForestClassifier {
    /// Create an unfitted forest with default hyperparameters.
    pub fn new() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            seed: 42,
            trees: Vec::new(),
            n_features: 0,
            fitted: false,
        }
    }

    /// Set the ensemble size.
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees.max(1);
        self
    }

    /// Limit the depth of each tree.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Set the forest seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.n_features = validate_fit(x, y)?;
        let n = x.len();
        let max_features = (self.n_features as f64).sqrt().ceil() as usize;

        self.trees = (0..self.n_trees)
            .into_par_iter()
            .map(|i| {
                let tree_seed = self.seed.wrapping_add(i as u64);
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let sample_x: Vec<Vec<f64>> = sample.iter().map(|&j| x[j].clone()).collect();
                let sample_y: Vec<f64> = sample.iter().map(|&j| y[j]).collect();

                let mut tree = DecisionTree::classifier()
                    .with_max_features(max_features)
                    .with_seed(tree_seed);
                if let Some(depth) = self.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                tree.fit(&sample_x, &sample_y).map(|_| tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        validate_predict(x, self.n_features, self.fitted)?;
        let n_trees = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| {
                let total: f64 = self.trees.iter().map(|t| t.predict_value(row)).sum();
                total / n_trees
            })
            .collect())
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
