//! Feed-forward neural network classifier.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::{sigmoid, validate_fit, validate_predict, Classifier};
use crate::{ModelError, Result};

/// One fully connected layer. `weights[j]` holds the incoming weights of
/// unit `j`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Layer {
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl Layer {
    fn xavier(n_in: usize, n_out: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (n_in + n_out) as f64).sqrt();
        let weights = (0..n_out)
            .map(|_| (0..n_in).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect();
        Self {
            weights,
            biases: vec![0.0; n_out],
        }
    }

    fn pre_activations(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.biases.iter())
            .map(|(row, &bias)| {
                row.iter().zip(input.iter()).map(|(w, x)| w * x).sum::<f64>() + bias
            })
            .collect()
    }
}

/// Multi-layer perceptron with ReLU hidden layers and a sigmoid output.
///
/// Two hidden layers of 100 and 50 units, Xavier-initialized from a fixed
/// seed, trained full-batch on the cross-entropy loss. Expects the
/// standardized feature table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    hidden_sizes: Vec<usize>,
    learning_rate: f64,
    max_iter: usize,
    seed: u64,
    layers: Vec<Layer>,
    n_features: usize,
    fitted: bool,
}

impl Default for MlpClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MlpClassifier {
    /// Create an unfitted network with default hyperparameters.
    pub fn new() -> Self {
        Self {
            hidden_sizes: vec![100, 50],
            learning_rate: 0.05,
            max_iter: 500,
            seed: 42,
            layers: Vec::new(),
            n_features: 0,
            fitted: false,
        }
    }

    /// Set the hidden layer widths.
    pub fn with_hidden_sizes(mut self, hidden_sizes: Vec<usize>) -> Self {
        self.hidden_sizes = hidden_sizes;
        self
    }

    /// Set the number of full-batch iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the initialization seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Activations per layer, input first. Hidden layers apply ReLU, the
    /// final single unit applies the sigmoid.
    fn forward(&self, row: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = vec![row.to_vec()];
        let last = self.layers.len() - 1;
        for (l, layer) in self.layers.iter().enumerate() {
            let z = layer.pre_activations(activations[l].as_slice());
            let a = if l == last {
                z.into_iter().map(sigmoid).collect()
            } else {
                z.into_iter().map(|v| v.max(0.0)).collect()
            };
            activations.push(a);
        }
        activations
    }
}

impl Classifier for MlpClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.n_features = validate_fit(x, y)?;
        let n = x.len() as f64;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut sizes = vec![self.n_features];
        sizes.extend(&self.hidden_sizes);
        sizes.push(1);
        self.layers = sizes
            .windows(2)
            .map(|pair| Layer::xavier(pair[0], pair[1], &mut rng))
            .collect();

        let last = self.layers.len() - 1;
        for _ in 0..self.max_iter {
            let mut grad_w: Vec<Vec<Vec<f64>>> = self
                .layers
                .iter()
                .map(|layer| layer.weights.iter().map(|row| vec![0.0; row.len()]).collect())
                .collect();
            let mut grad_b: Vec<Vec<f64>> = self
                .layers
                .iter()
                .map(|layer| vec![0.0; layer.biases.len()])
                .collect();

            for (row, &label) in x.iter().zip(y.iter()) {
                let activations = self.forward(row);
                // Sigmoid output with cross-entropy: delta is just p - y.
                let mut delta = vec![activations[last + 1][0] - label];

                for l in (0..=last).rev() {
                    let input = &activations[l];
                    for (j, &d) in delta.iter().enumerate() {
                        for (g, &a) in grad_w[l][j].iter_mut().zip(input.iter()) {
                            *g += d * a;
                        }
                        grad_b[l][j] += d;
                    }
                    if l == 0 {
                        break;
                    }
                    let layer = &self.layers[l];
                    delta = (0..input.len())
                        .map(|i| {
                            if input[i] > 0.0 {
                                delta
                                    .iter()
                                    .enumerate()
                                    .map(|(j, &d)| d * layer.weights[j][i])
                                    .sum()
                            } else {
                                0.0
                            }
                        })
                        .collect();
                }
            }

            for (layer, (gw, gb)) in self
                .layers
                .iter_mut()
                .zip(grad_w.iter().zip(grad_b.iter()))
            {
                for (row, grow) in layer.weights.iter_mut().zip(gw.iter()) {
                    for (w, g) in row.iter_mut().zip(grow.iter()) {
                        *w -= self.learning_rate * g / n;
                    }
                }
                for (b, g) in layer.biases.iter_mut().zip(gb.iter()) {
                    *b -= self.learning_rate * g / n;
                }
            }
        }

        let diverged = self
            .layers
            .iter()
            .any(|layer| layer.weights.iter().flatten().any(|w| !w.is_finite()));
        if diverged {
            return Err(ModelError::FitError("training diverged".to_string()));
        }
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        validate_predict(x, self.n_features, self.fitted)?;
        Ok(x.iter()
            .map(|row| {
                let activations = self.forward(row);
                activations[self.layers.len()][0]
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
