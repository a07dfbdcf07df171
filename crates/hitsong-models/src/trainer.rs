//! Trains, cross-validates, persists and ranks the classifier family.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use hitsong_core::metrics::accuracy_score;
use hitsong_core::{
    median, stratified_k_fold, stratified_train_test_split, Frame, StandardScaler,
    EXCLUDED_COLUMNS,
};

use crate::classifier::Classifier;
use crate::{
    GradientBoostingClassifier, LogisticRegression, MlpClassifier, ModelError,
    RandomForestClassifier, Result, SvmClassifier, XgboostClassifier,
};

/// Trainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Fraction of rows held out for testing.
    pub test_ratio: f64,
    /// Number of stratified cross-validation folds.
    pub cv_folds: usize,
    /// Seed shared by the split, the folds and every model.
    pub seed: u64,
    /// Directory persisted models are written to.
    pub models_dir: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.25,
            cv_folds: 5,
            seed: 42,
            models_dir: PathBuf::from("models/saved_models"),
        }
    }
}

/// The classifier families the trainer knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
    Svm,
    NeuralNetwork,
    Xgboost,
}

/// A registry entry: display name, family and its capability tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    /// Whether the model wants a scaler fit on its training rows.
    pub requires_scaling: bool,
}

impl ModelSpec {
    fn new(name: &str, kind: ModelKind, requires_scaling: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            requires_scaling,
        }
    }
}

/// The default six-model registry.
pub fn default_model_specs() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("Logistic Regression", ModelKind::LogisticRegression, false),
        ModelSpec::new("Random Forest", ModelKind::RandomForest, false),
        ModelSpec::new("Gradient Boosting", ModelKind::GradientBoosting, false),
        ModelSpec::new("SVM", ModelKind::Svm, true),
        ModelSpec::new("Neural Network", ModelKind::NeuralNetwork, true),
        ModelSpec::new("XGBoost", ModelKind::Xgboost, false),
    ]
}

/// A concrete classifier behind a serializable sum type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassifierKind {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForestClassifier),
    GradientBoosting(GradientBoostingClassifier),
    Svm(SvmClassifier),
    NeuralNetwork(MlpClassifier),
    Xgboost(XgboostClassifier),
}

impl ClassifierKind {
    /// Build an unfitted classifier of the given family, seeded where the
    /// family is stochastic.
    pub fn build(kind: ModelKind, seed: u64) -> Self {
        match kind {
            ModelKind::LogisticRegression => {
                Self::LogisticRegression(LogisticRegression::new())
            }
            ModelKind::RandomForest => {
                Self::RandomForest(RandomForestClassifier::new().with_seed(seed))
            }
            ModelKind::GradientBoosting => {
                Self::GradientBoosting(GradientBoostingClassifier::new())
            }
            ModelKind::Svm => Self::Svm(SvmClassifier::new().with_seed(seed)),
            ModelKind::NeuralNetwork => Self::NeuralNetwork(MlpClassifier::new().with_seed(seed)),
            ModelKind::Xgboost => Self::Xgboost(XgboostClassifier::new()),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::LogisticRegression(m) => m,
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
            Self::Svm(m) => m,
            Self::NeuralNetwork(m) => m,
            Self::Xgboost(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Self::LogisticRegression(m) => m,
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
            Self::Svm(m) => m,
            Self::NeuralNetwork(m) => m,
            Self::Xgboost(m) => m,
        }
    }
}

impl Classifier for ClassifierKind {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.inner().predict_proba(x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.inner().feature_importances()
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

/// A fitted classifier bundled with the scaler it was trained behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub name: String,
    pub classifier: ClassifierKind,
    pub scaler: Option<StandardScaler>,
}

impl TrainedModel {
    fn apply_scaler(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        match &self.scaler {
            Some(scaler) => Ok(scaler.transform_rows(x)?),
            None => Ok(x.to_vec()),
        }
    }

    /// Hard class labels, scaling applied when the model carries a scaler.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.classifier.predict(&self.apply_scaler(x)?)
    }

    /// Class-1 probabilities, scaling applied when the model carries a scaler.
    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.classifier.predict_proba(&self.apply_scaler(x)?)
    }

    /// Persist as JSON, written to a temp file then renamed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Reload a persisted model.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Per-model training outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    /// Accuracy on the held-out split.
    pub test_accuracy: f64,
    /// Cross-validation accuracy mean.
    pub cv_mean: f64,
    /// Cross-validation accuracy standard deviation.
    pub cv_std: f64,
    /// Per-fold cross-validation accuracies.
    pub cv_scores: Vec<f64>,
    /// Hard predictions on the held-out split.
    pub predictions: Vec<f64>,
    /// Class-1 probabilities on the held-out split.
    pub probabilities: Vec<f64>,
    /// Native per-feature importances, when the family exposes them.
    pub feature_importances: Option<Vec<f64>>,
}

/// Fits the whole registry against an engineered frame.
#[derive(Debug, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
    results: BTreeMap<String, ModelResult>,
    models: BTreeMap<String, TrainedModel>,
    feature_columns: Vec<String>,
    test_labels: Vec<f64>,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Results keyed by model name, in name order.
    pub fn results(&self) -> &BTreeMap<String, ModelResult> {
        &self.results
    }

    /// Fitted models keyed by model name.
    pub fn models(&self) -> &BTreeMap<String, TrainedModel> {
        &self.models
    }

    /// Feature columns of the last training run.
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Held-out labels of the last training run.
    pub fn test_labels(&self) -> &[f64] {
        &self.test_labels
    }

    /// Extract the model matrix from an engineered frame.
    ///
    /// Takes every numeric column outside the excluded set, imputes any
    /// residual non-finite values with the column median, and reads labels
    /// from `target`. Returns `(x, y, feature_columns)` with `x` row-major.
    pub fn prepare_features(&self, frame: &Frame) -> Result<(Vec<Vec<f64>>, Vec<f64>, Vec<String>)> {
        let y = frame.numeric("target")?.to_vec();
        let columns: Vec<String> = frame
            .numeric_column_names()
            .into_iter()
            .filter(|name| !EXCLUDED_COLUMNS.contains(&name.as_str()))
            .collect();

        let mut by_column = Vec::with_capacity(columns.len());
        for name in &columns {
            let mut values = frame.numeric(name)?.to_vec();
            if values.iter().any(|v| !v.is_finite()) {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                let fill = median(&finite).unwrap_or(0.0);
                for v in values.iter_mut() {
                    if !v.is_finite() {
                        *v = fill;
                    }
                }
            }
            by_column.push(values);
        }

        let x: Vec<Vec<f64>> = (0..frame.n_rows())
            .map(|row| by_column.iter().map(|col| col[row]).collect())
            .collect();
        Ok((x, y, columns))
    }

    /// Train every registry entry.
    ///
    /// Uses the caller-supplied `(train, test)` index split when given,
    /// otherwise a seeded stratified hold-out. A model that fails to fit or
    /// persist is logged and skipped; its name is absent from the results.
    pub fn train_all_models(
        &mut self,
        frame: &Frame,
        specs: &[ModelSpec],
        split: Option<(Vec<usize>, Vec<usize>)>,
    ) -> Result<&BTreeMap<String, ModelResult>> {
        let (x, y, columns) = self.prepare_features(frame)?;
        let (train_idx, test_idx) = match split {
            Some(pair) => pair,
            None => stratified_train_test_split(&y, self.config.test_ratio, self.config.seed)?,
        };
        if let Some(&bad) = train_idx
            .iter()
            .chain(test_idx.iter())
            .find(|&&i| i >= x.len())
        {
            return Err(ModelError::InvalidParameter {
                name: "split".to_string(),
                reason: format!("row index {bad} out of range for {} rows", x.len()),
            });
        }

        let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
        let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| x[i].clone()).collect();
        let y_test: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();

        info!(
            train_rows = x_train.len(),
            test_rows = x_test.len(),
            features = columns.len(),
            "training model registry"
        );

        let folds = stratified_k_fold(&y_train, self.config.cv_folds, self.config.seed)?;
        self.feature_columns = columns;
        self.test_labels = y_test.clone();
        self.results.clear();
        self.models.clear();

        for spec in specs {
            match self.train_one(spec, &x_train, &y_train, &x_test, &y_test, &folds) {
                Ok((model, result)) => {
                    let path = self.model_path(&spec.name);
                    if let Err(err) = model.save(&path) {
                        error!(model = %spec.name, error = %err, "model save failed, skipping");
                        continue;
                    }
                    info!(
                        model = %spec.name,
                        test_accuracy = result.test_accuracy,
                        cv_mean = result.cv_mean,
                        "model trained"
                    );
                    self.models.insert(spec.name.clone(), model);
                    self.results.insert(spec.name.clone(), result);
                }
                Err(err) => {
                    error!(model = %spec.name, error = %err, "model failed, skipping");
                }
            }
        }
        Ok(&self.results)
    }

    fn train_one(
        &self,
        spec: &ModelSpec,
        x_train: &[Vec<f64>],
        y_train: &[f64],
        x_test: &[Vec<f64>],
        y_test: &[f64],
        folds: &[(Vec<usize>, Vec<usize>)],
    ) -> Result<(TrainedModel, ModelResult)> {
        let mut scaler = None;
        let (fit_x, eval_x) = if spec.requires_scaling {
            let mut s = StandardScaler::new();
            s.fit_rows(x_train);
            let fit_x = s.transform_rows(x_train)?;
            let eval_x = s.transform_rows(x_test)?;
            scaler = Some(s);
            (fit_x, eval_x)
        } else {
            (x_train.to_vec(), x_test.to_vec())
        };

        let mut classifier = ClassifierKind::build(spec.kind, self.config.seed);
        classifier.fit(&fit_x, y_train)?;
        let predictions = classifier.predict(&eval_x)?;
        let probabilities = classifier.predict_proba(&eval_x)?;
        let test_accuracy = accuracy_score(y_test, &predictions);

        // Cross-validation runs on the unscaled training rows; each fold
        // refits a fresh model.
        let mut cv_scores = Vec::with_capacity(folds.len());
        for (fold_train, fold_val) in folds {
            let fx: Vec<Vec<f64>> = fold_train.iter().map(|&i| x_train[i].clone()).collect();
            let fy: Vec<f64> = fold_train.iter().map(|&i| y_train[i]).collect();
            let vx: Vec<Vec<f64>> = fold_val.iter().map(|&i| x_train[i].clone()).collect();
            let vy: Vec<f64> = fold_val.iter().map(|&i| y_train[i]).collect();

            let mut fold_model = ClassifierKind::build(spec.kind, self.config.seed);
            fold_model.fit(&fx, &fy)?;
            cv_scores.push(accuracy_score(&vy, &fold_model.predict(&vx)?));
        }
        let cv_mean = cv_scores.iter().sum::<f64>() / cv_scores.len() as f64;
        let cv_std = (cv_scores
            .iter()
            .map(|s| (s - cv_mean).powi(2))
            .sum::<f64>()
            / cv_scores.len() as f64)
            .sqrt();

        let result = ModelResult {
            test_accuracy,
            cv_mean,
            cv_std,
            cv_scores,
            predictions,
            probabilities,
            feature_importances: classifier.feature_importances(),
        };
        let model = TrainedModel {
            name: spec.name.clone(),
            classifier,
            scaler,
        };
        Ok((model, result))
    }

    /// The trained model with the highest held-out accuracy.
    pub fn get_best_model(&self) -> Result<(&str, &ModelResult)> {
        self.results
            .iter()
            .max_by(|a, b| {
                a.1.test_accuracy
                    .partial_cmp(&b.1.test_accuracy)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(name, result)| (name.as_str(), result))
            .ok_or(ModelError::EmptyResults)
    }

    /// Reload a persisted model by registry name.
    pub fn load_model(&self, name: &str) -> Result<TrainedModel> {
        let path = self.model_path(name);
        if !path.exists() {
            return Err(ModelError::ModelNotFound {
                name: name.to_string(),
            });
        }
        TrainedModel::load(&path)
    }

    fn model_path(&self, name: &str) -> PathBuf {
        let file = format!("{}.json", name.to_lowercase().replace(' ', "_"));
        self.config.models_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_six_entries() {
        let specs = default_model_specs();
        assert_eq!(specs.len(), 6);
        let scaled: Vec<&str> = specs
            .iter()
            .filter(|s| s.requires_scaling)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(scaled, ["SVM", "Neural Network"]);
    }

    #[test]
    fn test_model_path_is_lowercased_and_underscored() {
        let trainer = ModelTrainer::new(TrainerConfig::default());
        assert_eq!(
            trainer.model_path("Logistic Regression"),
            PathBuf::from("models/saved_models/logistic_regression.json")
        );
    }

    #[test]
    fn test_get_best_model_empty_fails() {
        let trainer = ModelTrainer::new(TrainerConfig::default());
        assert!(matches!(
            trainer.get_best_model(),
            Err(ModelError::EmptyResults)
        ));
    }

    #[test]
    fn test_prepare_features_imputes_and_excludes() {
        use hitsong_core::Column;
        let frame = Frame::from_columns(vec![
            ("target".into(), Column::Numeric(vec![1.0, 0.0, 1.0])),
            ("energy".into(), Column::Numeric(vec![0.1, f64::NAN, 0.3])),
            ("decade".into(), Column::Categorical(vec!["60s".into(); 3])),
        ])
        .unwrap();
        let trainer = ModelTrainer::new(TrainerConfig::default());
        let (x, y, columns) = trainer.prepare_features(&frame).unwrap();
        assert_eq!(columns, ["energy"]);
        assert_eq!(y, [1.0, 0.0, 1.0]);
        // NAN imputed with the median of the finite values.
        assert!((x[1][0] - 0.2).abs() < 1e-10);
    }
}
