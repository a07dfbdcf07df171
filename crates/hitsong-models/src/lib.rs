//! # hitsong-models
//!
//! The six classifiers of the hit-song prediction pipeline and the trainer
//! that fits, cross-validates, persists and ranks them. Models operate on
//! row-major `f64` feature vectors and binary {0, 1} labels.

pub mod boosting;
pub mod classifier;
pub mod forest;
pub mod logistic;
pub mod mlp;
pub mod svm;
pub mod trainer;
pub mod tree;
pub mod xgboost;

use hitsong_core::CoreError;
use thiserror::Error;

pub use boosting::GradientBoostingClassifier;
pub use classifier::Classifier;
pub use forest::RandomForestClassifier;
pub use logistic::LogisticRegression;
pub use mlp::MlpClassifier;
pub use svm::SvmClassifier;
pub use trainer::{
    default_model_specs, ClassifierKind, ModelKind, ModelResult, ModelSpec, ModelTrainer,
    TrainedModel, TrainerConfig,
};
pub use tree::DecisionTree;
pub use xgboost::XgboostClassifier;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur during model training, prediction and persistence.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Model used before fitting.
    #[error("Model must be fitted before prediction")]
    NotFitted,

    /// Model fitting failed.
    #[error("Model fitting failed: {0}")]
    FitError(String),

    /// Prediction failed.
    #[error("Prediction failed: {0}")]
    PredictionError(String),

    /// `get_best_model` called with no trained results.
    #[error("No models trained yet")]
    EmptyResults,

    /// Requested persisted model does not exist.
    #[error("Model '{name}' not found")]
    ModelNotFound { name: String },

    /// Persistence I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model (de)serialization failure.
    #[error("Model serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Table or split failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}
