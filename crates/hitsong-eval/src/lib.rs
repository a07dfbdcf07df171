//! # hitsong-eval
//!
//! Evaluation of trained classifiers: scalar metrics, per-class text
//! reports, per-model diagnostic charts and the run-level metrics summary.

pub mod report;

use thiserror::Error;
use tracing::info;

use hitsong_core::metrics::{
    accuracy_score, classification_report, confusion_matrix, f1_score, precision_score,
    recall_score, roc_auc_score,
};
use hitsong_plot::{PlotError, Plotter};

pub use report::{MetricsReporter, MetricsRow};

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur during evaluation and reporting.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Prediction and label vectors disagree in length.
    #[error("Length mismatch: {expected} labels but {actual} predictions")]
    LengthMismatch { expected: usize, actual: usize },

    /// Chart rendering failure.
    #[error(transparent)]
    Plot(#[from] PlotError),

    /// Metrics CSV failure.
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    /// Report file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scalar metrics for one model on the held-out split.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Present only when probabilities were supplied; 0.0 when the AUC is
    /// undefined (single-class test set).
    pub roc_auc: Option<f64>,
}

/// Full evaluation of one model: metrics plus the text report.
#[derive(Debug, Clone)]
pub struct DetailedReport {
    pub metrics: EvaluationMetrics,
    pub classification_report: String,
    pub confusion_matrix: [[usize; 2]; 2],
}

/// Computes metrics and renders per-model diagnostics.
#[derive(Debug, Clone)]
pub struct ModelEvaluator {
    plotter: Plotter,
}

impl ModelEvaluator {
    pub fn new(figures_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            plotter: Plotter::new(figures_dir),
        }
    }

    fn check_lengths(y_true: &[f64], other: &[f64]) -> Result<()> {
        if y_true.len() != other.len() {
            return Err(EvalError::LengthMismatch {
                expected: y_true.len(),
                actual: other.len(),
            });
        }
        Ok(())
    }

    /// Accuracy, precision, recall and F1, plus ROC-AUC when probabilities
    /// are available. Undefined ratios fall back to zero rather than
    /// failing.
    pub fn calculate_metrics(
        &self,
        y_true: &[f64],
        y_pred: &[f64],
        y_proba: Option<&[f64]>,
    ) -> Result<EvaluationMetrics> {
        Self::check_lengths(y_true, y_pred)?;
        let roc_auc = match y_proba {
            Some(proba) => {
                Self::check_lengths(y_true, proba)?;
                let auc = roc_auc_score(y_true, proba);
                Some(if auc.is_finite() { auc } else { 0.0 })
            }
            None => None,
        };
        Ok(EvaluationMetrics {
            accuracy: accuracy_score(y_true, y_pred),
            precision: precision_score(y_true, y_pred),
            recall: recall_score(y_true, y_pred),
            f1: f1_score(y_true, y_pred),
            roc_auc,
        })
    }

    /// Render the confusion matrix chart for one model.
    pub fn plot_confusion_matrix(
        &self,
        model_name: &str,
        y_true: &[f64],
        y_pred: &[f64],
    ) -> Result<()> {
        Self::check_lengths(y_true, y_pred)?;
        let matrix = confusion_matrix(y_true, y_pred);
        self.plotter.plot_confusion_matrix(model_name, matrix)?;
        Ok(())
    }

    /// Render the ROC curve chart for one model.
    pub fn plot_roc_curve(&self, model_name: &str, y_true: &[f64], y_proba: &[f64]) -> Result<()> {
        Self::check_lengths(y_true, y_proba)?;
        self.plotter.plot_roc_curve(model_name, y_true, y_proba)?;
        Ok(())
    }

    /// Metrics, the per-class text report and both diagnostic charts.
    pub fn generate_detailed_report(
        &self,
        model_name: &str,
        y_true: &[f64],
        y_pred: &[f64],
        y_proba: Option<&[f64]>,
    ) -> Result<DetailedReport> {
        let metrics = self.calculate_metrics(y_true, y_pred, y_proba)?;
        let text = classification_report(y_true, y_pred, ["Not Hit", "Hit"]);
        let matrix = confusion_matrix(y_true, y_pred);

        self.plotter.plot_confusion_matrix(model_name, matrix)?;
        if let Some(proba) = y_proba {
            self.plotter.plot_roc_curve(model_name, y_true, proba)?;
        }
        info!(
            model = %model_name,
            accuracy = metrics.accuracy,
            f1 = metrics.f1,
            "model evaluated"
        );
        Ok(DetailedReport {
            metrics,
            classification_report: text,
            confusion_matrix: matrix,
        })
    }
}
