//! # hitsong-plot
//!
//! PNG chart rendering for the hit-song prediction pipeline. Every plot is
//! a side effect: charts land in the configured figures directory and
//! nothing is returned to the caller beyond success or failure.

use std::fs;
use std::path::PathBuf;

use plotters::prelude::*;
use thiserror::Error;
use tracing::info;

use hitsong_core::metrics::{pearson, roc_auc_score, roc_curve};
use hitsong_core::{Frame, EXCLUDED_COLUMNS};

/// Result type for plotting operations.
pub type Result<T> = std::result::Result<T, PlotError>;

/// Errors that can occur while rendering charts.
#[derive(Error, Debug)]
pub enum PlotError {
    /// Backend drawing failure.
    #[error("Chart rendering failed: {0}")]
    Render(String),

    /// Figures directory I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame-level failure while gathering plot data.
    #[error(transparent)]
    Core(#[from] hitsong_core::CoreError),
}

/// Collapse the various plotters error types into one message.
fn render_err(err: impl std::fmt::Display) -> PlotError {
    PlotError::Render(err.to_string())
}

/// Filesystem-safe key for a model name.
fn file_key(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// One bar in a comparison chart.
#[derive(Debug, Clone)]
pub struct ModelScore {
    pub name: String,
    pub test_accuracy: f64,
    pub cv_mean: f64,
}

/// Renders pipeline charts into a figures directory.
#[derive(Debug, Clone)]
pub struct Plotter {
    figures_dir: PathBuf,
}

impl Plotter {
    pub fn new(figures_dir: impl Into<PathBuf>) -> Self {
        Self {
            figures_dir: figures_dir.into(),
        }
    }

    fn figure_path(&self, file: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.figures_dir)?;
        Ok(self.figures_dir.join(file))
    }

    /// Class counts next to the per-decade hit rate.
    pub fn plot_target_distribution(&self, frame: &Frame) -> Result<()> {
        let path = self.figure_path("target_distribution.png")?;
        let target = frame.numeric("target")?;
        let positives = target.iter().filter(|&&v| v > 0.5).count();
        let negatives = target.len() - positives;

        // Hit rate per decade, in the frame's sorted decade order.
        let mut decade_rates: Vec<(String, f64)> = Vec::new();
        if frame.has_column("decade") {
            let decades = frame.categorical("decade")?;
            for value in frame.unique_categories("decade")? {
                let mut hits = 0usize;
                let mut total = 0usize;
                for (d, &t) in decades.iter().zip(target.iter()) {
                    if *d == value {
                        total += 1;
                        if t > 0.5 {
                            hits += 1;
                        }
                    }
                }
                if total > 0 {
                    decade_rates.push((value, hits as f64 / total as f64));
                }
            }
        }

        let root = BitMapBackend::new(&path, (1000, 500)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let (left, right) = root.split_horizontally(500);

        let max_count = positives.max(negatives).max(1) as f64;
        let mut chart = ChartBuilder::on(&left)
            .caption("Target distribution", ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5..1.5f64, 0.0..max_count * 1.1)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(2)
            .x_label_formatter(&|v| {
                if *v < 0.5 {
                    "non-hit".to_string()
                } else {
                    "hit".to_string()
                }
            })
            .y_desc("songs")
            .draw()
            .map_err(render_err)?;
        chart
            .draw_series([
                Rectangle::new([(-0.35, 0.0), (0.35, negatives as f64)], BLUE.filled()),
                Rectangle::new([(0.65, 0.0), (1.35, positives as f64)], RED.filled()),
            ])
            .map_err(render_err)?;

        if !decade_rates.is_empty() {
            let n = decade_rates.len();
            let labels: Vec<String> = decade_rates.iter().map(|(d, _)| d.clone()).collect();
            let mut chart = ChartBuilder::on(&right)
                .caption("Hit rate by decade", ("sans-serif", 24))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(50)
                .build_cartesian_2d(-0.5..n as f64 - 0.5, 0.0..1.0f64)
                .map_err(render_err)?;
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(n)
                .x_label_formatter(&|v| {
                    labels
                        .get(v.round().max(0.0) as usize)
                        .cloned()
                        .unwrap_or_default()
                })
                .y_desc("hit rate")
                .draw()
                .map_err(render_err)?;
            chart
                .draw_series(decade_rates.iter().enumerate().map(|(i, (_, rate))| {
                    Rectangle::new([(i as f64 - 0.35, 0.0), (i as f64 + 0.35, *rate)], GREEN.filled())
                }))
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
        info!(path = %path.display(), "target distribution plotted");
        Ok(())
    }

    /// Ten strongest feature-target correlations by magnitude.
    pub fn plot_feature_correlations(&self, frame: &Frame) -> Result<()> {
        let path = self.figure_path("feature_correlations.png")?;
        let target = frame.numeric("target")?;

        let mut correlations: Vec<(String, f64)> = frame
            .numeric_column_names()
            .into_iter()
            .filter(|name| !EXCLUDED_COLUMNS.contains(&name.as_str()))
            .filter_map(|name| {
                let values = frame.numeric(&name).ok()?;
                let r = pearson(values, target);
                r.is_finite().then_some((name, r))
            })
            .collect();
        correlations.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        correlations.truncate(10);

        let n = correlations.len().max(1);
        let labels: Vec<String> = correlations.iter().map(|(name, _)| name.clone()).collect();
        let root = BitMapBackend::new(&path, (1000, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("Feature correlations with target", ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(120)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..n as f64 - 0.5, -1.0..1.0f64)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| {
                labels
                    .get(v.round().max(0.0) as usize)
                    .cloned()
                    .unwrap_or_default()
            })
            .y_desc("pearson r")
            .draw()
            .map_err(render_err)?;
        chart
            .draw_series(correlations.iter().enumerate().map(|(i, (_, r))| {
                let color = if *r >= 0.0 { RED.filled() } else { BLUE.filled() };
                Rectangle::new([(i as f64 - 0.35, 0.0), (i as f64 + 0.35, *r)], color)
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        info!(path = %path.display(), "feature correlations plotted");
        Ok(())
    }

    /// Held-out accuracy next to cross-validation accuracy per model.
    pub fn plot_model_comparison(&self, scores: &[ModelScore]) -> Result<()> {
        let path = self.figure_path("model_comparison.png")?;
        let n = scores.len().max(1);
        let labels: Vec<String> = scores.iter().map(|s| s.name.clone()).collect();

        let root = BitMapBackend::new(&path, (1000, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("Model accuracy comparison", ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(100)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..n as f64 - 0.5, 0.0..1.05f64)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| {
                labels
                    .get(v.round().max(0.0) as usize)
                    .cloned()
                    .unwrap_or_default()
            })
            .y_desc("accuracy")
            .draw()
            .map_err(render_err)?;
        chart
            .draw_series(scores.iter().enumerate().map(|(i, s)| {
                Rectangle::new(
                    [(i as f64 - 0.35, 0.0), (i as f64 - 0.03, s.test_accuracy)],
                    BLUE.filled(),
                )
            }))
            .map_err(render_err)?
            .label("test")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE.filled()));
        chart
            .draw_series(scores.iter().enumerate().map(|(i, s)| {
                Rectangle::new(
                    [(i as f64 + 0.03, 0.0), (i as f64 + 0.35, s.cv_mean)],
                    GREEN.filled(),
                )
            }))
            .map_err(render_err)?
            .label("cv mean")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], GREEN.filled()));
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        info!(path = %path.display(), "model comparison plotted");
        Ok(())
    }

    /// Top-15 feature importances for one model.
    pub fn plot_feature_importance(
        &self,
        model_name: &str,
        feature_names: &[String],
        importances: &[f64],
    ) -> Result<()> {
        let file = format!("feature_importance_{}.png", file_key(model_name));
        let path = self.figure_path(&file)?;

        let mut ranked: Vec<(String, f64)> = feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(15);

        let n = ranked.len().max(1);
        let max = ranked.first().map(|(_, v)| *v).unwrap_or(1.0).max(1e-12);
        let labels: Vec<String> = ranked.iter().map(|(name, _)| name.clone()).collect();

        let root = BitMapBackend::new(&path, (1000, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Feature importance ({model_name})"),
                ("sans-serif", 24),
            )
            .margin(10)
            .x_label_area_size(140)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..n as f64 - 0.5, 0.0..max * 1.1)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| {
                labels
                    .get(v.round().max(0.0) as usize)
                    .cloned()
                    .unwrap_or_default()
            })
            .y_desc("importance")
            .draw()
            .map_err(render_err)?;
        chart
            .draw_series(ranked.iter().enumerate().map(|(i, (_, value))| {
                Rectangle::new([(i as f64 - 0.35, 0.0), (i as f64 + 0.35, *value)], BLUE.filled())
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        info!(path = %path.display(), "feature importance plotted");
        Ok(())
    }

    /// Colored 2x2 confusion matrix with counts. Rows are actual classes,
    /// columns predicted.
    pub fn plot_confusion_matrix(&self, model_name: &str, matrix: [[usize; 2]; 2]) -> Result<()> {
        let file = format!("confusion_matrix_{}.png", file_key(model_name));
        let path = self.figure_path(&file)?;
        let total: usize = matrix.iter().flatten().sum();
        let total = total.max(1) as f64;

        let root = BitMapBackend::new(&path, (600, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Confusion matrix ({model_name})"),
                ("sans-serif", 24),
            )
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..2.0f64, 0.0..2.0f64)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(2)
            .y_labels(2)
            .x_label_formatter(&|v| format!("pred {}", if *v < 1.0 { 0 } else { 1 }))
            .y_label_formatter(&|v| format!("actual {}", if *v < 1.0 { 1 } else { 0 }))
            .draw()
            .map_err(render_err)?;

        for (row, counts) in matrix.iter().enumerate() {
            for (col, &count) in counts.iter().enumerate() {
                let x0 = col as f64;
                // Actual class 0 on the top row.
                let y0 = 1.0 - row as f64;
                let intensity = count as f64 / total;
                chart
                    .draw_series([
                        Rectangle::new(
                            [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                            BLUE.mix(0.15 + 0.7 * intensity).filled(),
                        ),
                        Rectangle::new([(x0, y0), (x0 + 1.0, y0 + 1.0)], BLACK.stroke_width(1)),
                    ])
                    .map_err(render_err)?;
                chart
                    .draw_series([Text::new(
                        count.to_string(),
                        (x0 + 0.5, y0 + 0.5),
                        ("sans-serif", 32),
                    )])
                    .map_err(render_err)?;
            }
        }

        root.present().map_err(render_err)?;
        info!(path = %path.display(), "confusion matrix plotted");
        Ok(())
    }

    /// ROC curve with the chance diagonal and the AUC in the caption.
    pub fn plot_roc_curve(&self, model_name: &str, y_true: &[f64], y_score: &[f64]) -> Result<()> {
        let file = format!("roc_curve_{}.png", file_key(model_name));
        let path = self.figure_path(&file)?;
        let points = roc_curve(y_true, y_score);
        let auc = roc_auc_score(y_true, y_score);
        let caption = if auc.is_finite() {
            format!("ROC curve ({model_name}, AUC = {auc:.3})")
        } else {
            format!("ROC curve ({model_name})")
        };

        let root = BitMapBackend::new(&path, (700, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..1.0f64, 0.0..1.0f64)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .x_desc("false positive rate")
            .y_desc("true positive rate")
            .draw()
            .map_err(render_err)?;
        chart
            .draw_series(LineSeries::new([(0.0, 0.0), (1.0, 1.0)], BLACK.mix(0.4)))
            .map_err(render_err)?;
        chart
            .draw_series(LineSeries::new(points, RED.stroke_width(2)))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        info!(path = %path.display(), "roc curve plotted");
        Ok(())
    }

    /// The dataset-level charts plus a feature-importance chart per model
    /// that exposes importances.
    pub fn create_comprehensive_plots(
        &self,
        frame: &Frame,
        scores: &[ModelScore],
        feature_names: &[String],
        importances: &[(String, Vec<f64>)],
    ) -> Result<()> {
        self.plot_target_distribution(frame)?;
        self.plot_feature_correlations(frame)?;
        self.plot_model_comparison(scores)?;
        for (name, values) in importances {
            self.plot_feature_importance(name, feature_names, values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitsong_core::Column;
    use tempfile::TempDir;

    fn frame() -> Frame {
        let target: Vec<f64> = (0..20).map(|i| f64::from(i % 2 == 0)).collect();
        let energy: Vec<f64> = (0..20).map(|i| i as f64 / 20.0).collect();
        let decade: Vec<String> = (0..20)
            .map(|i| if i < 10 { "60s".into() } else { "70s".into() })
            .collect();
        Frame::from_columns(vec![
            ("target".into(), Column::Numeric(target)),
            ("energy".into(), Column::Numeric(energy)),
            ("decade".into(), Column::Categorical(decade)),
        ])
        .unwrap()
    }

    fn assert_png(dir: &TempDir, file: &str) {
        let path = dir.path().join(file);
        assert!(path.exists(), "{file} missing");
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_target_distribution_written() {
        let dir = TempDir::new().unwrap();
        Plotter::new(dir.path()).plot_target_distribution(&frame()).unwrap();
        assert_png(&dir, "target_distribution.png");
    }

    #[test]
    fn test_feature_correlations_written() {
        let dir = TempDir::new().unwrap();
        Plotter::new(dir.path()).plot_feature_correlations(&frame()).unwrap();
        assert_png(&dir, "feature_correlations.png");
    }

    #[test]
    fn test_model_comparison_written() {
        let dir = TempDir::new().unwrap();
        let scores = vec![
            ModelScore {
                name: "Random Forest".into(),
                test_accuracy: 0.9,
                cv_mean: 0.85,
            },
            ModelScore {
                name: "SVM".into(),
                test_accuracy: 0.8,
                cv_mean: 0.82,
            },
        ];
        Plotter::new(dir.path()).plot_model_comparison(&scores).unwrap();
        assert_png(&dir, "model_comparison.png");
    }

    #[test]
    fn test_model_keyed_files() {
        let dir = TempDir::new().unwrap();
        let plotter = Plotter::new(dir.path());
        plotter
            .plot_confusion_matrix("Random Forest", [[5, 1], [2, 4]])
            .unwrap();
        let y_true = vec![0.0, 0.0, 1.0, 1.0];
        let y_score = vec![0.1, 0.4, 0.35, 0.8];
        plotter.plot_roc_curve("Random Forest", &y_true, &y_score).unwrap();
        let names = vec!["energy".to_string(), "valence".to_string()];
        plotter
            .plot_feature_importance("Random Forest", &names, &[0.7, 0.3])
            .unwrap();
        assert_png(&dir, "confusion_matrix_random_forest.png");
        assert_png(&dir, "roc_curve_random_forest.png");
        assert_png(&dir, "feature_importance_random_forest.png");
    }
}
