//! Run-level metrics summary files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::Result;

/// One row of the metrics table, one model per row.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsRow {
    pub model: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: Option<f64>,
    pub cv_mean: f64,
    pub cv_std: f64,
}

/// Writes `model_metrics.csv` and `summary.md` into a reports directory.
#[derive(Debug, Clone)]
pub struct MetricsReporter {
    reports_dir: PathBuf,
}

impl MetricsReporter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    fn write_atomic(&self, file: &str, contents: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.reports_dir)?;
        let path = self.reports_dir.join(file);
        let tmp = self.reports_dir.join(format!("{file}.tmp"));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// The machine-readable metrics table.
    pub fn write_metrics_csv(&self, rows: &[MetricsRow]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        let path = self.write_atomic("model_metrics.csv", &bytes)?;
        info!(path = %path.display(), models = rows.len(), "metrics csv written");
        Ok(())
    }

    /// The human-readable run summary.
    pub fn write_summary_md(&self, rows: &[MetricsRow]) -> Result<()> {
        let best = rows.iter().max_by(|a, b| {
            a.accuracy
                .partial_cmp(&b.accuracy)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut md = String::from("# Hit song prediction results\n\n");
        if let Some(best) = best {
            md.push_str(&format!(
                "Best model: **{}** with test accuracy {:.4}.\n\n",
                best.model, best.accuracy
            ));
        }
        md.push_str("| Model | Accuracy | Precision | Recall | F1 | ROC-AUC | CV mean | CV std |\n");
        md.push_str("|---|---|---|---|---|---|---|---|\n");
        for row in rows {
            let auc = row
                .roc_auc
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "n/a".to_string());
            md.push_str(&format!(
                "| {} | {:.4} | {:.4} | {:.4} | {:.4} | {} | {:.4} | {:.4} |\n",
                row.model, row.accuracy, row.precision, row.recall, row.f1, auc, row.cv_mean,
                row.cv_std
            ));
        }

        let path = self.write_atomic("summary.md", md.as_bytes())?;
        info!(path = %path.display(), "summary written");
        Ok(())
    }

    /// Both summary files in one call.
    pub fn write_all(&self, rows: &[MetricsRow]) -> Result<()> {
        self.write_metrics_csv(rows)?;
        self.write_summary_md(rows)
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rows() -> Vec<MetricsRow> {
        vec![
            MetricsRow {
                model: "Random Forest".into(),
                accuracy: 0.91,
                precision: 0.88,
                recall: 0.9,
                f1: 0.89,
                roc_auc: Some(0.95),
                cv_mean: 0.9,
                cv_std: 0.02,
            },
            MetricsRow {
                model: "SVM".into(),
                accuracy: 0.84,
                precision: 0.8,
                recall: 0.82,
                f1: 0.81,
                roc_auc: None,
                cv_mean: 0.83,
                cv_std: 0.03,
            },
        ]
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let dir = TempDir::new().unwrap();
        MetricsReporter::new(dir.path()).write_metrics_csv(&rows()).unwrap();
        let text = fs::read_to_string(dir.path().join("model_metrics.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("model,accuracy,precision"));
        assert!(lines[1].starts_with("Random Forest,"));
        // None serializes as an empty field.
        assert!(lines[2].contains(",,"));
    }

    #[test]
    fn test_summary_names_best_model() {
        let dir = TempDir::new().unwrap();
        MetricsReporter::new(dir.path()).write_summary_md(&rows()).unwrap();
        let text = fs::read_to_string(dir.path().join("summary.md")).unwrap();
        assert!(text.contains("**Random Forest**"));
        assert!(text.contains("| SVM |"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn test_no_leftover_temp_files() {
        let dir = TempDir::new().unwrap();
        MetricsReporter::new(dir.path()).write_all(&rows()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
