//! Optional TOML configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Pipeline settings; every field has a default so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory scanned for raw per-decade CSV files.
    pub raw_dir: PathBuf,
    /// Directory holding pre-processed train/test CSV files.
    pub processed_dir: PathBuf,
    /// Directory models and the feature schema are written to.
    pub models_dir: PathBuf,
    /// Directory charts are written to.
    pub figures_dir: PathBuf,
    /// Directory metric summaries are written to.
    pub reports_dir: PathBuf,
    /// Synthesize a placeholder label when the data has none.
    pub synthesize_target: bool,
    /// Skip the dataset and comparison charts.
    pub skip_plots: bool,
    /// Seed for splits, folds and stochastic models.
    pub seed: u64,
    /// Held-out fraction of the combined data.
    pub test_ratio: f64,
    /// Cross-validation fold count.
    pub cv_folds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            models_dir: PathBuf::from("models"),
            figures_dir: PathBuf::from("reports/figures"),
            reports_dir: PathBuf::from("reports"),
            synthesize_target: false,
            skip_plots: false,
            seed: 42,
            test_ratio: 0.25,
            cv_folds: 5,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }
}
