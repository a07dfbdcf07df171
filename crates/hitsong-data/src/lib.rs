//! # hitsong-data
//!
//! Loads raw or processed song datasets into a [`Frame`] and runs the
//! cleaning pass: duplicate removal, median imputation and target-column
//! resolution.
//!
//! The loader prefers pre-processed `train_dataset.csv`/`test_dataset.csv`
//! under the processed directory and otherwise falls back to per-decade
//! `dataset-of-<decade>.csv` files under the raw directory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hitsong_core::{Column, CoreError, Frame};
use rand::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

/// Result type for data loading operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading and cleaning data.
#[derive(Error, Debug)]
pub enum DataError {
    /// No usable data files in either location.
    #[error("No data files found in {path}")]
    NoDataFiles { path: String },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failure.
    #[error("Failed to parse CSV {path}: {message}")]
    Csv { path: String, message: String },

    /// No target column and no known alias, with synthesis disabled.
    #[error("No target column found (aliases tried: hit, popular, chart)")]
    MissingTarget,

    /// Table-level failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Aliases accepted for the label column, tried in order.
const TARGET_ALIASES: [&str; 3] = ["hit", "popular", "chart"];

/// Positive rate used when synthesizing a placeholder label.
const SYNTHETIC_POSITIVE_RATE: f64 = 0.3;

/// The frames produced by a load: the combined table plus the original
/// train/test tables when pre-processed files were found.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub combined: Frame,
    pub train: Option<Frame>,
    pub test: Option<Frame>,
}

/// Loads song datasets from disk.
#[derive(Debug, Clone)]
pub struct DataLoader {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
    synthesize_target: bool,
    seed: u64,
}

impl DataLoader {
    /// Create a loader over the given raw and processed data directories.
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
            synthesize_target: false,
            seed: 42,
        }
    }

    /// Opt in to synthesizing a placeholder label when none is found.
    ///
    /// The synthesized column is random (~30% positive) and only useful for
    /// exercising the pipeline; real training data must carry a real label.
    pub fn synthesize_target(mut self, enabled: bool) -> Self {
        self.synthesize_target = enabled;
        self
    }

    /// Seed for the placeholder-label generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load data, preferring pre-processed train/test files.
    pub fn load(&self) -> Result<LoadedData> {
        let train_file = self.processed_dir.join("train_dataset.csv");
        let test_file = self.processed_dir.join("test_dataset.csv");

        if train_file.exists() && test_file.exists() {
            info!("Loading pre-processed train and test datasets");
            let mut train = read_csv(&train_file)?;
            let mut test = read_csv(&test_file)?;
            let mut combined = Frame::concat(&[train.clone(), test.clone()])?;

            // Pre-processed exports may have dropped the decade column.
            for frame in [&mut combined, &mut train, &mut test] {
                backfill_decade(frame, "00s")?;
            }

            info!(
                train_rows = train.n_rows(),
                test_rows = test.n_rows(),
                columns = combined.n_cols(),
                "Loaded processed datasets"
            );
            log_target_distribution(&combined);
            return Ok(LoadedData {
                combined,
                train: Some(train),
                test: Some(test),
            });
        }

        warn!("Processed datasets not found, checking for raw decade files");
        self.load_from_raw_files()
    }

    /// Load and combine raw per-decade files, then run the cleaning pass.
    pub fn load_from_raw_files(&self) -> Result<LoadedData> {
        let mut decade_files = Vec::new();
        let mut other_csvs = Vec::new();

        let entries = std::fs::read_dir(&self.raw_dir).map_err(|_| DataError::NoDataFiles {
            path: self.raw_dir.display().to_string(),
        })?;
        for entry in entries {
            let path = entry?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            if !name.ends_with(".csv") {
                continue;
            }
            if name.starts_with("dataset-of-") {
                decade_files.push(path);
            } else {
                other_csvs.push(path);
            }
        }
        decade_files.sort();
        other_csvs.sort();

        let combined = if decade_files.is_empty() {
            let first = other_csvs.first().ok_or_else(|| DataError::NoDataFiles {
                path: self.raw_dir.display().to_string(),
            })?;
            warn!(
                count = other_csvs.len(),
                "No decade files found, falling back to first other CSV"
            );
            let mut frame = read_csv(first)?;
            backfill_decade(&mut frame, "unknown")?;
            frame
        } else {
            let mut frames = Vec::with_capacity(decade_files.len());
            for path in &decade_files {
                info!(file = %path.display(), "Loading decade file");
                let mut frame = read_csv(path)?;
                let decade = decade_from_filename(path);
                frame.insert(
                    "decade",
                    Column::Categorical(vec![decade; frame.n_rows()]),
                )?;
                frames.push(frame);
            }
            let combined = Frame::concat(&frames)?;
            info!(
                rows = combined.n_rows(),
                decades = decade_files.len(),
                "Combined songs from decade files"
            );
            combined
        };

        let processed = self.preprocess(combined)?;
        Ok(LoadedData {
            combined: processed,
            train: None,
            test: None,
        })
    }

    /// Cleaning pass: drop exact duplicates, impute numeric nulls with the
    /// column median, and resolve the target column.
    pub fn preprocess(&self, frame: Frame) -> Result<Frame> {
        let initial = frame.n_rows();
        let mut frame = frame.drop_duplicates();
        if frame.n_rows() != initial {
            info!(removed = initial - frame.n_rows(), "Removed duplicate rows");
        }

        frame.impute_numeric_median();

        if !frame.has_column("target") {
            for alias in TARGET_ALIASES {
                if frame.has_column(alias) {
                    frame.rename_column(alias, "target")?;
                    info!(alias, "Renamed alias column to target");
                    break;
                }
            }
        }

        if !frame.has_column("target") {
            if !self.synthesize_target {
                return Err(DataError::MissingTarget);
            }
            warn!("No target column found, synthesizing placeholder labels");
            let mut rng = StdRng::seed_from_u64(self.seed);
            let values: Vec<f64> = (0..frame.n_rows())
                .map(|_| {
                    if rng.gen::<f64>() < SYNTHETIC_POSITIVE_RATE {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            frame.insert("target", Column::Numeric(values))?;
        }

        log_target_distribution(&frame);
        Ok(frame)
    }
}

/// Read a CSV file into a frame. A column is numeric when every non-empty
/// field parses as `f64`; empty fields become `NaN` (numeric) or stay empty
/// strings (categorical).
pub fn read_csv(path: &Path) -> Result<Frame> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(String::from)
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or("").trim().to_string());
        }
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (header, values) in headers.into_iter().zip(cells.into_iter()) {
        let numeric = values
            .iter()
            .filter(|v| !v.is_empty())
            .all(|v| v.parse::<f64>().is_ok());
        let has_data = values.iter().any(|v| !v.is_empty());
        let column = if numeric && has_data {
            Column::Numeric(
                values
                    .iter()
                    .map(|v| v.parse::<f64>().unwrap_or(f64::NAN))
                    .collect(),
            )
        } else {
            Column::Categorical(values)
        };
        columns.push((header, column));
    }

    let frame = Frame::from_columns(columns)?;
    info!(
        file = %path.display(),
        rows = frame.n_rows(),
        columns = frame.n_cols(),
        "Read CSV"
    );
    Ok(frame)
}

/// Count the binary target classes: `(non_hits, hits)`.
pub fn target_distribution(frame: &Frame) -> Option<(usize, usize)> {
    let target = frame.numeric("target").ok()?;
    let hits = target.iter().filter(|v| **v > 0.5).count();
    Some((target.len() - hits, hits))
}

fn backfill_decade(frame: &mut Frame, placeholder: &str) -> Result<()> {
    if !frame.has_column("decade") {
        frame.insert(
            "decade",
            Column::Categorical(vec![placeholder.to_string(); frame.n_rows()]),
        )?;
    }
    Ok(())
}

fn decade_from_filename(path: &Path) -> String {
    // "dataset-of-60s.csv" -> "60s"
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit('-').next())
        .unwrap_or("unknown")
        .to_string()
}

fn log_target_distribution(frame: &Frame) {
    if let Some((non_hits, hits)) = target_distribution(frame) {
        info!(non_hits, hits, "Target distribution");
    }
}

fn csv_error(path: &Path, error: csv::Error) -> DataError {
    DataError::Csv {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
