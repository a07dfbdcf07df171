//! Feature derivation: interaction ratios, temporal buckets, decade
//! one-hots, then z-score scaling.
//!
//! `fit_transform` learns the feature space (column set, decade vocabulary,
//! scaler parameters) and returns it as a [`FeatureSchema`]; `transform`
//! replays that space over a new batch so inference features line up with
//! training exactly.

use hitsong_core::{Column, Frame, StandardScaler, EXCLUDED_COLUMNS};
use tracing::info;

use crate::{FeatureSchema, Result};

/// Base per-song audio descriptors used for pairwise ratio features.
pub const BASE_AUDIO_FEATURES: [&str; 7] = [
    "danceability",
    "energy",
    "valence",
    "acousticness",
    "instrumentalness",
    "liveness",
    "speechiness",
];

/// Guard against division by zero in ratio features.
const EPSILON: f64 = 1e-8;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Derives and scales the feature table.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// Full feature pipeline on a training batch: derive features, learn the
    /// decade vocabulary and scaler, return the engineered frame plus the
    /// schema for later batches.
    pub fn fit_transform(&self, frame: &Frame) -> Result<(Frame, FeatureSchema)> {
        let decades = if frame.has_column("decade") {
            frame.unique_categories("decade")?
        } else {
            Vec::new()
        };

        let mut features = derive(frame, &decades)?;
        let feature_columns = feature_column_names(&features);

        let mut scaler = StandardScaler::new();
        let columns: Vec<Vec<f64>> = feature_columns
            .iter()
            .map(|name| features.numeric(name).map(<[f64]>::to_vec))
            .collect::<hitsong_core::Result<_>>()?;
        let scaled = scaler.fit_transform(&columns)?;
        for (name, values) in feature_columns.iter().zip(scaled) {
            features.insert(name.clone(), Column::Numeric(values))?;
        }
        info!(
            features = feature_columns.len(),
            rows = features.n_rows(),
            "Feature engineering complete"
        );

        let schema = FeatureSchema::new(feature_columns, decades, scaler);
        Ok((features, schema))
    }

    /// Replay a learned feature space over a new batch: derive against the
    /// stored decade vocabulary, zero-fill columns the batch cannot produce,
    /// drop columns the schema does not know, and apply the stored scaler.
    pub fn transform(&self, frame: &Frame, schema: &FeatureSchema) -> Result<Frame> {
        let derived = derive(frame, schema.decades())?;

        let columns: Vec<Vec<f64>> = schema
            .feature_columns()
            .iter()
            .map(|name| match derived.numeric(name) {
                Ok(values) => Ok(values.to_vec()),
                // Unseen by this batch (e.g. a one-hot for a decade absent
                // here): all zeros.
                Err(_) => Ok(vec![0.0; derived.n_rows()]),
            })
            .collect::<Result<_>>()?;
        let scaled = schema.scaler().transform(&columns)?;

        let mut aligned = Frame::new();
        for name in EXCLUDED_COLUMNS {
            if let Some(column) = derived.column(name) {
                aligned.insert(name, column.clone())?;
            }
        }
        for (name, values) in schema.feature_columns().iter().zip(scaled) {
            aligned.insert(name.clone(), Column::Numeric(values))?;
        }
        Ok(aligned)
    }
}

/// All numeric columns that count as model features.
pub fn feature_column_names(frame: &Frame) -> Vec<String> {
    frame
        .numeric_column_names()
        .into_iter()
        .filter(|name| !EXCLUDED_COLUMNS.contains(&name.as_str()))
        .collect()
}

fn derive(frame: &Frame, decades: &[String]) -> Result<Frame> {
    let mut features = frame.clone();

    create_interaction_features(&mut features, frame)?;
    info!(columns = features.n_cols(), "Created interaction features");

    create_temporal_features(&mut features, frame)?;
    info!(columns = features.n_cols(), "Created temporal features");

    create_decade_features(&mut features, frame, decades)?;
    info!(columns = features.n_cols(), "Created decade features");

    Ok(features)
}

/// Pairwise ratios between the available base audio features, plus the two
/// named composites.
fn create_interaction_features(features: &mut Frame, frame: &Frame) -> Result<()> {
    let available: Vec<&str> = BASE_AUDIO_FEATURES
        .iter()
        .copied()
        .filter(|name| frame.numeric(name).is_ok())
        .collect();

    for &feat in &available {
        for &other in &available {
            if feat == other {
                continue;
            }
            let a = frame.numeric(feat)?;
            let b = frame.numeric(other)?;
            let ratio: Vec<f64> = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x / (y + EPSILON))
                .collect();
            features.insert(format!("{feat}_{other}_ratio"), Column::Numeric(ratio))?;
        }
    }

    if let (Ok(energy), Ok(dance)) = (frame.numeric("energy"), frame.numeric("danceability")) {
        let composite: Vec<f64> = energy.iter().zip(dance.iter()).map(|(e, d)| e * d).collect();
        features.insert("energy_dance_composite", Column::Numeric(composite))?;
    }
    if let (Ok(acoustic), Ok(energy)) = (frame.numeric("acousticness"), frame.numeric("energy")) {
        let ratio: Vec<f64> = acoustic
            .iter()
            .zip(energy.iter())
            .map(|(a, e)| a / (e + EPSILON))
            .collect();
        features.insert("acoustic_energy_ratio", Column::Numeric(ratio))?;
    }
    Ok(())
}

/// Duration in minutes plus mutually exclusive short/medium/long indicators.
fn create_temporal_features(features: &mut Frame, frame: &Frame) -> Result<()> {
    let duration_ms = match frame.numeric("duration_ms") {
        Ok(values) => values,
        Err(_) => return Ok(()),
    };
    let minutes: Vec<f64> = duration_ms.iter().map(|ms| ms / MS_PER_MINUTE).collect();

    let short: Vec<f64> = minutes.iter().map(|m| f64::from(*m < 3.0)).collect();
    let medium: Vec<f64> = minutes
        .iter()
        .map(|m| f64::from(*m >= 3.0 && *m <= 5.0))
        .collect();
    let long: Vec<f64> = minutes.iter().map(|m| f64::from(*m > 5.0)).collect();

    features.insert("duration_minutes", Column::Numeric(minutes))?;
    features.insert("is_short_song", Column::Numeric(short))?;
    features.insert("is_medium_song", Column::Numeric(medium))?;
    features.insert("is_long_song", Column::Numeric(long))?;
    Ok(())
}

/// One-hot columns for the given decade vocabulary. The original `decade`
/// column stays in place for downstream exclusion logic.
fn create_decade_features(features: &mut Frame, frame: &Frame, decades: &[String]) -> Result<()> {
    if decades.is_empty() || !frame.has_column("decade") {
        return Ok(());
    }
    let values = frame.categorical("decade")?;
    for decade in decades {
        let indicator: Vec<f64> = values.iter().map(|v| f64::from(v == decade)).collect();
        features.insert(format!("decade_{decade}"), Column::Numeric(indicator))?;
    }
    Ok(())
}
