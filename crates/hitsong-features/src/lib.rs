//! # hitsong-features
//!
//! Feature engineering for the hit-song prediction pipeline: pairwise
//! interaction ratios, duration buckets, decade one-hots and z-score
//! scaling, with a serializable [`FeatureSchema`] so inference batches are
//! aligned against the training feature space instead of re-deriving their
//! own.

pub mod engineer;
pub mod schema;

use hitsong_core::CoreError;
use thiserror::Error;

pub use engineer::{feature_column_names, FeatureEngineer, BASE_AUDIO_FEATURES};
pub use schema::FeatureSchema;

/// Result type for feature engineering operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors that can occur during feature engineering.
#[derive(Error, Debug)]
pub enum FeatureError {
    /// Table-level failure (missing column, type mismatch, unfitted scaler).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Schema (de)serialization failure.
    #[error("Schema serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
