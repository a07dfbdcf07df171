//! Feature schema captured at fit time.
//!
//! The schema pins everything inference needs to reproduce the training
//! feature space: the ordered feature-column list, the decade vocabulary
//! behind the one-hot columns, and the fitted scaler parameters. It
//! round-trips through JSON so it can live next to persisted models.

use std::path::Path;

use hitsong_core::StandardScaler;
use serde::{Deserialize, Serialize};

use crate::{FeatureError, Result};

/// The feature space learned by a `fit_transform` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    feature_columns: Vec<String>,
    decades: Vec<String>,
    scaler: StandardScaler,
}

impl FeatureSchema {
    pub(crate) fn new(
        feature_columns: Vec<String>,
        decades: Vec<String>,
        scaler: StandardScaler,
    ) -> Self {
        Self {
            feature_columns,
            decades,
            scaler,
        }
    }

    /// Ordered feature columns the model was trained on.
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Decade vocabulary observed at fit time, sorted.
    pub fn decades(&self) -> &[String] {
        &self.decades
    }

    /// The scaler fitted on the training batch.
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Write the schema as JSON, atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load a schema previously written by [`FeatureSchema::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(FeatureError::from)
    }
}
