//! Feature scaling adapter.
//!
//! The scaler is fitted offline; this module only applies it. Every scaler
//! carries the ordered, versioned list of feature names it was fitted on.

use crate::config::read_json;
use crate::error::{ForecastError, Result};
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Scale values below this are treated as constant columns.
const MIN_SCALE: f64 = 1e-10;

/// Ordered feature names an artifact was fitted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(version: u32, names: Vec<String>) -> Self {
        Self { version, names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Position of `name`, or a schema mismatch naming it.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| ForecastError::SchemaMismatch {
                field: name.to_string(),
            })
    }
}

/// Reversible normalization between raw and model feature space.
pub trait FeatureScaler: Send + Sync {
    /// Column layout the scaler was fitted with.
    fn schema(&self) -> &FeatureSchema;

    /// Normalize a raw matrix whose columns follow [`Self::schema`].
    fn transform(&self, raw: &Mat<f64>) -> Result<Mat<f64>>;

    /// Map one normalized row back to raw space.
    ///
    /// Callers recover a single target value by inverting a row that is zero
    /// everywhere except the target column. That is only correct when columns
    /// are transformed independently of each other.
    fn inverse_transform(&self, scaled: &[f64]) -> Result<Vec<f64>>;
}

/// Per-column affine scaler: `scaled = (raw - center) / scale`.
///
/// Covers both standardization (center = mean, scale = std) and min-max
/// scaling to `[0, 1]` (center = min, scale = max - min).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnScaler {
    schema: FeatureSchema,
    center: Vec<f64>,
    scale: Vec<f64>,
}

impl ColumnScaler {
    pub fn new(schema: FeatureSchema, center: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if center.len() != schema.len() || scale.len() != schema.len() {
            return Err(ForecastError::InvalidInput(format!(
                "scaler has {} features but {} centers and {} scales",
                schema.len(),
                center.len(),
                scale.len()
            )));
        }
        if let Some(j) = center
            .iter()
            .zip(&scale)
            .position(|(c, s)| !c.is_finite() || !s.is_finite())
        {
            return Err(ForecastError::InvalidInput(format!(
                "scaler parameters for '{}' are not finite",
                schema.names[j]
            )));
        }
        let scale = scale
            .into_iter()
            .map(|s| if s.abs() < MIN_SCALE { 1.0 } else { s })
            .collect();
        Ok(Self {
            schema,
            center,
            scale,
        })
    }

    /// Scaler that leaves every value unchanged.
    pub fn identity(schema: FeatureSchema) -> Self {
        let n = schema.len();
        Self {
            schema,
            center: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    /// Min-max scaling to `[0, 1]` from fitted per-column bounds.
    pub fn min_max(schema: FeatureSchema, data_min: Vec<f64>, data_max: Vec<f64>) -> Result<Self> {
        if data_min.len() != data_max.len() {
            return Err(ForecastError::InvalidInput(
                "data_min and data_max must have the same length".to_string(),
            ));
        }
        let range = data_min
            .iter()
            .zip(&data_max)
            .map(|(lo, hi)| hi - lo)
            .collect();
        Self::new(schema, data_min, range)
    }

    /// Standardization from fitted per-column mean and standard deviation.
    pub fn standard(schema: FeatureSchema, mean: Vec<f64>, std: Vec<f64>) -> Result<Self> {
        Self::new(schema, mean, std)
    }

    /// Load a scaler document.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let artifact: ScalerArtifact = read_json(path)?;
        let scaler = artifact
            .into_scaler()
            .map_err(|e| ForecastError::artifact_load(path, e))?;
        info!(
            path = %path.display(),
            features = scaler.schema.len(),
            schema_version = scaler.schema.version,
            "loaded feature scaler"
        );
        Ok(scaler)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let artifact: ScalerArtifact = serde_json::from_str(json)
            .map_err(|e| ForecastError::InvalidInput(format!("invalid scaler document: {}", e)))?;
        artifact.into_scaler()
    }

    pub fn center(&self) -> &[f64] {
        &self.center
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

impl FeatureScaler for ColumnScaler {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn transform(&self, raw: &Mat<f64>) -> Result<Mat<f64>> {
        if raw.ncols() != self.schema.len() {
            return Err(ForecastError::InvalidInput(format!(
                "expected {} feature columns, got {}",
                self.schema.len(),
                raw.ncols()
            )));
        }
        Ok(Mat::from_fn(raw.nrows(), raw.ncols(), |i, j| {
            (raw[(i, j)] - self.center[j]) / self.scale[j]
        }))
    }

    fn inverse_transform(&self, scaled: &[f64]) -> Result<Vec<f64>> {
        if scaled.len() != self.schema.len() {
            return Err(ForecastError::InvalidInput(format!(
                "expected {} feature values, got {}",
                self.schema.len(),
                scaled.len()
            )));
        }
        Ok(scaled
            .iter()
            .zip(self.center.iter().zip(&self.scale))
            .map(|(x, (c, s))| x * s + c)
            .collect())
    }
}

/// Recover a raw target value from its normalized prediction.
///
/// Builds a zero row, places `value` at `target`, inverts it and reads the
/// target column back.
pub fn denormalize_target(scaler: &dyn FeatureScaler, target: usize, value: f64) -> Result<f64> {
    let width = scaler.schema().len();
    if target >= width {
        return Err(ForecastError::InvalidInput(format!(
            "target column {} outside {} features",
            target, width
        )));
    }
    let mut row = vec![0.0; width];
    row[target] = value;
    let raw = scaler.inverse_transform(&row)?;
    raw.get(target).copied().ok_or_else(|| {
        ForecastError::InternalError("inverse transform dropped the target column".to_string())
    })
}

/// On-disk scaler document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub schema: FeatureSchema,
    pub params: ScalerParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    Affine { center: Vec<f64>, scale: Vec<f64> },
    MinMax { data_min: Vec<f64>, data_max: Vec<f64> },
    Standard { mean: Vec<f64>, std: Vec<f64> },
}

impl ScalerArtifact {
    pub fn into_scaler(self) -> Result<ColumnScaler> {
        match self.params {
            ScalerParams::Affine { center, scale } => ColumnScaler::new(self.schema, center, scale),
            ScalerParams::MinMax { data_min, data_max } => {
                ColumnScaler::min_max(self.schema, data_min, data_max)
            }
            ScalerParams::Standard { mean, std } => ColumnScaler::standard(self.schema, mean, std),
        }
    }
}
