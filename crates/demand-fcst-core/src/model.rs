//! Forecast model interfaces and the linear artifacts that implement them.
//!
//! Models are trained elsewhere. The engine only needs a function from a
//! normalized feature window (or monthly feature vector) to one scalar.

use crate::config::read_json;
use crate::error::{ForecastError, Result};
use crate::scaling::FeatureSchema;
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Model over a (timesteps x features) normalized window.
pub trait WindowModel: Send + Sync {
    /// Expected input shape, when the model knows it.
    fn input_shape(&self) -> Option<(usize, usize)> {
        None
    }

    /// Predict the next normalized demand value.
    fn predict(&self, window: &Mat<f64>) -> Result<f64>;
}

/// Model over a single monthly feature vector.
pub trait MonthlyModel: Send + Sync {
    /// Ordered feature names the model was fitted with.
    fn schema(&self) -> &FeatureSchema;

    fn predict(&self, features: &[f64]) -> Result<f64>;
}

/// Linear readout over the whole window: `bias + sum(w[i, j] * x[i, j])`.
#[derive(Debug, Clone)]
pub struct LinearWindowModel {
    weights: Mat<f64>,
    bias: f64,
}

impl LinearWindowModel {
    pub fn new(weights: Mat<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    /// Load a window model document (`timesteps`, `features`, row-major
    /// `weights`, `bias`).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let artifact: WindowModelArtifact = read_json(path)?;
        let model = artifact
            .into_model()
            .map_err(|e| ForecastError::artifact_load(path, e))?;
        info!(
            path = %path.display(),
            timesteps = model.weights.nrows(),
            features = model.weights.ncols(),
            "loaded window model"
        );
        Ok(model)
    }
}

impl WindowModel for LinearWindowModel {
    fn input_shape(&self) -> Option<(usize, usize)> {
        Some((self.weights.nrows(), self.weights.ncols()))
    }

    fn predict(&self, window: &Mat<f64>) -> Result<f64> {
        if window.nrows() != self.weights.nrows() || window.ncols() != self.weights.ncols() {
            return Err(ForecastError::InvalidInput(format!(
                "window model expects {}x{} input, got {}x{}",
                self.weights.nrows(),
                self.weights.ncols(),
                window.nrows(),
                window.ncols()
            )));
        }
        let mut acc = self.bias;
        for j in 0..window.ncols() {
            for i in 0..window.nrows() {
                acc += self.weights[(i, j)] * window[(i, j)];
            }
        }
        if !acc.is_finite() {
            return Err(ForecastError::InvalidInput(
                "window model produced a non-finite value".to_string(),
            ));
        }
        Ok(acc)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowModelArtifact {
    pub timesteps: usize,
    pub features: usize,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl WindowModelArtifact {
    pub fn into_model(self) -> Result<LinearWindowModel> {
        if self.weights.len() != self.timesteps * self.features {
            return Err(ForecastError::InvalidInput(format!(
                "expected {} weights for a {}x{} window, got {}",
                self.timesteps * self.features,
                self.timesteps,
                self.features,
                self.weights.len()
            )));
        }
        let features = self.features;
        let weights = Mat::from_fn(self.timesteps, features, |i, j| {
            self.weights[i * features + j]
        });
        Ok(LinearWindowModel::new(weights, self.bias))
    }
}

/// Linear regression over named monthly features.
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    schema: FeatureSchema,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(schema: FeatureSchema, coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        if coefficients.len() != schema.len() {
            return Err(ForecastError::InvalidInput(format!(
                "{} coefficients for {} features",
                coefficients.len(),
                schema.len()
            )));
        }
        Ok(Self {
            schema,
            coefficients,
            intercept,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let artifact: RegressorArtifact = read_json(path)?;
        let model = LinearRegressor::new(artifact.schema, artifact.coefficients, artifact.intercept)
            .map_err(|e| ForecastError::artifact_load(path, e))?;
        info!(
            path = %path.display(),
            features = model.schema.len(),
            "loaded monthly model"
        );
        Ok(model)
    }
}

impl MonthlyModel for LinearRegressor {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(ForecastError::InvalidInput(format!(
                "monthly model expects {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }
        Ok(self.intercept
            + features
                .iter()
                .zip(&self.coefficients)
                .map(|(x, b)| x * b)
                .sum::<f64>())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressorArtifact {
    pub schema: FeatureSchema,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_window_model() {
        let weights = Mat::from_fn(3, 2, |i, j| if j == 0 { (i + 1) as f64 } else { 0.0 });
        let model = LinearWindowModel::new(weights, 0.5);
        let window = Mat::from_fn(3, 2, |_, _| 1.0);
        assert_relative_eq!(model.predict(&window).unwrap(), 6.5);
        assert_eq!(model.input_shape(), Some((3, 2)));
        assert!(model.predict(&Mat::zeros(2, 2)).is_err());
    }

    #[test]
    fn test_window_artifact_row_major() {
        let artifact = WindowModelArtifact {
            timesteps: 2,
            features: 3,
            weights: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            bias: 0.0,
        };
        let model = artifact.into_model().unwrap();
        let mut window = Mat::<f64>::zeros(2, 3);
        window[(1, 2)] = 1.0;
        assert_relative_eq!(model.predict(&window).unwrap(), 6.0);

        let bad = WindowModelArtifact {
            timesteps: 2,
            features: 3,
            weights: vec![1.0; 5],
            bias: 0.0,
        };
        assert!(bad.into_model().is_err());
    }

    #[test]
    fn test_linear_regressor() {
        let schema = FeatureSchema::new(1, vec!["demand_lag_1".into(), "temp".into()]);
        let model = LinearRegressor::new(schema, vec![0.9, 1000.0], 50.0).unwrap();
        assert_relative_eq!(model.predict(&[100.0, 2.0]).unwrap(), 2140.0);
        assert!(model.predict(&[1.0]).is_err());
    }

    #[test]
    fn test_regressor_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monthly_model.json");
        std::fs::write(
            &path,
            r#"{"schema": {"version": 1, "names": ["demand_lag_12"]},
                "coefficients": [1.05], "intercept": 0.0}"#,
        )
        .unwrap();
        let model = LinearRegressor::from_json_file(&path).unwrap();
        assert_eq!(model.schema().names, vec!["demand_lag_12".to_string()]);

        std::fs::write(
            &path,
            r#"{"schema": {"version": 1, "names": ["a", "b"]},
                "coefficients": [1.0], "intercept": 0.0}"#,
        )
        .unwrap();
        assert!(matches!(
            LinearRegressor::from_json_file(&path),
            Err(ForecastError::ArtifactLoad { .. })
        ));
    }
}
