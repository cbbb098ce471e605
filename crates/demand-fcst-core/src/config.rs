//! Forecast options and artifact locations.

use crate::error::{ForecastError, Result};
use serde::de::DeserializeOwned;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the artifact directory.
pub const ARTIFACT_DIR_ENV: &str = "DEMAND_FCST_ARTIFACT_DIR";

/// Artifact directory used when the environment does not name one.
pub const DEFAULT_ARTIFACT_DIR: &str = "model_artifacts";

/// Options for a 5-minute forecast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastOptions {
    /// Number of 5-minute steps to forecast; steps beyond the first are recursive.
    pub steps: usize,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self { steps: 1 }
    }
}

impl ForecastOptions {
    pub fn with_steps(steps: usize) -> Self {
        Self { steps }
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(ForecastError::InvalidParameter {
                param: "steps".to_string(),
                value: self.steps.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Locations of every artifact the engine loads at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub scaler: PathBuf,
    pub window_model: PathBuf,
    pub monthly_model: PathBuf,
    pub rainfall: PathBuf,
    /// Holiday list; the built-in national calendar is used when absent.
    pub holidays: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            scaler: dir.join("demand_scaler.json"),
            window_model: dir.join("demand_model.json"),
            monthly_model: dir.join("monthly_model.json"),
            rainfall: dir.join("monthly_rainfall.csv"),
            holidays: Some(dir.join("holidays.csv")),
        }
    }

    /// Resolve the artifact directory from [`ARTIFACT_DIR_ENV`].
    pub fn from_env() -> Self {
        let dir = env::var(ARTIFACT_DIR_ENV).unwrap_or_else(|_| DEFAULT_ARTIFACT_DIR.to_string());
        Self::in_dir(dir)
    }
}

/// Read and deserialize a JSON artifact.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| ForecastError::artifact_load(path, e))?;
    serde_json::from_str(&text).map_err(|e| ForecastError::artifact_load(path, e))
}
