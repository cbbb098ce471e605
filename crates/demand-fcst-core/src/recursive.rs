//! Recursive multi-step 5-minute demand forecasting.
//!
//! Each step runs the feature pipeline over the current window, normalizes
//! the trailing feature window, asks the model for the next value and maps
//! it back to raw demand. Between steps a synthetic observation carrying the
//! prediction is appended and the oldest observation is evicted.
//!
//! Weather is held at the last observed values for every synthetic
//! observation, so errors compound over the horizon: residual model error is
//! fed back as input and the weather drifts away from reality.

use crate::calendar::EnrichmentTables;
use crate::config::ForecastOptions;
use crate::error::{ForecastError, Result, Stage};
use crate::features::{
    engineer, feature_window, FeatureColumn, FeatureRow, REQUIRED_INPUT_ROWS, TIMESTEPS,
};
use crate::model::WindowModel;
use crate::observation::{RawObservation, RawWindow, STEP_MINUTES};
use crate::scaling::{denormalize_target, FeatureScaler};
use chrono::Duration;
use faer::Mat;
use std::sync::Arc;
use tracing::{debug, warn};

/// Notice attached to every forecast longer than one step.
pub const RECURSIVE_WARNING: &str = "Predictions beyond the first step are recursive and may be \
     inaccurate due to error accumulation and the assumption that weather stays constant.";

/// Upper bound on result buffers reserved up front.
const MAX_PREALLOCATED_STEPS: usize = 4 * TIMESTEPS;

/// Output of a recursive forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursiveForecast {
    /// One real-valued prediction per step, in order.
    pub predictions: Vec<f64>,
    /// Observations synthesized between steps (one fewer than predictions).
    pub synthesized: Vec<RawObservation>,
    /// Set when more than one step was requested.
    pub warning: Option<String>,
}

/// 5-minute forecaster bound to its tables, scaler and model.
#[derive(Clone)]
pub struct DemandForecaster {
    tables: Arc<EnrichmentTables>,
    scaler: Arc<dyn FeatureScaler>,
    model: Arc<dyn WindowModel>,
    demand_index: usize,
}

impl std::fmt::Debug for DemandForecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemandForecaster")
            .field("schema", self.scaler.schema())
            .field("demand_index", &self.demand_index)
            .finish()
    }
}

impl DemandForecaster {
    /// Bind the artifacts.
    ///
    /// The scaler schema must contain the demand column; a model that reports
    /// its input shape must match (TIMESTEPS x schema width).
    pub fn new(
        tables: Arc<EnrichmentTables>,
        scaler: Arc<dyn FeatureScaler>,
        model: Arc<dyn WindowModel>,
    ) -> Result<Self> {
        let schema = scaler.schema();
        let demand_index = schema.require(FeatureColumn::Demand.name())?;
        if let Some((rows, cols)) = model.input_shape() {
            if rows != TIMESTEPS || cols != schema.len() {
                return Err(ForecastError::InvalidInput(format!(
                    "model input {}x{} does not match {}x{} feature window",
                    rows,
                    cols,
                    TIMESTEPS,
                    schema.len()
                )));
            }
        }
        Ok(Self {
            tables,
            scaler,
            model,
            demand_index,
        })
    }

    pub fn tables(&self) -> &EnrichmentTables {
        &self.tables
    }

    pub fn scaler(&self) -> &dyn FeatureScaler {
        self.scaler.as_ref()
    }

    /// Forecast `options.steps` consecutive 5-minute demand values.
    ///
    /// The window must hold at least [`REQUIRED_INPUT_ROWS`] gap-free
    /// observations. Any failing step aborts the whole call.
    pub fn forecast(
        &self,
        observations: &[RawObservation],
        options: &ForecastOptions,
    ) -> Result<RecursiveForecast> {
        options.validate()?;
        if observations.len() < REQUIRED_INPUT_ROWS {
            return Err(ForecastError::InsufficientData {
                needed: REQUIRED_INPUT_ROWS,
                got: observations.len(),
            });
        }
        let steps = options.steps;
        if steps > 1 {
            warn!(steps, "recursive forecast requested; accuracy degrades after the first step");
        }

        let mut window = RawWindow::new(observations.to_vec())?.tail(REQUIRED_INPUT_ROWS);
        // Capacity is bounded; `steps` arrives unchecked from callers.
        let mut predictions = Vec::with_capacity(steps.min(MAX_PREALLOCATED_STEPS));
        let mut synthesized = Vec::with_capacity(steps.min(MAX_PREALLOCATED_STEPS));

        for step in 0..steps {
            let prediction = self.predict_step(&window, step)?;
            debug!(step, prediction, "forecast step complete");
            predictions.push(prediction);

            if step + 1 < steps {
                let next = synthesize_next(&window, prediction).map_err(at(step, Stage::Feedback))?;
                window = window.advance(next).map_err(at(step, Stage::Feedback))?;
                synthesized.push(next);
            }
        }

        Ok(RecursiveForecast {
            predictions,
            synthesized,
            warning: (steps > 1).then(|| RECURSIVE_WARNING.to_string()),
        })
    }

    /// One pass of feature, normalize, infer and denormalize.
    fn predict_step(&self, window: &RawWindow, step: usize) -> Result<f64> {
        let rows = featurize(window, &self.tables).map_err(at(step, Stage::Feature))?;
        let scaled = self.normalize(&rows).map_err(at(step, Stage::Normalize))?;
        let output = self.model.predict(&scaled).map_err(at(step, Stage::Infer))?;
        denormalize_target(self.scaler.as_ref(), self.demand_index, output)
            .map_err(at(step, Stage::Denormalize))
    }

    /// Align the trailing feature window to the scaler schema and normalize it.
    pub fn normalize(&self, rows: &[FeatureRow]) -> Result<Mat<f64>> {
        let raw = feature_window(rows, self.scaler.schema())?;
        self.scaler.transform(&raw)
    }
}

/// Feature rows for the current window.
pub fn featurize(window: &RawWindow, tables: &EnrichmentTables) -> Result<Vec<FeatureRow>> {
    engineer(window.as_slice(), tables)
}

/// Observation following the window, carrying `prediction` as its demand.
///
/// The moving average covers the prediction and the two previous demands;
/// weather is copied from the last observation.
pub fn synthesize_next(window: &RawWindow, prediction: f64) -> Result<RawObservation> {
    let obs = window.as_slice();
    if obs.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: obs.len(),
        });
    }
    let last = obs[obs.len() - 1];
    let previous = obs[obs.len() - 2];
    let timestamp = last
        .timestamp
        .checked_add_signed(Duration::minutes(STEP_MINUTES))
        .ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "no timestamp follows {} within the calendar range",
                last.timestamp
            ))
        })?;

    Ok(RawObservation {
        timestamp,
        demand: prediction,
        moving_avg_3: (prediction + last.demand + previous.demand) / 3.0,
        ..last
    })
}

fn at(step: usize, stage: Stage) -> impl FnOnce(ForecastError) -> ForecastError {
    move |source| ForecastError::StepFailed {
        step,
        stage,
        source: Box::new(source),
    }
}
