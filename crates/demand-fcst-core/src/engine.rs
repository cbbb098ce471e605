//! Artifact loading and the long-lived forecasting service.
//!
//! Everything is loaded once, in [`ForecastService::start`]. The two
//! forecasters load independently: a failed load disables only the
//! forecaster it belongs to, whose calls then report
//! [`ForecastError::ArtifactUnavailable`]. There is no reload path.

use crate::calendar::{EnrichmentTables, HolidayCalendar, RainfallTable};
use crate::config::{ArtifactPaths, ForecastOptions};
use crate::error::{ForecastError, Result};
use crate::model::{LinearRegressor, LinearWindowModel};
use crate::monthly::{MonthlyForecast, MonthlyForecaster};
use crate::observation::{MonthlyAggregate, RawObservation};
use crate::recursive::{DemandForecaster, RecursiveForecast};
use crate::scaling::ColumnScaler;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{info, warn};

/// Years covered by the built-in holiday calendar.
pub const FALLBACK_HOLIDAY_YEARS: RangeInclusive<i32> = 2021..=2025;

/// Load the enrichment tables, scaler and window model.
pub fn load_demand_forecaster(paths: &ArtifactPaths) -> Result<DemandForecaster> {
    let holidays = match &paths.holidays {
        Some(path) if path.exists() => HolidayCalendar::from_csv(path)?,
        _ => {
            info!(
                years = ?FALLBACK_HOLIDAY_YEARS,
                "no holiday table found, using national holidays"
            );
            HolidayCalendar::india_national(FALLBACK_HOLIDAY_YEARS)
        }
    };
    let rainfall = RainfallTable::from_wide_csv(&paths.rainfall)?;
    let tables = Arc::new(EnrichmentTables::new(holidays, rainfall));

    let scaler = Arc::new(ColumnScaler::from_json_file(&paths.scaler)?);
    let window_model = Arc::new(LinearWindowModel::from_json_file(&paths.window_model)?);
    let forecaster = DemandForecaster::new(tables, scaler, window_model)?;
    info!(
        holidays = forecaster.tables().holidays.len(),
        rainfall_months = forecaster.tables().rainfall.len(),
        "demand forecaster ready"
    );
    Ok(forecaster)
}

/// Load the monthly regression model.
pub fn load_monthly_forecaster(paths: &ArtifactPaths) -> Result<MonthlyForecaster> {
    let model = Arc::new(LinearRegressor::from_json_file(&paths.monthly_model)?);
    let forecaster = MonthlyForecaster::new(model)?;
    info!("monthly forecaster ready");
    Ok(forecaster)
}

/// Both forecasters, ready to serve.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    demand: DemandForecaster,
    monthly: MonthlyForecaster,
}

impl ForecastEngine {
    pub fn new(demand: DemandForecaster, monthly: MonthlyForecaster) -> Self {
        Self { demand, monthly }
    }

    /// Load every artifact; fails if either forecaster cannot be bound.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        Ok(Self::new(
            load_demand_forecaster(paths)?,
            load_monthly_forecaster(paths)?,
        ))
    }

    pub fn demand(&self) -> &DemandForecaster {
        &self.demand
    }

    pub fn monthly(&self) -> &MonthlyForecaster {
        &self.monthly
    }

    pub fn forecast(
        &self,
        observations: &[RawObservation],
        options: &ForecastOptions,
    ) -> Result<RecursiveForecast> {
        self.demand.forecast(observations, options)
    }

    pub fn forecast_monthly(&self, history: &[MonthlyAggregate]) -> Result<MonthlyForecast> {
        self.monthly.forecast(history)
    }
}

/// Each forecaster, or the reason it failed to start.
#[derive(Debug)]
pub struct ForecastService {
    demand: std::result::Result<DemandForecaster, String>,
    monthly: std::result::Result<MonthlyForecaster, String>,
}

impl ForecastService {
    /// Load the artifacts; a failure is kept and reported on every call to
    /// the affected forecaster.
    pub fn start(paths: &ArtifactPaths) -> Self {
        let demand = load_demand_forecaster(paths).map_err(|e| {
            warn!(error = %e, "demand artifacts failed to load, 5-minute forecasting disabled");
            e.to_string()
        });
        let monthly = load_monthly_forecaster(paths).map_err(|e| {
            warn!(error = %e, "monthly model failed to load, monthly forecasting disabled");
            e.to_string()
        });
        Self { demand, monthly }
    }

    pub fn from_engine(engine: ForecastEngine) -> Self {
        Self {
            demand: Ok(engine.demand),
            monthly: Ok(engine.monthly),
        }
    }

    /// True when both forecasters loaded.
    pub fn is_ready(&self) -> bool {
        self.demand.is_ok() && self.monthly.is_ok()
    }

    pub fn demand(&self) -> Result<&DemandForecaster> {
        self.demand
            .as_ref()
            .map_err(|reason| ForecastError::ArtifactUnavailable(reason.clone()))
    }

    pub fn monthly(&self) -> Result<&MonthlyForecaster> {
        self.monthly
            .as_ref()
            .map_err(|reason| ForecastError::ArtifactUnavailable(reason.clone()))
    }

    pub fn forecast(
        &self,
        observations: &[RawObservation],
        options: &ForecastOptions,
    ) -> Result<RecursiveForecast> {
        self.demand()?.forecast(observations, options)
    }

    pub fn forecast_monthly(&self, history: &[MonthlyAggregate]) -> Result<MonthlyForecast> {
        self.monthly()?.forecast(history)
    }
}
