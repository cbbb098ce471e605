//! Monthly demand forecasting from aggregated history.
//!
//! Features are aligned to the target month, i.e. the month after the last
//! aggregate: the 12-month lag, the 1-month lag and the trailing 3-month mean
//! all look back from the target.

use crate::error::{ForecastError, Result};
use crate::model::MonthlyModel;
use crate::observation::{AnnualIndicators, MonthlyAggregate, YearMonth};
use anofox_forecast::transform::rolling_mean;
use std::sync::Arc;
use tracing::debug;

/// Minimum contiguous months needed to forecast.
pub const MONTHLY_MIN_HISTORY: usize = 12;

/// Months kept after forward-filling the annual indicators.
pub const MONTHLY_TRIM: usize = 15;

/// Column names a monthly model may be fitted with.
pub const MONTHLY_COLUMNS: [&str; 19] = [
    "Year",
    "year",
    "Month",
    "month",
    "Total_Demand_kW",
    "temp",
    "dwpt",
    "rhum",
    "wdir",
    "wspd",
    "pres",
    "Total_Rainfall_mm",
    "Companies_Newly_Registered",
    "Land_Net_Area_Sown",
    "Labour_Force_Participation_All",
    "Total_Vehicles_Plying",
    "demand_lag_12",
    "demand_lag_1",
    "demand_rolling_3",
];

/// Carry the last observed value forward over missing entries (LOCF).
pub fn fill_nulls_forward(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());
    let mut last_value: Option<f64> = None;

    for v in values {
        if let Some(x) = v {
            last_value = Some(*x);
        }
        result.push(last_value);
    }

    result
}

/// Forward-fill every annual indicator across the history.
pub fn forward_fill_indicators(history: &[MonthlyAggregate]) -> Vec<MonthlyAggregate> {
    let column = |get: fn(&AnnualIndicators) -> Option<f64>| {
        let values: Vec<Option<f64>> = history.iter().map(|m| get(&m.indicators)).collect();
        fill_nulls_forward(&values)
    };
    let companies = column(|i| i.companies_newly_registered);
    let land = column(|i| i.land_net_area_sown);
    let labour = column(|i| i.labour_force_participation);
    let vehicles = column(|i| i.total_vehicles_plying);

    history
        .iter()
        .enumerate()
        .map(|(i, m)| MonthlyAggregate {
            indicators: AnnualIndicators {
                companies_newly_registered: companies[i],
                land_net_area_sown: land[i],
                labour_force_participation: labour[i],
                total_vehicles_plying: vehicles[i],
            },
            ..m.clone()
        })
        .collect()
}

/// Length of the trailing run of consecutive calendar months.
pub fn contiguous_run(history: &[MonthlyAggregate]) -> usize {
    if history.is_empty() {
        return 0;
    }
    let mut run = 1;
    for pair in history.windows(2).rev() {
        if pair[1].year_month().ordinal() - pair[0].year_month().ordinal() != 1 {
            break;
        }
        run += 1;
    }
    run
}

/// Last aggregate plus the lag features for the target month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyFeatureRow {
    pub aggregate: MonthlyAggregate,
    pub target: YearMonth,
    pub demand_lag_12: f64,
    pub demand_lag_1: f64,
    pub demand_rolling_3: f64,
}

impl MonthlyFeatureRow {
    /// Value of a named monthly column.
    pub fn value(&self, name: &str) -> Result<f64> {
        let a = &self.aggregate;
        let indicator = |v: Option<f64>| {
            v.ok_or_else(|| {
                ForecastError::InvalidInput(format!("{} has no published value", name))
            })
        };
        match name {
            "Year" | "year" => Ok(a.year as f64),
            "Month" | "month" => Ok(a.month as f64),
            "Total_Demand_kW" => Ok(a.total_demand),
            "temp" => Ok(a.temperature),
            "dwpt" => Ok(a.dew_point),
            "rhum" => Ok(a.relative_humidity),
            "wdir" => Ok(a.wind_direction),
            "wspd" => Ok(a.wind_speed),
            "pres" => Ok(a.pressure),
            "Total_Rainfall_mm" => Ok(a.total_rainfall),
            "Companies_Newly_Registered" => indicator(a.indicators.companies_newly_registered),
            "Land_Net_Area_Sown" => indicator(a.indicators.land_net_area_sown),
            "Labour_Force_Participation_All" => indicator(a.indicators.labour_force_participation),
            "Total_Vehicles_Plying" => indicator(a.indicators.total_vehicles_plying),
            "demand_lag_12" => Ok(self.demand_lag_12),
            "demand_lag_1" => Ok(self.demand_lag_1),
            "demand_rolling_3" => Ok(self.demand_rolling_3),
            other => Err(ForecastError::SchemaMismatch {
                field: other.to_string(),
            }),
        }
    }
}

/// Build the target-month feature row from contiguous history.
pub fn build_feature_row(history: &[MonthlyAggregate]) -> Result<MonthlyFeatureRow> {
    let n = history.len();
    let last = match history.last() {
        Some(last) if n >= MONTHLY_MIN_HISTORY => last,
        _ => {
            return Err(ForecastError::InsufficientHistory {
                needed: MONTHLY_MIN_HISTORY,
                got: n,
            })
        }
    };

    // Demand extended with an empty slot for the target month.
    let mut demand: Vec<f64> = history.iter().map(|m| m.total_demand).collect();
    demand.push(f64::NAN);

    let shift = |k: usize| demand[n - k];
    let mut shifted = vec![f64::NAN];
    shifted.extend_from_slice(&demand[..n]);
    let rolling = rolling_mean(&shifted, 3, false);

    let target = last.year_month().next();
    let row = MonthlyFeatureRow {
        aggregate: last.clone(),
        target,
        demand_lag_12: shift(12),
        demand_lag_1: shift(1),
        demand_rolling_3: rolling[n],
    };

    for (name, v) in [
        ("demand_lag_12", row.demand_lag_12),
        ("demand_lag_1", row.demand_lag_1),
        ("demand_rolling_3", row.demand_rolling_3),
    ] {
        if !v.is_finite() {
            return Err(ForecastError::InvalidInput(format!(
                "{} is undefined for {}",
                name, target
            )));
        }
    }
    Ok(row)
}

/// Single monthly prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyForecast {
    pub prediction: f64,
    pub target: YearMonth,
}

/// Monthly forecaster bound to its fitted model.
#[derive(Clone)]
pub struct MonthlyForecaster {
    model: Arc<dyn MonthlyModel>,
}

impl std::fmt::Debug for MonthlyForecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonthlyForecaster")
            .field("schema", self.model.schema())
            .finish()
    }
}

impl MonthlyForecaster {
    /// Bind the model; every schema column must be a known monthly column.
    pub fn new(model: Arc<dyn MonthlyModel>) -> Result<Self> {
        if let Some(unknown) = model
            .schema()
            .names
            .iter()
            .find(|n| !MONTHLY_COLUMNS.contains(&n.as_str()))
        {
            return Err(ForecastError::SchemaMismatch {
                field: unknown.clone(),
            });
        }
        Ok(Self { model })
    }

    /// Predict total demand for the month after the last aggregate.
    pub fn forecast(&self, history: &[MonthlyAggregate]) -> Result<MonthlyForecast> {
        if history.len() < MONTHLY_MIN_HISTORY {
            return Err(ForecastError::InsufficientHistory {
                needed: MONTHLY_MIN_HISTORY,
                got: history.len(),
            });
        }

        let filled = forward_fill_indicators(history);
        let trimmed = &filled[filled.len().saturating_sub(MONTHLY_TRIM)..];
        let run = contiguous_run(trimmed);
        if run < MONTHLY_MIN_HISTORY {
            return Err(ForecastError::InsufficientHistory {
                needed: MONTHLY_MIN_HISTORY,
                got: run,
            });
        }

        let row = build_feature_row(&trimmed[trimmed.len() - run..])?;
        let features = self
            .model
            .schema()
            .names
            .iter()
            .map(|name| row.value(name))
            .collect::<Result<Vec<f64>>>()?;
        let prediction = self.model.predict(&features)?;
        debug!(target_month = %row.target, prediction, "monthly forecast complete");

        Ok(MonthlyForecast {
            prediction,
            target: row.target,
        })
    }
}
