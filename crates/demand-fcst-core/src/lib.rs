//! Core library for the electrical demand forecaster.
//!
//! This crate provides the 5-minute recursive demand forecaster, the monthly
//! lag forecaster and the feature pipeline, scaling and artifact loading
//! they share.

pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod model;
pub mod monthly;
pub mod observation;
pub mod recursive;
pub mod scaling;

// Re-exports for convenience
pub use calendar::{EnrichmentTables, HolidayCalendar, RainfallStats, RainfallTable, Season};
pub use config::{ArtifactPaths, ForecastOptions, ARTIFACT_DIR_ENV, DEFAULT_ARTIFACT_DIR};
pub use engine::{
    load_demand_forecaster, load_monthly_forecaster, ForecastEngine, ForecastService,
    FALLBACK_HOLIDAY_YEARS,
};
pub use error::{ForecastError, Result, Stage};
pub use features::{
    compute_features, drop_incomplete, engineer, feature_window, resolve_columns, DraftFeatureRow,
    FeatureColumn, FeatureRow, LAG_1HR, LAG_24HR, LAG_WEEKS, REQUIRED_INPUT_ROWS, TIMESTEPS,
};
pub use model::{
    LinearRegressor, LinearWindowModel, MonthlyModel, RegressorArtifact, WindowModel,
    WindowModelArtifact,
};
pub use monthly::{
    build_feature_row, contiguous_run, forward_fill_indicators, MonthlyFeatureRow,
    MonthlyForecast, MonthlyForecaster, MONTHLY_MIN_HISTORY, MONTHLY_TRIM,
};
pub use observation::{
    AnnualIndicators, MonthlyAggregate, RawObservation, RawWindow, YearMonth, STEP_MINUTES,
};
pub use recursive::{
    featurize, synthesize_next, DemandForecaster, RecursiveForecast, RECURSIVE_WARNING,
};
pub use scaling::{
    denormalize_target, ColumnScaler, FeatureSchema, FeatureScaler, ScalerArtifact, ScalerParams,
};
