//! FFI boundary layer for the demand forecasting engine.
//!
//! This crate provides C-compatible functions over the core forecasters.
//! The engine is initialized once with `demand_engine_init`; every other
//! call reads it.

pub mod allocation;
pub mod conversion;
pub mod engine;
pub mod error_handling;
pub mod types;

use allocation::alloc_and_copy_array;
use conversion::{aggregate_from_c, c_str_to_str, observation_from_c, observation_to_c};
use demand_fcst_core::{ArtifactPaths, ForecastOptions, Result};
use error_handling::{check_null_pointers, ffi_try, init_error};
use libc::{c_char, c_double, size_t};
use std::panic::{catch_unwind, AssertUnwindSafe};

pub use types::*;

// ============================================================================
// Engine lifecycle
// ============================================================================

/// Load the artifacts from `artifact_dir` and start the engine.
///
/// A null or empty directory falls back to `DEMAND_FCST_ARTIFACT_DIR` (or
/// `model_artifacts`). Returns whether both forecasters are ready; a failed
/// load disables only the affected forecaster, for the lifetime of the
/// process.
///
/// # Safety
/// `artifact_dir` must be null or a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn demand_engine_init(artifact_dir: *const c_char) -> bool {
    let dir = c_str_to_str(artifact_dir, "");
    let paths = if dir.is_empty() {
        ArtifactPaths::from_env()
    } else {
        ArtifactPaths::in_dir(dir)
    };
    catch_unwind(AssertUnwindSafe(|| engine::init(&paths))).unwrap_or(false)
}

#[no_mangle]
pub extern "C" fn demand_engine_is_ready() -> bool {
    engine::is_ready()
}

// ============================================================================
// Forecasting
// ============================================================================

/// Forecast `steps` consecutive 5-minute demand values.
///
/// # Safety
/// `observations` must point to `length` records; `out_result` must be
/// valid; `out_error` must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn demand_forecast(
    observations: *const RawObservationC,
    length: size_t,
    steps: size_t,
    out_result: *mut ForecastResult,
    out_error: *mut DemandError,
) -> bool {
    init_error(out_error);
    if check_null_pointers(
        out_error,
        &[
            observations as *const core::ffi::c_void,
            out_result as *const core::ffi::c_void,
        ],
    ) {
        return false;
    }

    let forecast = ffi_try(out_error, || {
        let records = std::slice::from_raw_parts(observations, length);
        let window = records
            .iter()
            .map(observation_from_c)
            .collect::<Result<Vec<_>>>()?;
        engine::service()?.forecast(&window, &ForecastOptions::with_steps(steps))
    });
    let Some(forecast) = forecast else {
        return false;
    };

    let synthesized: Vec<RawObservationC> =
        forecast.synthesized.iter().map(observation_to_c).collect();

    let mut result = ForecastResult::default();
    if !alloc_and_copy_array(&forecast.predictions, &mut result.predictions, out_error) {
        return false;
    }
    if !alloc_and_copy_array(&synthesized, &mut result.synthesized, out_error) {
        free_fields!(result, predictions);
        return false;
    }
    result.n_predictions = forecast.predictions.len();
    result.n_synthesized = synthesized.len();
    if let Some(warning) = &forecast.warning {
        result.has_warning = true;
        write_c_string(&mut result.warning, warning);
    }

    *out_result = result;
    true
}

/// Forecast the month following the last aggregate in `history`.
///
/// # Safety
/// `history` must point to `length` records; `out_result` must be valid;
/// `out_error` must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn demand_forecast_monthly(
    history: *const MonthlyAggregateC,
    length: size_t,
    out_result: *mut MonthlyForecastResult,
    out_error: *mut DemandError,
) -> bool {
    init_error(out_error);
    if check_null_pointers(
        out_error,
        &[
            history as *const core::ffi::c_void,
            out_result as *const core::ffi::c_void,
        ],
    ) {
        return false;
    }

    let forecast = ffi_try(out_error, || {
        let records = std::slice::from_raw_parts(history, length);
        let months = records
            .iter()
            .map(aggregate_from_c)
            .collect::<Result<Vec<_>>>()?;
        engine::service()?.forecast_monthly(&months)
    });
    let Some(forecast) = forecast else {
        return false;
    };

    let mut result = MonthlyForecastResult {
        prediction: forecast.prediction,
        target_year: forecast.target.year,
        target_month: forecast.target.month as libc::c_int,
        ..Default::default()
    };
    write_c_string(&mut result.target_label, &forecast.target.to_string());

    *out_result = result;
    true
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free the arrays owned by a ForecastResult.
///
/// # Safety
/// The result pointer must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn demand_free_forecast_result(result: *mut ForecastResult) {
    if result.is_null() {
        return;
    }
    let r = &mut *result;
    free_fields!(r, predictions, synthesized);
    r.n_predictions = 0;
    r.n_synthesized = 0;
}

/// Free a double array.
///
/// # Safety
/// The pointer must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn demand_free_double_array(ptr: *mut c_double) {
    allocation::free_ptr(ptr as *mut core::ffi::c_void);
}

// ============================================================================
// Version
// ============================================================================

#[no_mangle]
pub extern "C" fn demand_fcst_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}
