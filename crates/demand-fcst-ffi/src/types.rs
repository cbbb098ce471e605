//! C-compatible type definitions for FFI boundary.
//!
//! Timestamps cross as microseconds since the Unix epoch (naive local time
//! interpreted as UTC). Optional annual indicators cross as NaN.

use demand_fcst_core::ForecastError;
use libc::{c_char, c_double, c_int, size_t};

/// Error codes for FFI boundary.
///
/// Codes 1-8 and 10 match `ForecastError::to_code`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InsufficientData = 1,
    InsufficientCleanRows = 2,
    InsufficientHistory = 3,
    SchemaMismatch = 4,
    ArtifactUnavailable = 5,
    ArtifactLoad = 6,
    InvalidInput = 7,
    InvalidParameter = 8,
    NullPointer = 9,
    InternalError = 10,
    PanicCaught = 11,
    AllocationError = 12,
}

impl From<&ForecastError> for ErrorCode {
    fn from(err: &ForecastError) -> Self {
        match err.to_code() {
            1 => ErrorCode::InsufficientData,
            2 => ErrorCode::InsufficientCleanRows,
            3 => ErrorCode::InsufficientHistory,
            4 => ErrorCode::SchemaMismatch,
            5 => ErrorCode::ArtifactUnavailable,
            6 => ErrorCode::ArtifactLoad,
            7 => ErrorCode::InvalidInput,
            8 => ErrorCode::InvalidParameter,
            _ => ErrorCode::InternalError,
        }
    }
}

/// Error structure with message buffer for FFI.
#[repr(C)]
#[derive(Debug)]
pub struct DemandError {
    pub code: ErrorCode,
    /// Index of the recursive step that failed, or -1.
    pub failed_step: c_int,
    pub message: [c_char; 256],
}

impl DemandError {
    /// Create a success error (no error).
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            failed_step: -1,
            message: [0; 256],
        }
    }

    /// Set an error with code and message.
    pub fn set_error(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        write_c_string(&mut self.message, msg);
    }

    /// Record a core error, keeping its code and failed step.
    pub fn set_forecast_error(&mut self, err: &ForecastError) {
        self.set_error(ErrorCode::from(err), &err.to_string());
        self.failed_step = err
            .failed_step()
            .and_then(|s| c_int::try_from(s).ok())
            .unwrap_or(-1);
    }

    /// Message as a Rust string (up to the first NUL).
    pub fn message_str(&self) -> String {
        let bytes: Vec<u8> = self
            .message
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for DemandError {
    fn default() -> Self {
        Self::success()
    }
}

/// Copy `s` into a fixed C buffer, truncating and NUL-terminating.
pub fn write_c_string(buf: &mut [c_char], s: &str) {
    if buf.is_empty() {
        return;
    }
    let bytes = s.as_bytes();
    let len = bytes.len().min(buf.len() - 1);
    for (i, &b) in bytes[..len].iter().enumerate() {
        buf[i] = b as c_char;
    }
    buf[len] = 0; // Null terminator
}

/// One 5-minute observation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawObservationC {
    /// Microseconds since epoch
    pub timestamp_micros: i64,
    pub demand: c_double,
    pub temperature: c_double,
    pub dew_point: c_double,
    pub relative_humidity: c_double,
    pub wind_direction: c_double,
    pub wind_speed: c_double,
    pub pressure: c_double,
    pub moving_avg_3: c_double,
}

/// One monthly aggregate; NaN marks an unpublished annual indicator.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyAggregateC {
    pub year: c_int,
    pub month: c_int,
    pub total_demand: c_double,
    pub temperature: c_double,
    pub dew_point: c_double,
    pub relative_humidity: c_double,
    pub wind_direction: c_double,
    pub wind_speed: c_double,
    pub pressure: c_double,
    pub total_rainfall: c_double,
    pub companies_newly_registered: c_double,
    pub land_net_area_sown: c_double,
    pub labour_force_participation: c_double,
    pub total_vehicles_plying: c_double,
}

/// Recursive forecast result.
#[repr(C)]
pub struct ForecastResult {
    /// Point predictions, one per step
    pub predictions: *mut c_double,
    pub n_predictions: size_t,
    /// Synthesized feedback observations (n_predictions - 1)
    pub synthesized: *mut RawObservationC,
    pub n_synthesized: size_t,
    /// Set for multi-step forecasts
    pub has_warning: bool,
    pub warning: [c_char; 256],
}

impl Default for ForecastResult {
    fn default() -> Self {
        Self {
            predictions: std::ptr::null_mut(),
            n_predictions: 0,
            synthesized: std::ptr::null_mut(),
            n_synthesized: 0,
            has_warning: false,
            warning: [0; 256],
        }
    }
}

/// Monthly forecast result.
#[repr(C)]
pub struct MonthlyForecastResult {
    pub prediction: c_double,
    pub target_year: c_int,
    pub target_month: c_int,
    /// Target month as "YYYY-MM"
    pub target_label: [c_char; 16],
}

impl Default for MonthlyForecastResult {
    fn default() -> Self {
        Self {
            prediction: f64::NAN,
            target_year: 0,
            target_month: 0,
            target_label: [0; 16],
        }
    }
}
