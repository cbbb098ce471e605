//! Conversion between C records and core types.

use crate::types::{MonthlyAggregateC, RawObservationC};
use chrono::{DateTime, NaiveDateTime};
use core::ffi::c_char;
use demand_fcst_core::{
    AnnualIndicators, ForecastError, MonthlyAggregate, RawObservation, Result, YearMonth,
};
use std::ffi::CStr;

/// Convert a C string pointer to a Rust `&str` with a default value.
///
/// # Safety
/// The pointer must be null or point to a valid null-terminated string.
#[inline]
pub unsafe fn c_str_to_str(ptr: *const c_char, default: &str) -> &str {
    if ptr.is_null() {
        default
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or(default)
    }
}

/// Convert a `c_double` to `Option<f64>`, where NaN becomes None.
#[inline]
pub fn nan_to_option(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

pub fn micros_to_datetime(micros: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| ForecastError::InvalidInput(format!("timestamp {} out of range", micros)))
}

pub fn datetime_to_micros(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_micros()
}

pub fn observation_from_c(obs: &RawObservationC) -> Result<RawObservation> {
    Ok(RawObservation {
        timestamp: micros_to_datetime(obs.timestamp_micros)?,
        demand: obs.demand,
        temperature: obs.temperature,
        dew_point: obs.dew_point,
        relative_humidity: obs.relative_humidity,
        wind_direction: obs.wind_direction,
        wind_speed: obs.wind_speed,
        pressure: obs.pressure,
        moving_avg_3: obs.moving_avg_3,
    })
}

pub fn observation_to_c(obs: &RawObservation) -> RawObservationC {
    RawObservationC {
        timestamp_micros: datetime_to_micros(&obs.timestamp),
        demand: obs.demand,
        temperature: obs.temperature,
        dew_point: obs.dew_point,
        relative_humidity: obs.relative_humidity,
        wind_direction: obs.wind_direction,
        wind_speed: obs.wind_speed,
        pressure: obs.pressure,
        moving_avg_3: obs.moving_avg_3,
    }
}

pub fn aggregate_from_c(agg: &MonthlyAggregateC) -> Result<MonthlyAggregate> {
    let month = u32::try_from(agg.month).map_err(|_| ForecastError::InvalidParameter {
        param: "month".to_string(),
        value: agg.month.to_string(),
        reason: "must be between 1 and 12".to_string(),
    })?;
    let ym = YearMonth::new(agg.year, month)?;
    Ok(MonthlyAggregate {
        year: ym.year,
        month: ym.month,
        total_demand: agg.total_demand,
        temperature: agg.temperature,
        dew_point: agg.dew_point,
        relative_humidity: agg.relative_humidity,
        wind_direction: agg.wind_direction,
        wind_speed: agg.wind_speed,
        pressure: agg.pressure,
        total_rainfall: agg.total_rainfall,
        indicators: AnnualIndicators {
            companies_newly_registered: nan_to_option(agg.companies_newly_registered),
            land_net_area_sown: nan_to_option(agg.land_net_area_sown),
            labour_force_participation: nan_to_option(agg.labour_force_participation),
            total_vehicles_plying: nan_to_option(agg.total_vehicles_plying),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_c_str_to_str() {
        use std::ffi::CString;

        let c_string = CString::new("model_artifacts").unwrap();
        unsafe {
            assert_eq!(c_str_to_str(c_string.as_ptr(), ""), "model_artifacts");
            assert_eq!(c_str_to_str(std::ptr::null(), "default"), "default");
        }
    }

    #[test]
    fn test_micros_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 10)
            .and_then(|d| d.and_hms_opt(14, 35, 0))
            .unwrap();
        let micros = datetime_to_micros(&dt);
        assert_eq!(micros, 1_710_081_300_000_000);
        assert_eq!(micros_to_datetime(micros).unwrap(), dt);
        assert!(micros_to_datetime(i64::MAX).is_err());
    }

    #[test]
    fn test_aggregate_nan_indicators() {
        let agg = MonthlyAggregateC {
            year: 2024,
            month: 2,
            total_demand: 1.0,
            temperature: 20.0,
            dew_point: 10.0,
            relative_humidity: 50.0,
            wind_direction: 0.0,
            wind_speed: 1.0,
            pressure: 1000.0,
            total_rainfall: 0.0,
            companies_newly_registered: f64::NAN,
            land_net_area_sown: 12.5,
            labour_force_participation: f64::NAN,
            total_vehicles_plying: f64::NAN,
        };
        let core = aggregate_from_c(&agg).unwrap();
        assert_eq!(core.indicators.companies_newly_registered, None);
        assert_eq!(core.indicators.land_net_area_sown, Some(12.5));

        assert!(aggregate_from_c(&MonthlyAggregateC { month: 13, ..agg }).is_err());
        assert!(aggregate_from_c(&MonthlyAggregateC { month: -1, ..agg }).is_err());
    }
}
