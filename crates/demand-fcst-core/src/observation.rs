//! Raw observations, the sliding observation window and monthly aggregates.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spacing between consecutive 5-minute observations.
pub const STEP_MINUTES: i64 = 5;

/// One timestamped weather + demand reading at 5-minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(rename = "datetime", with = "datetime_format")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Power_demand")]
    pub demand: f64,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "dwpt")]
    pub dew_point: f64,
    #[serde(rename = "rhum")]
    pub relative_humidity: f64,
    #[serde(rename = "wdir")]
    pub wind_direction: f64,
    #[serde(rename = "wspd")]
    pub wind_speed: f64,
    #[serde(rename = "pres")]
    pub pressure: f64,
    pub moving_avg_3: f64,
}

/// `datetime` as `YYYY-MM-DD HH:MM:SS`; the ISO `T` separator and
/// fractional seconds are accepted on input.
mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const ACCEPTED: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let text = raw.trim();
        ACCEPTED
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .ok_or_else(|| de::Error::custom(format!("unrecognised datetime '{text}'")))
    }
}

impl RawObservation {
    /// Weather fields in a fixed order (temp, dwpt, rhum, wdir, wspd, pres).
    pub fn weather(&self) -> [f64; 6] {
        [
            self.temperature,
            self.dew_point,
            self.relative_humidity,
            self.wind_direction,
            self.wind_speed,
            self.pressure,
        ]
    }
}

/// Chronologically ordered window of raw observations, most recent last.
///
/// The window is an immutable value: [`RawWindow::advance`] consumes it and
/// returns the successor window with the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWindow {
    observations: Vec<RawObservation>,
}

impl RawWindow {
    /// Build a window, checking the strict 5-minute spacing.
    pub fn new(observations: Vec<RawObservation>) -> Result<Self> {
        let step = Duration::minutes(STEP_MINUTES);
        for (i, pair) in observations.windows(2).enumerate() {
            if pair[1].timestamp - pair[0].timestamp != step {
                return Err(ForecastError::InvalidInput(format!(
                    "observation {} at {} does not follow {} by {} minutes",
                    i + 1,
                    pair[1].timestamp,
                    pair[0].timestamp,
                    STEP_MINUTES
                )));
            }
        }
        Ok(Self { observations })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn as_slice(&self) -> &[RawObservation] {
        &self.observations
    }

    pub fn last(&self) -> Option<&RawObservation> {
        self.observations.last()
    }

    /// Keep only the trailing `n` observations.
    pub fn tail(mut self, n: usize) -> Self {
        if self.observations.len() > n {
            let excess = self.observations.len() - n;
            self.observations.drain(..excess);
        }
        self
    }

    /// Append `next` and evict the oldest observation.
    pub fn advance(mut self, next: RawObservation) -> Result<Self> {
        if let Some(last) = self.observations.last() {
            if next.timestamp - last.timestamp != Duration::minutes(STEP_MINUTES) {
                return Err(ForecastError::InvalidInput(format!(
                    "appended observation at {} does not follow {}",
                    next.timestamp, last.timestamp
                )));
            }
            self.observations.remove(0);
        }
        self.observations.push(next);
        Ok(self)
    }
}

/// Calendar month identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::InvalidParameter {
                param: "month".to_string(),
                value: month.to_string(),
                reason: "must be between 1 and 12".to_string(),
            });
        }
        Ok(Self { year, month })
    }

    pub fn of(dt: &NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// The following month, rolling December into January of the next year.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Months since year 0, used for contiguity checks.
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + self.month as i64 - 1
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Aggregated demand, weather and annual indicators for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Total_Demand_kW")]
    pub total_demand: f64,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "dwpt")]
    pub dew_point: f64,
    #[serde(rename = "rhum")]
    pub relative_humidity: f64,
    #[serde(rename = "wdir")]
    pub wind_direction: f64,
    #[serde(rename = "wspd")]
    pub wind_speed: f64,
    #[serde(rename = "pres")]
    pub pressure: f64,
    #[serde(rename = "Total_Rainfall_mm")]
    pub total_rainfall: f64,
    #[serde(flatten)]
    pub indicators: AnnualIndicators,
}

impl MonthlyAggregate {
    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }
}

/// Annual indicators published once a year and carried forward month to month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualIndicators {
    #[serde(rename = "Companies_Newly_Registered", default)]
    pub companies_newly_registered: Option<f64>,
    #[serde(rename = "Land_Net_Area_Sown", default)]
    pub land_net_area_sown: Option<f64>,
    #[serde(rename = "Labour_Force_Participation_All", default)]
    pub labour_force_participation: Option<f64>,
    #[serde(rename = "Total_Vehicles_Plying", default)]
    pub total_vehicles_plying: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(minute_offset: i64, demand: f64) -> RawObservation {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        RawObservation {
            timestamp: start + Duration::minutes(minute_offset),
            demand,
            temperature: 30.0,
            dew_point: 12.0,
            relative_humidity: 40.0,
            wind_direction: 270.0,
            wind_speed: 8.0,
            pressure: 1005.0,
            moving_avg_3: demand,
        }
    }

    #[test]
    fn test_datetime_accepts_space_and_iso_forms() {
        let row = |ts: &str| {
            format!(
                r#"{{"datetime":"{ts}","Power_demand":4200.5,"temp":31.0,"dwpt":20.0,
                "rhum":55.0,"wdir":180.0,"wspd":7.5,"pres":1004.0,"moving_avg_3":4150.0}}"#
            )
        };
        let spaced: RawObservation = serde_json::from_str(&row("2024-05-01 00:10:00")).unwrap();
        let iso: RawObservation = serde_json::from_str(&row("2024-05-01T00:10:00")).unwrap();
        assert_eq!(spaced.timestamp, obs(10, 0.0).timestamp);
        assert_eq!(spaced, iso);
        assert_eq!(spaced.demand, 4200.5);

        assert!(serde_json::from_str::<RawObservation>(&row("01/05/2024 00:10")).is_err());
    }

    #[test]
    fn test_datetime_serializes_with_space() {
        let json = serde_json::to_value(obs(65, 1.0)).unwrap();
        assert_eq!(json["datetime"], "2024-05-01 01:05:00");
    }

    #[test]
    fn test_window_rejects_gap() {
        let err = RawWindow::new(vec![obs(0, 1.0), obs(5, 2.0), obs(15, 3.0)]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn test_window_rejects_unordered() {
        assert!(RawWindow::new(vec![obs(5, 1.0), obs(0, 2.0)]).is_err());
    }

    #[test]
    fn test_advance_keeps_length() {
        let window = RawWindow::new(vec![obs(0, 1.0), obs(5, 2.0), obs(10, 3.0)]).unwrap();
        let next = window.advance(obs(15, 4.0)).unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(next.as_slice()[0].demand, 2.0);
        assert_eq!(next.last().unwrap().demand, 4.0);
    }

    #[test]
    fn test_advance_rejects_wrong_timestamp() {
        let window = RawWindow::new(vec![obs(0, 1.0), obs(5, 2.0)]).unwrap();
        assert!(window.advance(obs(20, 3.0)).is_err());
    }

    #[test]
    fn test_tail() {
        let window =
            RawWindow::new(vec![obs(0, 1.0), obs(5, 2.0), obs(10, 3.0), obs(15, 4.0)]).unwrap();
        let tail = window.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.as_slice()[0].demand, 3.0);
    }

    #[test]
    fn test_year_month_wraparound() {
        let dec = YearMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), YearMonth::new(2025, 1).unwrap());
        assert_eq!(dec.next().to_string(), "2025-01");
        assert_eq!(YearMonth::new(2024, 10).unwrap().next().to_string(), "2024-11");
        assert!(YearMonth::new(2024, 13).is_err());
    }

    #[test]
    fn test_monthly_aggregate_from_json() {
        let json = r#"{
            "Year": 2024, "Month": 3, "Total_Demand_kW": 1500000.0,
            "temp": 24.1, "dwpt": 9.0, "rhum": 45.0, "wdir": 290.0,
            "wspd": 7.5, "pres": 1012.0, "Total_Rainfall_mm": 12.3,
            "Companies_Newly_Registered": 1200.0
        }"#;
        let agg: MonthlyAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(agg.year_month().to_string(), "2024-03");
        assert_eq!(agg.indicators.companies_newly_registered, Some(1200.0));
        assert_eq!(agg.indicators.total_vehicles_plying, None);
    }
}
