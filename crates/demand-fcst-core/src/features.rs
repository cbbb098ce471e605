//! Feature engineering for the 5-minute demand model.
//!
//! The pipeline runs in two phases. [`compute_features`] derives every
//! column for every observation, leaving lags missing where the window has
//! too little history. [`drop_incomplete`] then removes those rows. The
//! combined [`engineer`] additionally enforces that at least [`TIMESTEPS`]
//! rows survive.

use crate::calendar::{EnrichmentTables, RainfallStats, Season};
use crate::error::{ForecastError, Result};
use crate::observation::RawObservation;
use crate::scaling::FeatureSchema;
use chrono::{Datelike, NaiveDateTime, Timelike};
use faer::Mat;
use std::f64::consts::PI;
use std::str::FromStr;

/// Rows in one model input window (one day of 5-minute samples).
pub const TIMESTEPS: usize = 288;
/// Lag offsets in rows.
pub const LAG_1HR: usize = 12;
pub const LAG_24HR: usize = 288;
pub const LAG_WEEKS: usize = 2016;
/// Minimum raw rows for one feature window with complete weekly lags.
pub const REQUIRED_INPUT_ROWS: usize = TIMESTEPS + LAG_WEEKS;

/// Named numeric columns of an engineered feature row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    Demand,
    Temperature,
    DewPoint,
    RelativeHumidity,
    WindDirection,
    WindSpeed,
    Pressure,
    MovingAvg3,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    DayOfWeek,
    IsWeekend,
    IsHoliday,
    MonthlyRainyDays,
    MonthlyTotalRainfall,
    DemandLag1Hr,
    DemandLag24Hr,
    DemandLag1Week,
    HourSin,
    HourCos,
    DayOfWeekSin,
    DayOfWeekCos,
    MonthSin,
    MonthCos,
    SeasonWinter,
    SeasonSummer,
    SeasonMonsoon,
    SeasonPostMonsoon,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 31] = [
        FeatureColumn::Demand,
        FeatureColumn::Temperature,
        FeatureColumn::DewPoint,
        FeatureColumn::RelativeHumidity,
        FeatureColumn::WindDirection,
        FeatureColumn::WindSpeed,
        FeatureColumn::Pressure,
        FeatureColumn::MovingAvg3,
        FeatureColumn::Year,
        FeatureColumn::Month,
        FeatureColumn::Day,
        FeatureColumn::Hour,
        FeatureColumn::Minute,
        FeatureColumn::DayOfWeek,
        FeatureColumn::IsWeekend,
        FeatureColumn::IsHoliday,
        FeatureColumn::MonthlyRainyDays,
        FeatureColumn::MonthlyTotalRainfall,
        FeatureColumn::DemandLag1Hr,
        FeatureColumn::DemandLag24Hr,
        FeatureColumn::DemandLag1Week,
        FeatureColumn::HourSin,
        FeatureColumn::HourCos,
        FeatureColumn::DayOfWeekSin,
        FeatureColumn::DayOfWeekCos,
        FeatureColumn::MonthSin,
        FeatureColumn::MonthCos,
        FeatureColumn::SeasonWinter,
        FeatureColumn::SeasonSummer,
        FeatureColumn::SeasonMonsoon,
        FeatureColumn::SeasonPostMonsoon,
    ];

    /// Column name as used by the fitted scaler.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Demand => "Power demand",
            FeatureColumn::Temperature => "temp",
            FeatureColumn::DewPoint => "dwpt",
            FeatureColumn::RelativeHumidity => "rhum",
            FeatureColumn::WindDirection => "wdir",
            FeatureColumn::WindSpeed => "wspd",
            FeatureColumn::Pressure => "pres",
            FeatureColumn::MovingAvg3 => "moving_avg_3",
            FeatureColumn::Year => "year",
            FeatureColumn::Month => "month",
            FeatureColumn::Day => "day",
            FeatureColumn::Hour => "hour",
            FeatureColumn::Minute => "minute",
            FeatureColumn::DayOfWeek => "day_of_week",
            FeatureColumn::IsWeekend => "is_weekend",
            FeatureColumn::IsHoliday => "is_holiday",
            FeatureColumn::MonthlyRainyDays => "Monthly_Rainy_Days",
            FeatureColumn::MonthlyTotalRainfall => "Monthly_Total_Rainfall",
            FeatureColumn::DemandLag1Hr => "demand_lag_1hr",
            FeatureColumn::DemandLag24Hr => "demand_lag_24hr",
            FeatureColumn::DemandLag1Week => "demand_lag_1week",
            FeatureColumn::HourSin => "hour_sin",
            FeatureColumn::HourCos => "hour_cos",
            FeatureColumn::DayOfWeekSin => "day_of_week_sin",
            FeatureColumn::DayOfWeekCos => "day_of_week_cos",
            FeatureColumn::MonthSin => "month_sin",
            FeatureColumn::MonthCos => "month_cos",
            FeatureColumn::SeasonWinter => "season_Winter",
            FeatureColumn::SeasonSummer => "season_Summer",
            FeatureColumn::SeasonMonsoon => "season_Monsoon",
            FeatureColumn::SeasonPostMonsoon => "season_Post-Monsoon",
        }
    }

    /// Canonical schema listing every column, demand first.
    pub fn default_schema() -> FeatureSchema {
        FeatureSchema::new(
            1,
            FeatureColumn::ALL.iter().map(|c| c.name().to_string()).collect(),
        )
    }
}

impl FromStr for FeatureColumn {
    type Err = ForecastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FeatureColumn::ALL
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or_else(|| ForecastError::SchemaMismatch {
                field: s.to_string(),
            })
    }
}

/// Calendar fields derived from a timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// Monday = 0 ... Sunday = 6.
    pub day_of_week: u32,
}

impl CalendarFields {
    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
            day: ts.day(),
            hour: ts.hour(),
            minute: ts.minute(),
            day_of_week: ts.weekday().num_days_from_monday(),
        }
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week >= 5
    }
}

/// Sine/cosine encodings of hour, day of week and month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclicalFeatures {
    pub hour: (f64, f64),
    pub day_of_week: (f64, f64),
    pub month: (f64, f64),
}

impl CyclicalFeatures {
    pub fn from_calendar(cal: &CalendarFields) -> Self {
        Self {
            hour: encode(cal.hour as f64, 24.0),
            day_of_week: encode(cal.day_of_week as f64, 7.0),
            month: encode(cal.month as f64, 12.0),
        }
    }
}

fn encode(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Demand lagged by one hour, one day and one week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandLags<T> {
    pub one_hour: T,
    pub one_day: T,
    pub one_week: T,
}

/// Engineered features for one observation.
///
/// `L` is `Option<f64>` for draft rows whose lags may be missing and `f64`
/// once the row has passed [`drop_incomplete`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow<L = f64> {
    pub observation: RawObservation,
    pub calendar: CalendarFields,
    pub is_holiday: bool,
    pub rainfall: RainfallStats,
    pub season: Season,
    pub lags: DemandLags<L>,
    pub cyclical: CyclicalFeatures,
}

/// Feature row before incomplete rows are filtered.
pub type DraftFeatureRow = FeatureRow<Option<f64>>;

impl<L> FeatureRow<L> {
    pub fn is_weekend(&self) -> bool {
        self.calendar.is_weekend()
    }

    /// One-hot season indicators in [`Season::ALL`] order.
    pub fn season_one_hot(&self) -> [f64; 4] {
        let mut one_hot = [0.0; 4];
        one_hot[self.season.index()] = 1.0;
        one_hot
    }
}

impl DraftFeatureRow {
    /// Promote to a complete row when every lag is present and every raw
    /// value is finite.
    pub fn complete(&self) -> Option<FeatureRow> {
        let lags = DemandLags {
            one_hour: self.lags.one_hour?,
            one_day: self.lags.one_day?,
            one_week: self.lags.one_week?,
        };
        let obs = &self.observation;
        let finite = [obs.demand, obs.moving_avg_3, lags.one_hour, lags.one_day, lags.one_week]
            .iter()
            .chain(obs.weather().iter())
            .all(|v| v.is_finite());
        if !finite {
            return None;
        }
        Some(FeatureRow {
            observation: self.observation,
            calendar: self.calendar,
            is_holiday: self.is_holiday,
            rainfall: self.rainfall,
            season: self.season,
            lags,
            cyclical: self.cyclical,
        })
    }
}

impl FeatureRow {
    /// Numeric value of a named column.
    pub fn value(&self, column: FeatureColumn) -> f64 {
        let obs = &self.observation;
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match column {
            FeatureColumn::Demand => obs.demand,
            FeatureColumn::Temperature => obs.temperature,
            FeatureColumn::DewPoint => obs.dew_point,
            FeatureColumn::RelativeHumidity => obs.relative_humidity,
            FeatureColumn::WindDirection => obs.wind_direction,
            FeatureColumn::WindSpeed => obs.wind_speed,
            FeatureColumn::Pressure => obs.pressure,
            FeatureColumn::MovingAvg3 => obs.moving_avg_3,
            FeatureColumn::Year => self.calendar.year as f64,
            FeatureColumn::Month => self.calendar.month as f64,
            FeatureColumn::Day => self.calendar.day as f64,
            FeatureColumn::Hour => self.calendar.hour as f64,
            FeatureColumn::Minute => self.calendar.minute as f64,
            FeatureColumn::DayOfWeek => self.calendar.day_of_week as f64,
            FeatureColumn::IsWeekend => flag(self.is_weekend()),
            FeatureColumn::IsHoliday => flag(self.is_holiday),
            FeatureColumn::MonthlyRainyDays => self.rainfall.rainy_days,
            FeatureColumn::MonthlyTotalRainfall => self.rainfall.total_rainfall,
            FeatureColumn::DemandLag1Hr => self.lags.one_hour,
            FeatureColumn::DemandLag24Hr => self.lags.one_day,
            FeatureColumn::DemandLag1Week => self.lags.one_week,
            FeatureColumn::HourSin => self.cyclical.hour.0,
            FeatureColumn::HourCos => self.cyclical.hour.1,
            FeatureColumn::DayOfWeekSin => self.cyclical.day_of_week.0,
            FeatureColumn::DayOfWeekCos => self.cyclical.day_of_week.1,
            FeatureColumn::MonthSin => self.cyclical.month.0,
            FeatureColumn::MonthCos => self.cyclical.month.1,
            FeatureColumn::SeasonWinter => self.season_one_hot()[Season::Winter.index()],
            FeatureColumn::SeasonSummer => self.season_one_hot()[Season::Summer.index()],
            FeatureColumn::SeasonMonsoon => self.season_one_hot()[Season::Monsoon.index()],
            FeatureColumn::SeasonPostMonsoon => self.season_one_hot()[Season::PostMonsoon.index()],
        }
    }
}

/// Value `offset` rows before `index`, if the window reaches that far back.
fn shifted(series: &[f64], index: usize, offset: usize) -> Option<f64> {
    index.checked_sub(offset).map(|j| series[j])
}

/// Phase one: derive all columns, leaving lags missing where history is short.
pub fn compute_features(
    observations: &[RawObservation],
    tables: &EnrichmentTables,
) -> Vec<DraftFeatureRow> {
    let demand: Vec<f64> = observations.iter().map(|o| o.demand).collect();

    observations
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let calendar = CalendarFields::from_timestamp(&obs.timestamp);
            FeatureRow {
                observation: *obs,
                calendar,
                is_holiday: tables.holidays.contains(obs.timestamp.date()),
                rainfall: tables.rainfall.lookup(calendar.year, calendar.month),
                season: Season::for_month(calendar.month),
                lags: DemandLags {
                    one_hour: shifted(&demand, i, LAG_1HR),
                    one_day: shifted(&demand, i, LAG_24HR),
                    one_week: shifted(&demand, i, LAG_WEEKS),
                },
                cyclical: CyclicalFeatures::from_calendar(&calendar),
            }
        })
        .collect()
}

/// Phase two: keep only complete rows, preserving order.
pub fn drop_incomplete(drafts: Vec<DraftFeatureRow>) -> Vec<FeatureRow> {
    drafts.iter().filter_map(DraftFeatureRow::complete).collect()
}

/// Run the full pipeline and require at least [`TIMESTEPS`] complete rows.
pub fn engineer(
    observations: &[RawObservation],
    tables: &EnrichmentTables,
) -> Result<Vec<FeatureRow>> {
    let rows = drop_incomplete(compute_features(observations, tables));
    if rows.len() < TIMESTEPS {
        return Err(ForecastError::InsufficientCleanRows {
            needed: TIMESTEPS,
            got: rows.len(),
        });
    }
    Ok(rows)
}

/// Resolve every schema name to a known feature column.
pub fn resolve_columns(schema: &FeatureSchema) -> Result<Vec<FeatureColumn>> {
    schema.names.iter().map(|name| name.parse()).collect()
}

/// Trailing [`TIMESTEPS`] rows as a dense matrix in schema column order.
pub fn feature_window(rows: &[FeatureRow], schema: &FeatureSchema) -> Result<Mat<f64>> {
    if rows.len() < TIMESTEPS {
        return Err(ForecastError::InsufficientCleanRows {
            needed: TIMESTEPS,
            got: rows.len(),
        });
    }
    let columns = resolve_columns(schema)?;
    let tail = &rows[rows.len() - TIMESTEPS..];
    Ok(Mat::from_fn(TIMESTEPS, columns.len(), |i, j| {
        tail[i].value(columns[j])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{HolidayCalendar, RainfallTable};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 20)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    fn window(n: usize, from: NaiveDateTime) -> Vec<RawObservation> {
        (0..n)
            .map(|i| {
                let demand = 3000.0 + 500.0 * (i as f64 * 0.05).sin();
                RawObservation {
                    timestamp: from + Duration::minutes(5 * i as i64),
                    demand,
                    temperature: 15.0,
                    dew_point: 5.0,
                    relative_humidity: 60.0,
                    wind_direction: 300.0,
                    wind_speed: 6.0,
                    pressure: 1015.0,
                    moving_avg_3: demand,
                }
            })
            .collect()
    }

    fn tables() -> EnrichmentTables {
        let mut rainfall = RainfallTable::new();
        rainfall.insert(
            2024,
            1,
            RainfallStats {
                rainy_days: 3.0,
                total_rainfall: 18.5,
            },
        );
        EnrichmentTables::new(HolidayCalendar::india_national(2024..=2024), rainfall)
    }

    #[test]
    fn test_lags_follow_offsets() {
        let obs = window(REQUIRED_INPUT_ROWS, start());
        let drafts = compute_features(&obs, &tables());

        assert_eq!(drafts[11].lags.one_hour, None);
        assert_eq!(drafts[12].lags.one_hour, Some(obs[0].demand));
        assert_eq!(drafts[287].lags.one_day, None);
        assert_eq!(drafts[300].lags.one_day, Some(obs[12].demand));
        assert_eq!(drafts[2015].lags.one_week, None);
        assert_eq!(drafts[2016].lags.one_week, Some(obs[0].demand));
    }

    #[test]
    fn test_engineer_drops_rows_without_weekly_lag() {
        let obs = window(REQUIRED_INPUT_ROWS, start());
        let rows = engineer(&obs, &tables()).unwrap();
        assert_eq!(rows.len(), TIMESTEPS);
        assert_eq!(rows[0].observation.timestamp, obs[LAG_WEEKS].timestamp);
        assert_eq!(rows[0].lags.one_week, obs[0].demand);
    }

    #[test]
    fn test_short_window_has_no_complete_rows() {
        let obs = window(LAG_WEEKS - 1, start());
        let drafts = compute_features(&obs, &tables());
        assert!(drafts.iter().all(|d| d.lags.one_week.is_none()));
        assert!(drop_incomplete(drafts).is_empty());

        let err = engineer(&obs, &tables()).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientCleanRows { needed: TIMESTEPS, got: 0 }
        ));
    }

    #[test]
    fn test_engineer_fails_below_timesteps() {
        let obs = window(REQUIRED_INPUT_ROWS - 1, start());
        let err = engineer(&obs, &tables()).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientCleanRows { needed: 288, got: 287 }
        ));
    }

    #[test]
    fn test_non_finite_rows_are_dropped() {
        let mut obs = window(REQUIRED_INPUT_ROWS + 1, start());
        let last = obs.len() - 1;
        obs[last].temperature = f64::NAN;
        let rows = drop_incomplete(compute_features(&obs, &tables()));
        assert_eq!(rows.len(), TIMESTEPS);
    }

    #[test]
    fn test_season_one_hot_sums_to_one_for_every_month() {
        let tables = tables();
        for month in 1..=12 {
            let from = NaiveDate::from_ymd_opt(2023, month, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap();
            let drafts = compute_features(&window(3, from), &tables);
            for draft in &drafts {
                let one_hot = draft.season_one_hot();
                assert_eq!(one_hot.iter().sum::<f64>(), 1.0);
                assert_eq!(draft.season, Season::for_month(month));
            }
        }
    }

    #[test]
    fn test_season_columns_follow_one_hot() {
        let from = NaiveDate::from_ymd_opt(2023, 5, 24)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let rows = engineer(&window(REQUIRED_INPUT_ROWS, from), &tables()).unwrap();
        let columns = [
            FeatureColumn::SeasonWinter,
            FeatureColumn::SeasonSummer,
            FeatureColumn::SeasonMonsoon,
            FeatureColumn::SeasonPostMonsoon,
        ];
        for row in &rows {
            let values: Vec<f64> = columns.iter().map(|&c| row.value(c)).collect();
            assert_eq!(values, row.season_one_hot().to_vec());
        }
        // The window crosses from May into June.
        assert_eq!(rows.first().unwrap().season, Season::Summer);
        assert_eq!(rows.last().unwrap().season, Season::Monsoon);
    }

    #[test]
    fn test_all_season_columns_present_in_single_season_window() {
        let rows = engineer(&window(REQUIRED_INPUT_ROWS, start()), &tables()).unwrap();
        let schema = FeatureColumn::default_schema();
        let mat = feature_window(&rows, &schema).unwrap();
        let summer = schema.position("season_Summer").unwrap();
        let winter = schema.position("season_Winter").unwrap();
        for i in 0..mat.nrows() {
            assert_eq!(mat[(i, summer)], 0.0);
            assert_eq!(mat[(i, winter)], 1.0);
        }
    }

    #[test]
    fn test_cyclical_encodings_on_unit_circle() {
        let rows = engineer(&window(REQUIRED_INPUT_ROWS, start()), &tables()).unwrap();
        for row in &rows {
            for (s, c) in [row.cyclical.hour, row.cyclical.day_of_week, row.cyclical.month] {
                assert_relative_eq!(s * s + c * c, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_calendar_and_enrichment() {
        // 2024-01-26 is Republic Day and a Friday.
        let from = NaiveDate::from_ymd_opt(2024, 1, 26)
            .and_then(|d| d.and_hms_opt(13, 35, 0))
            .unwrap();
        let drafts = compute_features(&window(1, from), &tables());
        let row = &drafts[0];
        assert_eq!(row.calendar.hour, 13);
        assert_eq!(row.calendar.minute, 35);
        assert_eq!(row.calendar.day_of_week, 4);
        assert!(!row.is_weekend());
        assert!(row.is_holiday);
        assert_eq!(row.rainfall.total_rainfall, 18.5);
        assert_eq!(row.season, Season::Winter);

        // 2024-01-27 is a Saturday, no rainfall entry for February.
        let sat = NaiveDate::from_ymd_opt(2024, 1, 27)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert!(compute_features(&window(1, sat), &tables())[0].is_weekend());
        let feb = NaiveDate::from_ymd_opt(2024, 2, 3)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(
            compute_features(&window(1, feb), &tables())[0].rainfall,
            RainfallStats::default()
        );
    }

    #[test]
    fn test_feature_window_follows_schema_order() {
        let rows = engineer(&window(REQUIRED_INPUT_ROWS, start()), &tables()).unwrap();
        let schema = FeatureSchema::new(
            2,
            vec!["hour".into(), "Power demand".into(), "demand_lag_1hr".into()],
        );
        let mat = feature_window(&rows, &schema).unwrap();
        assert_eq!(mat.nrows(), TIMESTEPS);
        assert_eq!(mat.ncols(), 3);
        let last = rows.last().unwrap();
        assert_eq!(mat[(TIMESTEPS - 1, 0)], last.calendar.hour as f64);
        assert_eq!(mat[(TIMESTEPS - 1, 1)], last.observation.demand);
        assert_eq!(mat[(TIMESTEPS - 1, 2)], last.lags.one_hour);
    }

    #[test]
    fn test_feature_window_unknown_column() {
        let rows = engineer(&window(REQUIRED_INPUT_ROWS, start()), &tables()).unwrap();
        let schema = FeatureSchema::new(1, vec!["Power demand".into(), "cloud_cover".into()]);
        let err = feature_window(&rows, &schema).unwrap_err();
        match err {
            ForecastError::SchemaMismatch { field } => assert_eq!(field, "cloud_cover"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_names_round_trip() {
        for column in FeatureColumn::ALL {
            assert_eq!(column.name().parse::<FeatureColumn>().unwrap(), column);
        }
    }
}
