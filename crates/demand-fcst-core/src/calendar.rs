//! Calendar and enrichment lookup tables.
//!
//! Holidays are keyed by calendar date, rainfall statistics by (year, month).
//! Both tables are built once and only read afterwards.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::debug;

/// Climatological season used by the demand models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Summer,
    Monsoon,
    PostMonsoon,
}

impl Season {
    /// All seasons in one-hot column order.
    pub const ALL: [Season; 4] = [
        Season::Winter,
        Season::Summer,
        Season::Monsoon,
        Season::PostMonsoon,
    ];

    /// Season of a calendar month (1-12).
    ///
    /// # Panics
    /// Panics on a month outside 1-12; months always come from a valid date.
    pub fn for_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Summer,
            6..=9 => Season::Monsoon,
            10 | 11 => Season::PostMonsoon,
            _ => unreachable!("month {month} outside 1-12"),
        }
    }

    /// Position in [`Season::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Season::Winter => 0,
            Season::Summer => 1,
            Season::Monsoon => 2,
            Season::PostMonsoon => 3,
        }
    }
}

/// Set of public holidays for a fixed region and year range.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    dates: HashSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn from_dates<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Fixed-date national holidays of India: Republic Day, Independence Day
    /// and Gandhi Jayanti.
    pub fn india_national(years: RangeInclusive<i32>) -> Self {
        const FIXED: [(u32, u32); 3] = [(1, 26), (8, 15), (10, 2)];
        let dates = years.flat_map(|year| {
            FIXED
                .iter()
                .filter_map(move |&(m, d)| NaiveDate::from_ymd_opt(year, m, d))
        });
        Self::from_dates(dates)
    }

    /// Read a holiday list with a `date` column of ISO dates.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ForecastError::artifact_load(path, e))?;
        Self::from_reader(file).map_err(|e| ForecastError::artifact_load(path, e))
    }

    /// Read a holiday list from any reader (same layout as [`Self::from_csv`]).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| ForecastError::InvalidInput(e.to_string()))?
            .clone();
        let date_idx = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("date"))
            .ok_or_else(|| ForecastError::InvalidInput("holiday table has no 'date' column".into()))?;

        let mut dates = HashSet::new();
        for record in rdr.records() {
            let record = record.map_err(|e| ForecastError::InvalidInput(e.to_string()))?;
            let raw = record.get(date_idx).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                ForecastError::InvalidInput(format!("invalid holiday date '{}': {}", raw, e))
            })?;
            dates.insert(date);
        }
        debug!(holidays = dates.len(), "loaded holiday calendar");
        Ok(Self { dates })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Monthly rainfall statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RainfallStats {
    pub rainy_days: f64,
    pub total_rainfall: f64,
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Rainfall statistics keyed by (year, month).
#[derive(Debug, Clone, Default)]
pub struct RainfallTable {
    entries: HashMap<(i32, u32), RainfallStats>,
}

impl RainfallTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: i32, month: u32, stats: RainfallStats) {
        self.entries.insert((year, month), stats);
    }

    /// Statistics for a month; zeros when the month is not in the table.
    pub fn lookup(&self, year: i32, month: u32) -> RainfallStats {
        self.entries
            .get(&(year, month))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the wide rainfall layout from a file.
    pub fn from_wide_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ForecastError::artifact_load(path, e))?;
        Self::from_wide_reader(file).map_err(|e| ForecastError::artifact_load(path, e))
    }

    /// Parse the wide layout `Year, Metric, Jan, ..., Dec`.
    ///
    /// `Metric` is either `Rainy Days` or `Total Rainfall`; other metrics and
    /// blank cells are skipped.
    pub fn from_wide_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| ForecastError::InvalidInput(e.to_string()))?
            .clone();
        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    ForecastError::InvalidInput(format!("rainfall table has no '{}' column", name))
                })
        };
        let year_idx = column("Year")?;
        let metric_idx = column("Metric")?;
        let month_idx = MONTH_NAMES
            .iter()
            .map(|m| column(m))
            .collect::<Result<Vec<_>>>()?;

        let mut table = Self::new();
        for record in rdr.records() {
            let record = record.map_err(|e| ForecastError::InvalidInput(e.to_string()))?;
            let year_raw = record.get(year_idx).unwrap_or("").trim();
            let year: i32 = parse_number(year_raw)? as i32;
            let metric = record.get(metric_idx).unwrap_or("").trim();

            for (m, &idx) in month_idx.iter().enumerate() {
                let cell = record.get(idx).unwrap_or("").trim();
                if cell.is_empty() {
                    continue;
                }
                let value = parse_number(cell)?;
                let entry = table.entries.entry((year, m as u32 + 1)).or_default();
                match metric {
                    "Rainy Days" => entry.rainy_days = value,
                    "Total Rainfall" => entry.total_rainfall = value,
                    _ => {}
                }
            }
        }
        debug!(months = table.len(), "loaded rainfall table");
        Ok(table)
    }
}

fn parse_number(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| ForecastError::InvalidInput(format!("invalid number '{}'", raw)))
}

/// Read-only enrichment tables joined into every feature row.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentTables {
    pub holidays: HolidayCalendar,
    pub rainfall: RainfallTable,
}

impl EnrichmentTables {
    pub fn new(holidays: HolidayCalendar, rainfall: RainfallTable) -> Self {
        Self { holidays, rainfall }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_lookup_covers_all_months() {
        let expected = [
            Season::Winter,
            Season::Winter,
            Season::Summer,
            Season::Summer,
            Season::Summer,
            Season::Monsoon,
            Season::Monsoon,
            Season::Monsoon,
            Season::Monsoon,
            Season::PostMonsoon,
            Season::PostMonsoon,
            Season::Winter,
        ];
        for (i, season) in expected.iter().enumerate() {
            assert_eq!(Season::for_month(i as u32 + 1), *season);
        }
    }

    #[test]
    fn test_india_national_holidays() {
        let cal = HolidayCalendar::india_national(2021..=2025);
        assert_eq!(cal.len(), 15);
        assert!(cal.contains(NaiveDate::from_ymd_opt(2024, 1, 26).unwrap()));
        assert!(cal.contains(NaiveDate::from_ymd_opt(2022, 8, 15).unwrap()));
        assert!(!cal.contains(NaiveDate::from_ymd_opt(2026, 10, 2).unwrap()));
    }

    #[test]
    fn test_holidays_from_reader() {
        let data = "date,name\n2024-03-25,Holi\n2024-11-01,Diwali\n\n";
        let cal = HolidayCalendar::from_reader(data.as_bytes()).unwrap();
        assert_eq!(cal.len(), 2);
        assert!(cal.contains(NaiveDate::from_ymd_opt(2024, 3, 25).unwrap()));
    }

    #[test]
    fn test_holidays_missing_column() {
        let data = "day\n2024-03-25\n";
        assert!(HolidayCalendar::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_rainfall_wide_layout() {
        let data = "\
Year,Metric,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec
2023,Rainy Days,1,2,0,1,3,6,12,14,7,2,0,1
2023,Total Rainfall,10.5,20.0,0,4.2,30.1,80.0,250.3,300.0,120.4,15.0,0,2.5
2024,Rainy Days,2,,,,,,,,,,,
";
        let table = RainfallTable::from_wide_reader(data.as_bytes()).unwrap();
        let jul = table.lookup(2023, 7);
        assert_eq!(jul.rainy_days, 12.0);
        assert_eq!(jul.total_rainfall, 250.3);

        // Only one metric present: the other stays zero.
        let jan_2024 = table.lookup(2024, 1);
        assert_eq!(jan_2024.rainy_days, 2.0);
        assert_eq!(jan_2024.total_rainfall, 0.0);

        // Unmatched months default to zero.
        assert_eq!(table.lookup(2024, 2), RainfallStats::default());
        assert_eq!(table.lookup(1999, 1), RainfallStats::default());
    }

    #[test]
    fn test_rainfall_bad_number() {
        let data = "Year,Metric,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec\n2023,Rainy Days,x,,,,,,,,,,,\n";
        assert!(RainfallTable::from_wide_reader(data.as_bytes()).is_err());
    }
}
