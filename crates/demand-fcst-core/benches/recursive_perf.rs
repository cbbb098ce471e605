//! Performance benchmark for the feature pipeline and recursive forecasting
//!
//! Run with: cargo bench --bench recursive_perf

use chrono::{Duration as ChronoDuration, NaiveDate};
use demand_fcst_core::{
    engineer, ColumnScaler, DemandForecaster, EnrichmentTables, FeatureColumn, ForecastOptions,
    HolidayCalendar, LinearWindowModel, RainfallTable, RawObservation, REQUIRED_INPUT_ROWS,
    TIMESTEPS,
};
use faer::Mat;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn generate_observations(n: usize) -> Vec<RawObservation> {
    let start = NaiveDate::from_ymd_opt(2024, 4, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    (0..n)
        .map(|i| {
            let daily = 900.0 * (2.0 * std::f64::consts::PI * i as f64 / 288.0).sin();
            let weekly = 300.0 * (2.0 * std::f64::consts::PI * i as f64 / 2016.0).sin();
            let demand = 5000.0 + daily + weekly + (i % 7) as f64 * 3.0; // small noise
            RawObservation {
                timestamp: start + ChronoDuration::minutes(5 * i as i64),
                demand,
                temperature: 30.0 + daily / 300.0,
                dew_point: 20.0,
                relative_humidity: 50.0,
                wind_direction: 90.0,
                wind_speed: 3.0,
                pressure: 1000.0,
                moving_avg_3: demand,
            }
        })
        .collect()
}

fn benchmark_fn<F, R>(name: &str, iterations: usize, mut f: F) -> Duration
where
    F: FnMut() -> R,
{
    // Warmup
    let _ = f();

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = std::hint::black_box(f());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "{}: total={:?}, per_iter={:?}, iters={}",
        name, elapsed, per_iter, iterations
    );
    elapsed
}

fn main() {
    println!("=== Demand Forecast Performance Benchmark ===\n");

    let tables = Arc::new(EnrichmentTables::new(
        HolidayCalendar::india_national(2021..=2025),
        RainfallTable::new(),
    ));
    let schema = FeatureColumn::default_schema();
    let width = schema.len();
    let scaler = Arc::new(ColumnScaler::identity(schema));
    let model = Arc::new(LinearWindowModel::new(
        Mat::from_fn(TIMESTEPS, width, |_, j| if j == 0 { 1.0 / TIMESTEPS as f64 } else { 0.0 }),
        0.0,
    ));
    let forecaster = match DemandForecaster::new(tables.clone(), scaler, model) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("benchmark setup failed: {}", e);
            return;
        }
    };

    println!("--- 1. Feature Pipeline ---\n");

    for &n in &[REQUIRED_INPUT_ROWS, 2 * REQUIRED_INPUT_ROWS, 4 * REQUIRED_INPUT_ROWS] {
        let obs = generate_observations(n);
        benchmark_fn(&format!("engineer(n={})", n), 50, || engineer(&obs, &tables));
    }

    println!();
    println!("--- 2. Recursive Forecast ---\n");

    let obs = generate_observations(REQUIRED_INPUT_ROWS);
    for &steps in &[1usize, 12, 48, 288] {
        let options = ForecastOptions::with_steps(steps);
        let iters = if steps <= 12 { 20 } else { 3 };
        benchmark_fn(&format!("forecast(steps={})", steps), iters, || {
            forecaster.forecast(&obs, &options)
        });
    }

    println!("\n=== Benchmark Complete ===");
}
