//! Process-wide forecasting service behind the C boundary.
//!
//! The service is initialized at most once. Later initialization calls are
//! ignored and report the state of the first one.

use demand_fcst_core::{ArtifactPaths, ForecastError, ForecastService, Result};
use std::sync::OnceLock;
use tracing::{info, warn};

static SERVICE: OnceLock<ForecastService> = OnceLock::new();

/// Start the global service from `paths`; returns whether it is ready.
pub fn init(paths: &ArtifactPaths) -> bool {
    init_in(&SERVICE, paths)
}

/// Global service, once initialized.
pub fn service() -> Result<&'static ForecastService> {
    service_in(&SERVICE)
}

pub fn is_ready() -> bool {
    SERVICE.get().is_some_and(ForecastService::is_ready)
}

fn init_in(cell: &OnceLock<ForecastService>, paths: &ArtifactPaths) -> bool {
    let mut started = false;
    let service = cell.get_or_init(|| {
        started = true;
        info!(scaler = %paths.scaler.display(), "starting forecast service");
        ForecastService::start(paths)
    });
    if !started {
        warn!("forecast service already initialized, ignoring");
    }
    service.is_ready()
}

fn service_in(cell: &OnceLock<ForecastService>) -> Result<&ForecastService> {
    cell.get().ok_or_else(|| {
        ForecastError::ArtifactUnavailable("forecast engine not initialized".to_string())
    })
}
