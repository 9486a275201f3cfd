//! # Load Forecast
//!
//! A Rust library for next-day (24h-ahead) electrical load forecasting from an
//! hourly load time series.
//!
//! ## Features
//!
//! - Validated, gap-free hourly time series handling ([`LoadSeries`])
//! - Leak-free feature extraction: lags, trailing rolling statistics and
//!   calendar fields, with a statically declared schema ([`extract_features`])
//! - Deterministic gradient-boosted regression trees with persist/restore
//!   ([`GradientBoosting`])
//! - Walk-forward backtesting without look-ahead bias ([`Backtest`])
//! - Percentage-error accuracy metrics shared by offline evaluation and
//!   backtesting ([`metrics`])
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use load_forecast::{extract_features, ForecastModel, GradientBoosting, LoadSeries,
//!     TrainedForecastModel};
//!
//! # fn main() -> load_forecast::Result<()> {
//! // Ten days of synthetic hourly load with a daily cycle
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let values: Vec<f64> = (0..240)
//!     .map(|h| 6000.0 + 800.0 * (h as f64 / 24.0 * std::f64::consts::TAU).sin())
//!     .collect();
//! let series = LoadSeries::from_values(start, values)?;
//!
//! // Build the supervised-learning table
//! let table = extract_features(&series)?;
//!
//! // Train a model and predict 24h-ahead load for every row
//! let model = GradientBoosting::new(10, 0.3)?;
//! let trained = model.train(&table)?;
//! let forecasts = trained.predict(&table)?;
//! assert_eq!(forecasts.len(), table.len());
//! # Ok(())
//! # }
//! ```

pub mod backtest;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod series;

// Re-export commonly used types
pub use crate::backtest::{Backtest, BacktestConfig, BacktestPoint, BacktestResult};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{extract_features, FeatureRow, FeatureSchema, FeatureTable};
pub use crate::metrics::{evaluate_forecast, ForecastMetrics};
pub use crate::models::gradient_boosting::{GradientBoosting, TrainedGradientBoosting};
pub use crate::models::{ForecastModel, TrainedForecastModel};
pub use crate::series::{LoadReading, LoadSeries};

use chrono::{DateTime, Duration, Utc};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Single-shot forecast: the load expected 24 hours after the latest reading
///
/// Extracts features from `series`, trains `model` on every labeled row and
/// predicts at the latest admissible timestamp. Returns the target timestamp
/// and the predicted load.
pub fn forecast_next_day<M: ForecastModel>(
    series: &LoadSeries,
    model: &M,
) -> Result<(DateTime<Utc>, f64)> {
    let table = extract_features(series)?;
    let trained = model.train(&table)?;

    let latest = table.rows().last().ok_or_else(|| {
        ForecastError::InsufficientHistory("Feature table contains no rows".to_string())
    })?;

    let serving = FeatureTable::new(table.schema().clone(), vec![latest.clone()])?;
    let predicted = trained.predict(&serving)?.first().copied().ok_or_else(|| {
        ForecastError::ValidationError("Model returned no prediction".to_string())
    })?;

    Ok((latest.timestamp + Duration::hours(24), predicted))
}
