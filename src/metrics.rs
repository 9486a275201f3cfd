//! Accuracy metrics for load forecasts
//!
//! Used uniformly by offline evaluation and the backtest engine. Degenerate
//! inputs (empty sequences, length mismatches, zero denominators, non-finite
//! values) are hard errors, never silent NaN or zero.

use crate::backtest::BacktestPoint;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};

/// Mean Absolute Percentage Error, in percent
///
/// `mean(|predicted - actual| / |actual|) * 100`. A zero in `actual` is a
/// [`ForecastError::MetricError`]; no epsilon fallback is applied.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate_pairs(actual, predicted)?;

    let mut total = 0.0;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        if *a == 0.0 {
            return Err(ForecastError::MetricError(
                "MAPE is undefined for a zero actual value".to_string(),
            ));
        }
        total += (p - a).abs() / a.abs();
    }

    Ok(total / actual.len() as f64 * 100.0)
}

/// Symmetric Mean Absolute Percentage Error, in percent
///
/// `mean(2 * |predicted - actual| / (|actual| + |predicted|)) * 100`. A pair
/// where both values are zero has no defined denominator and is an error.
pub fn symmetric_mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate_pairs(actual, predicted)?;

    let mut total = 0.0;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        let denominator = a.abs() + p.abs();
        if denominator == 0.0 {
            return Err(ForecastError::MetricError(
                "SMAPE is undefined when actual and predicted are both zero".to_string(),
            ));
        }
        total += 2.0 * (p - a).abs() / denominator;
    }

    Ok(total / actual.len() as f64 * 100.0)
}

/// Aggregate forecast accuracy over paired (actual, predicted) sequences
pub fn evaluate_forecast(actual: &[f64], predicted: &[f64]) -> Result<ForecastMetrics> {
    validate_pairs(actual, predicted)?;

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| p - a)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();
    let mape = mean_absolute_percentage_error(actual, predicted)?;
    let smape = symmetric_mean_absolute_percentage_error(actual, predicted)?;

    Ok(ForecastMetrics {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// MAPE over trailing windows of a backtest, anchored at the latest cutoff
///
/// For each window duration, the metric covers every point whose cutoff is at
/// or after `latest - window`. Returns one `(window start, mape)` entry per
/// window, in ascending window order.
pub fn trailing_mape(
    points: &[BacktestPoint],
    windows: &[Duration],
) -> Result<Vec<(DateTime<Utc>, f64)>> {
    if points.is_empty() {
        return Err(ForecastError::MetricError(
            "Cannot compute trailing MAPE over zero backtest points".to_string(),
        ));
    }

    let latest = points
        .iter()
        .map(|p| p.cutoff)
        .max()
        .ok_or_else(|| ForecastError::MetricError("No cutoffs in backtest points".to_string()))?;

    let mut sorted_windows = windows.to_vec();
    sorted_windows.sort();

    let mut results = Vec::with_capacity(sorted_windows.len());
    for window in sorted_windows {
        if window < Duration::zero() {
            return Err(ForecastError::InvalidParameter(
                "Trailing MAPE window must not be negative".to_string(),
            ));
        }

        let start = latest - window;
        let mut actual = Vec::new();
        let mut predicted = Vec::new();
        for point in points.iter().filter(|p| p.cutoff >= start) {
            actual.push(point.actual);
            predicted.push(point.predicted);
        }

        results.push((start, mean_absolute_percentage_error(&actual, &predicted)?));
    }

    Ok(results)
}

fn validate_pairs(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(ForecastError::MetricError(
            "Cannot compute a metric over empty sequences".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::MetricError(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    for (a, p) in actual.iter().zip(predicted.iter()) {
        if !a.is_finite() || !p.is_finite() {
            return Err(ForecastError::NonFiniteValue(
                "Metric input contains a non-finite value".to_string(),
            ));
        }
    }
    Ok(())
}

/// Forecast performance metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Performance Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}
