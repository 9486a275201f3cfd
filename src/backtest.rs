//! Walk-forward backtesting engine
//!
//! Replays historical cutoffs exactly as a live deployment would have seen
//! them: for each sampled cutoff, a fresh model is trained on the labeled
//! rows strictly before it and asked for one prediction at the cutoff. The
//! aggregate error is a single MAPE over every (predicted, actual) pair, not
//! an average of per-cutoff metrics.

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::metrics::mean_absolute_percentage_error;
use crate::models::{ForecastModel, TrainedForecastModel};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Backtest sampling configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    warmup: Duration,
    stride: usize,
}

impl BacktestConfig {
    /// Create a configuration
    ///
    /// `warmup` is the minimum gap between the first feature row and the
    /// first cutoff, so every cutoff has a non-empty training window.
    /// `stride` samples every k-th eligible cutoff to bound compute cost.
    pub fn new(warmup: Duration, stride: usize) -> Result<Self> {
        if warmup <= Duration::zero() {
            return Err(ForecastError::InvalidParameter(
                "Backtest warmup must be a positive duration".to_string(),
            ));
        }
        if stride == 0 {
            return Err(ForecastError::InvalidParameter(
                "Backtest stride must be at least 1".to_string(),
            ));
        }
        Ok(Self { warmup, stride })
    }

    /// Minimum gap between the first feature row and the first cutoff
    pub fn warmup(&self) -> Duration {
        self.warmup
    }

    /// Every k-th eligible cutoff is evaluated
    pub fn stride(&self) -> usize {
        self.stride
    }
}

/// One evaluated cutoff: what the model predicted and what actually happened
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestPoint {
    /// Timestamp at which the simulated deployment made its prediction
    pub cutoff: DateTime<Utc>,
    /// Predicted 24h-ahead load
    pub predicted: f64,
    /// Realized 24h-ahead load
    pub actual: f64,
}

/// Immutable outcome of a backtest run
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    points: Vec<BacktestPoint>,
    mape: f64,
    completed: bool,
}

impl BacktestResult {
    /// Evaluated cutoffs, in ascending cutoff order
    pub fn points(&self) -> &[BacktestPoint] {
        &self.points
    }

    /// Aggregate MAPE over all evaluated cutoffs, in percent
    pub fn mape(&self) -> f64 {
        self.mape
    }

    /// Whether every eligible cutoff was evaluated (false after an early stop)
    pub fn is_complete(&self) -> bool {
        self.completed
    }
}

impl std::fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Backtest Results:")?;
        writeln!(f, "  Cutoffs:  {}", self.points.len())?;
        writeln!(f, "  MAPE:     {:.4}%", self.mape)?;
        writeln!(
            f,
            "  Complete: {}",
            if self.completed { "yes" } else { "stopped early" }
        )?;
        Ok(())
    }
}

/// Walk-forward backtest over a feature table
#[derive(Debug, Clone)]
pub struct Backtest<M: ForecastModel> {
    model: M,
    config: BacktestConfig,
}

impl<M: ForecastModel> Backtest<M> {
    /// Create an engine that trains a fresh copy of `model` at every cutoff
    pub fn new(model: M, config: BacktestConfig) -> Self {
        Self { model, config }
    }

    /// Run the backtest over every eligible cutoff
    ///
    /// Each cutoff's training set is independent of every other's, so the
    /// loop is a pure sequential walk; results are ordered by cutoff.
    pub fn run(&self, table: &FeatureTable) -> Result<BacktestResult> {
        self.run_until(table, &AtomicBool::new(false))
    }

    /// Run the backtest, stopping cooperatively when `stop` becomes true
    ///
    /// Cutoffs already evaluated when the flag is observed are returned as a
    /// partial result with `is_complete() == false`.
    pub fn run_until(&self, table: &FeatureTable, stop: &AtomicBool) -> Result<BacktestResult> {
        if table.is_empty() {
            return Err(ForecastError::ValidationError(
                "Cannot backtest an empty feature table".to_string(),
            ));
        }

        let first_timestamp = table.rows()[0].timestamp;
        let threshold = first_timestamp + self.config.warmup;

        let labeled = table.labeled();
        let cutoffs: Vec<DateTime<Utc>> = labeled
            .rows()
            .iter()
            .filter(|row| row.timestamp >= threshold)
            .map(|row| row.timestamp)
            .step_by(self.config.stride)
            .collect();

        if cutoffs.is_empty() {
            return Err(ForecastError::NoEligibleCutoffs);
        }

        info!(
            cutoffs = cutoffs.len(),
            stride = self.config.stride,
            model = self.model.name(),
            "starting walk-forward backtest"
        );

        let total = cutoffs.len();
        let mut points = Vec::with_capacity(total);
        let mut completed = true;

        for (processed, cutoff) in cutoffs.into_iter().enumerate() {
            if stop.load(Ordering::Relaxed) {
                completed = false;
                info!(
                    processed,
                    total, "backtest stopped cooperatively before finishing"
                );
                break;
            }

            let training = labeled.rows_before(cutoff);
            let trained = self.model.train(&training)?;

            let row = labeled.row_at(cutoff).ok_or_else(|| {
                ForecastError::ValidationError(format!("No feature row at cutoff {}", cutoff))
            })?;
            let actual = row.label.ok_or_else(|| {
                ForecastError::ValidationError(format!("Cutoff {} lost its label", cutoff))
            })?;

            let serving = FeatureTable::new(table.schema().clone(), vec![row.clone()])?;
            let predicted = trained
                .predict(&serving)?
                .first()
                .copied()
                .ok_or_else(|| {
                    ForecastError::ValidationError(format!(
                        "Model returned no prediction at cutoff {}",
                        cutoff
                    ))
                })?;

            points.push(BacktestPoint {
                cutoff,
                predicted,
                actual,
            });

            debug!(
                processed = processed + 1,
                total,
                cutoff = %cutoff,
                predicted,
                actual,
                "scored backtest cutoff"
            );
        }

        if points.is_empty() {
            return Err(ForecastError::ValidationError(
                "Backtest was stopped before any cutoff was scored".to_string(),
            ));
        }

        let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
        let predicted: Vec<f64> = points.iter().map(|p| p.predicted).collect();
        let mape = mean_absolute_percentage_error(&actual, &predicted)?;

        info!(cutoffs = points.len(), mape, completed, "backtest finished");

        Ok(BacktestResult {
            points,
            mape,
            completed,
        })
    }
}
