//! Forecasting models over feature tables
//!
//! Training is split from prediction: a [`ForecastModel`] is an untrained
//! configuration, and every `train` call produces an independently owned
//! [`TrainedForecastModel`]. The backtest engine relies on this split to give
//! each cutoff its own freshly trained estimator.

use crate::error::Result;
use crate::features::FeatureTable;
use std::fmt::Debug;

/// A trained estimator, pinned to the feature names it was fit on
pub trait TrainedForecastModel: Debug {
    /// Predict one value per row of `table`
    ///
    /// The table's feature-name set must match the training set exactly;
    /// column order may differ. Unlabeled rows are predicted like any other.
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Model configuration that can be trained on a feature table
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Fit a fresh estimator on the labeled rows of `table`
    fn train(&self, table: &FeatureTable) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod gradient_boosting;
