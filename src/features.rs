//! Feature extraction for 24h-ahead load forecasting
//!
//! Turns a validated [`LoadSeries`] into a supervised-learning table. Every
//! feature of a row anchored at `t` is computed from readings at or before
//! `t`; the label is the load 24 hours later. Rows whose trailing history is
//! incomplete are dropped, never imputed.

use crate::error::{ForecastError, Result};
use crate::series::LoadSeries;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Hours of trailing history a row needs: the 168h lag plus the 168-reading
/// window ending at the anchor
pub const HISTORY_HOURS: usize = 168;

/// Forecast horizon in hours; the label of a row at `t` is the load at `t + 24h`
pub const HORIZON_HOURS: usize = 24;

/// Field names of the standard feature vector, in column order
pub const STANDARD_FEATURE_NAMES: [&str; 13] = [
    "load",
    "load_24h_ago",
    "load_168h_ago",
    "mean_24h",
    "std_24h",
    "min_24h",
    "max_24h",
    "mean_168h",
    "std_168h",
    "min_168h",
    "max_168h",
    "hour_of_day",
    "day_of_week",
];

/// Ordered, named feature columns shared by the extractor, the model wrapper
/// and the backtest engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from an ordered list of unique field names
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(ForecastError::ValidationError(
                "Feature schema must contain at least one field".to_string(),
            ));
        }

        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ForecastError::ValidationError(format!(
                    "Duplicate feature name '{}' in schema",
                    name
                )));
            }
        }

        Ok(Self { names })
    }

    /// The schema produced by [`extract_features`]
    pub fn standard() -> Self {
        Self {
            names: STANDARD_FEATURE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Field names in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Column position of `name`, if present
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// One supervised-learning row: anchor timestamp, feature vector and label
///
/// `label` is `None` when the 24h-ahead reading runs past the end of the
/// series; such rows are kept for pure-inference callers but excluded from
/// training.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Anchor timestamp `t`; no feature references any reading after it
    pub timestamp: DateTime<Utc>,
    /// Feature values, aligned with the table's schema
    pub values: Vec<f64>,
    /// Load at `t + 24h`, when available
    pub label: Option<f64>,
}

/// Feature rows plus the schema their values are aligned with
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: FeatureSchema,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Create a table, validating row widths and timestamp ordering
    pub fn new(schema: FeatureSchema, rows: Vec<FeatureRow>) -> Result<Self> {
        for row in &rows {
            if row.values.len() != schema.len() {
                return Err(ForecastError::ValidationError(format!(
                    "Row at {} has {} values, schema has {} fields",
                    row.timestamp,
                    row.values.len(),
                    schema.len()
                )));
            }
        }

        for pair in rows.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(ForecastError::ValidationError(format!(
                    "Rows at {} and {} are not strictly increasing",
                    pair[0].timestamp, pair[1].timestamp
                )));
            }
        }

        Ok(Self { schema, rows })
    }

    /// The feature schema
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// All rows, in ascending timestamp order
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Table restricted to rows that carry a label
    pub fn labeled(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r.label.is_some())
                .cloned()
                .collect(),
        }
    }

    /// Table restricted to rows strictly before `cutoff`
    pub fn rows_before(&self, cutoff: DateTime<Utc>) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: self
                .rows
                .iter()
                .take_while(|r| r.timestamp < cutoff)
                .cloned()
                .collect(),
        }
    }

    /// The single row anchored exactly at `timestamp`, if present
    pub fn row_at(&self, timestamp: DateTime<Utc>) -> Option<&FeatureRow> {
        self.rows
            .binary_search_by_key(&timestamp, |r| r.timestamp)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Labels of all labeled rows, in row order
    pub fn labels(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.label).collect()
    }
}

/// Extract the full feature table from a validated hourly series
///
/// Deterministic and idempotent: re-running on the same input yields an
/// identical table. One row per timestamp with at least [`HISTORY_HOURS`]
/// readings before it; output is strictly ordered by timestamp.
pub fn extract_features(series: &LoadSeries) -> Result<FeatureTable> {
    if series.len() <= HISTORY_HOURS {
        return Err(ForecastError::InsufficientHistory(format!(
            "Series has {} readings; need more than {} to build any feature row",
            series.len(),
            HISTORY_HOURS
        )));
    }

    let values = series.values();
    let timestamps = series.timestamps();
    let mut rows = Vec::with_capacity(series.len() - HISTORY_HOURS);

    for i in HISTORY_HOURS..series.len() {
        let timestamp = timestamps[i];

        // Trailing windows end at the anchor, inclusive
        let day_window = &values[i + 1 - HORIZON_HOURS..=i];
        let week_window = &values[i + 1 - HISTORY_HOURS..=i];

        let feature_values = vec![
            values[i],
            values[i - HORIZON_HOURS],
            values[i - HISTORY_HOURS],
            mean(day_window),
            std_dev(day_window),
            min(day_window),
            max(day_window),
            mean(week_window),
            std_dev(week_window),
            min(week_window),
            max(week_window),
            f64::from(timestamp.hour()),
            f64::from(timestamp.weekday().num_days_from_monday()),
        ];

        let label = values.get(i + HORIZON_HOURS).copied();

        rows.push(FeatureRow {
            timestamp,
            values: feature_values,
            label,
        });
    }

    FeatureTable::new(FeatureSchema::standard(), rows)
}

fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

/// Population standard deviation over the window
fn std_dev(window: &[f64]) -> f64 {
    let m = mean(window);
    let variance = window.iter().map(|v| (v - m).powi(2)).sum::<f64>() / window.len() as f64;
    variance.sqrt()
}

fn min(window: &[f64]) -> f64 {
    window.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(window: &[f64]) -> f64 {
    window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
