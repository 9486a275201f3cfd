//! Hourly load time series handling
//!
//! The [`LoadSeries`] type is the validated input of the whole pipeline. All
//! gap and ordering checks happen once, at construction; every downstream
//! window bound is plain index arithmetic on a proven-contiguous sequence.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single hourly load observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadReading {
    /// Timestamp of the observation (UTC, on the hour)
    pub timestamp: DateTime<Utc>,
    /// Observed load
    pub value: f64,
}

/// Ordered, gap-free hourly load series
///
/// Successive timestamps must be exactly one hour apart. Anything else,
/// including daylight-saving artifacts that survived upstream cleaning, is
/// rejected at construction with [`ForecastError::InvalidSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl LoadSeries {
    /// Create a series from readings, validating the hourly contract
    pub fn new(readings: Vec<LoadReading>) -> Result<Self> {
        let timestamps = readings.iter().map(|r| r.timestamp).collect();
        let values = readings.iter().map(|r| r.value).collect();
        Self::from_parts(timestamps, values)
    }

    /// Create a series from parallel timestamp and value vectors
    pub fn from_parts(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::InvalidSeries(format!(
                "Timestamp count ({}) doesn't match value count ({})",
                timestamps.len(),
                values.len()
            )));
        }

        if timestamps.is_empty() {
            return Err(ForecastError::InvalidSeries(
                "Series contains no readings".to_string(),
            ));
        }

        for (i, value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(ForecastError::NonFiniteValue(format!(
                    "Reading at {} is not finite",
                    timestamps[i]
                )));
            }
        }

        for pair in timestamps.windows(2) {
            let delta = pair[1] - pair[0];
            if delta != Duration::hours(1) {
                return Err(ForecastError::InvalidSeries(format!(
                    "Readings at {} and {} are {} minutes apart, expected exactly 60",
                    pair[0],
                    pair[1],
                    delta.num_minutes()
                )));
            }
        }

        Ok(Self { timestamps, values })
    }

    /// Generate hourly timestamps from `start` and pair them with `values`
    pub fn from_values(start: DateTime<Utc>, values: Vec<f64>) -> Result<Self> {
        let timestamps = (0..values.len() as i64)
            .map(|h| start + Duration::hours(h))
            .collect();
        Self::from_parts(timestamps, values)
    }

    /// Number of readings
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no readings
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First timestamp of the series
    pub fn start(&self) -> DateTime<Utc> {
        self.timestamps[0]
    }

    /// Last timestamp of the series
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// All timestamps, in ascending order
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// All values, aligned with [`LoadSeries::timestamps`]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Position of `timestamp` in the series, computed arithmetically
    pub fn index_of(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        let delta = timestamp - self.start();
        let seconds = delta.num_seconds();
        if seconds < 0 || seconds % 3600 != 0 {
            return None;
        }
        let index = (seconds / 3600) as usize;
        if index < self.len() {
            Some(index)
        } else {
            None
        }
    }

    /// Value at `timestamp`, if the series covers it
    pub fn value_at(&self, timestamp: DateTime<Utc>) -> Option<f64> {
        self.index_of(timestamp).map(|i| self.values[i])
    }

    /// Iterate over the readings in ascending timestamp order
    pub fn readings(&self) -> impl Iterator<Item = LoadReading> + '_ {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .map(|(&timestamp, &value)| LoadReading { timestamp, value })
    }
}
