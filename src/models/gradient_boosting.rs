//! Gradient-boosted regression trees
//!
//! A from-scratch, fully deterministic boosting implementation: squared-error
//! residual fitting with depth-limited regression trees and learning-rate
//! shrinkage. Split search is an exhaustive scan over every feature and every
//! distinct value boundary, so training the same table twice yields the same
//! trees and bit-identical predictions.

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::models::{ForecastModel, TrainedForecastModel};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// On-disk artifact format version, checked on restore
pub const ARTIFACT_VERSION: u32 = 1;

/// Splits with a squared-error gain at or below this are not taken
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Untrained gradient-boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    name: String,
    n_trees: usize,
    learning_rate: f64,
    max_depth: usize,
    min_samples_leaf: usize,
}

impl GradientBoosting {
    /// Create a model with `n_trees` boosting rounds and the given shrinkage
    pub fn new(n_trees: usize, learning_rate: f64) -> Result<Self> {
        Self::with_params(n_trees, learning_rate, 3, 1)
    }

    /// Create a model with full control over the tree parameters
    pub fn with_params(
        n_trees: usize,
        learning_rate: f64,
        max_depth: usize,
        min_samples_leaf: usize,
    ) -> Result<Self> {
        if n_trees == 0 {
            return Err(ForecastError::InvalidParameter(
                "Number of trees must be positive".to_string(),
            ));
        }
        if !(learning_rate > 0.0 && learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Learning rate must be in (0, 1]".to_string(),
            ));
        }
        if max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "Maximum tree depth must be positive".to_string(),
            ));
        }
        if min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "Minimum samples per leaf must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!(
                "Gradient Boosting (trees={}, lr={}, depth={})",
                n_trees, learning_rate, max_depth
            ),
            n_trees,
            learning_rate,
            max_depth,
            min_samples_leaf,
        })
    }
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self {
            name: "Gradient Boosting (trees=50, lr=0.1, depth=3)".to_string(),
            n_trees: 50,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

impl ForecastModel for GradientBoosting {
    type Trained = TrainedGradientBoosting;

    fn train(&self, table: &FeatureTable) -> Result<Self::Trained> {
        let labeled = table.labeled();
        if labeled.is_empty() {
            return Err(ForecastError::ValidationError(
                "Training table contains no labeled rows".to_string(),
            ));
        }

        let mut x: Vec<Vec<f64>> = Vec::with_capacity(labeled.len());
        let mut y: Vec<f64> = Vec::with_capacity(labeled.len());
        for row in labeled.rows() {
            for value in &row.values {
                if !value.is_finite() {
                    return Err(ForecastError::NonFiniteValue(format!(
                        "Feature value at {} is not finite",
                        row.timestamp
                    )));
                }
            }
            let label = row.label.ok_or_else(|| {
                ForecastError::ValidationError(format!("Row at {} lost its label", row.timestamp))
            })?;
            if !label.is_finite() {
                return Err(ForecastError::NonFiniteValue(format!(
                    "Label at {} is not finite",
                    row.timestamp
                )));
            }
            x.push(row.values.clone());
            y.push(label);
        }

        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let mut predictions = vec![base_score; y.len()];
        let mut trees = Vec::with_capacity(self.n_trees);
        let indices: Vec<usize> = (0..y.len()).collect();

        for _ in 0..self.n_trees {
            let residuals: Vec<f64> = y
                .iter()
                .zip(predictions.iter())
                .map(|(label, pred)| label - pred)
                .collect();

            let tree = grow(
                &x,
                &residuals,
                &indices,
                0,
                self.max_depth,
                self.min_samples_leaf,
            );

            for (i, features) in x.iter().enumerate() {
                predictions[i] += self.learning_rate * tree.predict(features);
            }
            trees.push(tree);
        }

        Ok(TrainedGradientBoosting {
            name: self.name.clone(),
            feature_names: table.schema().names().to_vec(),
            base_score,
            learning_rate: self.learning_rate,
            trees,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A single node of a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Node::Leaf { value } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

/// Grow a regression tree on the residuals of the samples in `indices`
fn grow(
    x: &[Vec<f64>],
    residuals: &[f64],
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    min_samples_leaf: usize,
) -> Node {
    let node_mean =
        indices.iter().map(|&i| residuals[i]).sum::<f64>() / indices.len() as f64;

    if depth >= max_depth || indices.len() < 2 * min_samples_leaf {
        return Node::Leaf { value: node_mean };
    }

    let Some((feature, threshold)) = best_split(x, residuals, indices, min_samples_leaf) else {
        return Node::Leaf { value: node_mean };
    };

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[i][feature] <= threshold);

    // Guards against a midpoint that rounds onto an existing value
    if left_indices.is_empty() || right_indices.is_empty() {
        return Node::Leaf { value: node_mean };
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(
            x,
            residuals,
            &left_indices,
            depth + 1,
            max_depth,
            min_samples_leaf,
        )),
        right: Box::new(grow(
            x,
            residuals,
            &right_indices,
            depth + 1,
            max_depth,
            min_samples_leaf,
        )),
    }
}

/// Exhaustive search for the split with the largest squared-error reduction
///
/// Ties keep the first candidate in (feature, threshold) scan order, which is
/// what makes repeated training deterministic.
fn best_split(
    x: &[Vec<f64>],
    residuals: &[f64],
    indices: &[usize],
    min_samples_leaf: usize,
) -> Option<(usize, f64)> {
    let n = indices.len();
    let n_features = x[indices[0]].len();

    let total_sum: f64 = indices.iter().map(|&i| residuals[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| residuals[i] * residuals[i]).sum();
    let base_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<(usize, f64)> = None;
    let mut best_gain = MIN_SPLIT_GAIN;

    for feature in 0..n_features {
        let mut pairs: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (x[i][feature], residuals[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..n - 1 {
            let (value, residual) = pairs[k];
            left_sum += residual;
            left_sq += residual * residual;

            // A threshold can only fall between two distinct values
            if value == pairs[k + 1].0 {
                continue;
            }

            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = base_sse - sse;

            if gain > best_gain {
                best_gain = gain;
                best = Some((feature, (value + pairs[k + 1].0) / 2.0));
            }
        }
    }

    best
}

/// Trained gradient-boosted ensemble plus the feature-name order it was fit on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedGradientBoosting {
    name: String,
    feature_names: Vec<String>,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Node>,
}

/// Versioned wrapper written to disk by [`TrainedGradientBoosting::save`]
#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    version: u32,
    model: TrainedGradientBoosting,
}

impl TrainedGradientBoosting {
    /// Feature names in training column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Persist the model to a single JSON artifact
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let artifact = ModelArtifact {
            version: ARTIFACT_VERSION,
            model: self.clone(),
        };
        serde_json::to_writer(file, &artifact)?;
        Ok(())
    }

    /// Restore a model persisted with [`TrainedGradientBoosting::save`]
    ///
    /// Restoring and predicting yields output bit-identical to the model that
    /// was saved, given identical input.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(ForecastError::IncompatibleArtifact {
                expected: ARTIFACT_VERSION,
                found: artifact.version,
            });
        }
        Ok(artifact.model)
    }

    /// Map each training column to its position in `table`'s schema
    fn column_permutation(&self, table: &FeatureTable) -> Result<Vec<usize>> {
        let table_names = table.schema().names();

        let missing: Vec<&String> = self
            .feature_names
            .iter()
            .filter(|name| table.schema().index_of(name).is_none())
            .collect();
        let extra: Vec<&String> = table_names
            .iter()
            .filter(|name| !self.feature_names.contains(name))
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(ForecastError::SchemaMismatch(format!(
                "Prediction features don't match training features (missing: {:?}, extra: {:?})",
                missing, extra
            )));
        }

        self.feature_names
            .iter()
            .map(|name| {
                table.schema().index_of(name).ok_or_else(|| {
                    ForecastError::SchemaMismatch(format!("Feature '{}' not found", name))
                })
            })
            .collect()
    }
}

impl TrainedForecastModel for TrainedGradientBoosting {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        if table.is_empty() {
            return Err(ForecastError::ValidationError(
                "Prediction table contains no rows".to_string(),
            ));
        }

        let permutation = self.column_permutation(table)?;
        let mut predictions = Vec::with_capacity(table.len());

        for row in table.rows() {
            let features: Vec<f64> = permutation.iter().map(|&i| row.values[i]).collect();
            let mut prediction = self.base_score;
            for tree in &self.trees {
                prediction += self.learning_rate * tree.predict(&features);
            }
            predictions.push(prediction);
        }

        Ok(predictions)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
