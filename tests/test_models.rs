use chrono::{DateTime, Duration, TimeZone, Utc};
use load_forecast::{
    extract_features, FeatureRow, FeatureSchema, FeatureTable, ForecastError, ForecastModel,
    GradientBoosting, LoadSeries, TrainedForecastModel, TrainedGradientBoosting,
};
use pretty_assertions::assert_eq;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// A small hand-built table over a two-field schema
fn toy_table(labels: &[f64]) -> FeatureTable {
    let schema = FeatureSchema::new(vec!["a".to_string(), "b".to_string()]).unwrap();
    let rows = labels
        .iter()
        .enumerate()
        .map(|(i, &label)| FeatureRow {
            timestamp: start() + Duration::hours(i as i64),
            values: vec![i as f64, (labels.len() - i) as f64],
            label: Some(label),
        })
        .collect();
    FeatureTable::new(schema, rows).unwrap()
}

fn load_table() -> FeatureTable {
    let values: Vec<f64> = (0..300)
        .map(|h| 6000.0 + 900.0 * (h as f64 / 24.0 * std::f64::consts::TAU).sin())
        .collect();
    let series = LoadSeries::from_values(start(), values).unwrap();
    extract_features(&series).unwrap()
}

#[test]
fn test_invalid_parameters_rejected() {
    assert!(matches!(
        GradientBoosting::new(0, 0.1).unwrap_err(),
        ForecastError::InvalidParameter(_)
    ));
    assert!(matches!(
        GradientBoosting::new(10, 0.0).unwrap_err(),
        ForecastError::InvalidParameter(_)
    ));
    assert!(matches!(
        GradientBoosting::new(10, 1.5).unwrap_err(),
        ForecastError::InvalidParameter(_)
    ));
    assert!(matches!(
        GradientBoosting::with_params(10, 0.1, 0, 1).unwrap_err(),
        ForecastError::InvalidParameter(_)
    ));
    assert!(matches!(
        GradientBoosting::with_params(10, 0.1, 3, 0).unwrap_err(),
        ForecastError::InvalidParameter(_)
    ));
}

#[test]
fn test_training_is_deterministic() {
    let table = load_table();
    let model = GradientBoosting::new(20, 0.2).unwrap();

    let first = model.train(&table).unwrap();
    let second = model.train(&table).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.predict(&table).unwrap(),
        second.predict(&table).unwrap()
    );
}

#[test]
fn test_predict_returns_one_value_per_row() {
    let table = load_table();
    let model = GradientBoosting::new(10, 0.3).unwrap();
    let trained = model.train(&table).unwrap();

    let predictions = trained.predict(&table).unwrap();
    assert_eq!(predictions.len(), table.len());
    assert!(predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn test_feature_name_order_is_recorded() {
    let table = load_table();
    let model = GradientBoosting::new(5, 0.3).unwrap();
    let trained = model.train(&table).unwrap();

    assert_eq!(trained.feature_names(), table.schema().names());
}

#[test]
fn test_empty_training_table_rejected() {
    let schema = FeatureSchema::standard();
    let table = FeatureTable::new(schema, vec![]).unwrap();
    let model = GradientBoosting::new(5, 0.3).unwrap();

    let err = model.train(&table).unwrap_err();
    assert!(matches!(err, ForecastError::ValidationError(_)));
}

#[test]
fn test_unlabeled_rows_only_rejected() {
    let schema = FeatureSchema::new(vec!["a".to_string()]).unwrap();
    let rows = vec![FeatureRow {
        timestamp: start(),
        values: vec![1.0],
        label: None,
    }];
    let table = FeatureTable::new(schema, rows).unwrap();

    let err = GradientBoosting::new(5, 0.3)
        .unwrap()
        .train(&table)
        .unwrap_err();
    assert!(matches!(err, ForecastError::ValidationError(_)));
}

#[test]
fn test_non_finite_inputs_rejected() {
    let schema = FeatureSchema::new(vec!["a".to_string()]).unwrap();
    let model = GradientBoosting::new(5, 0.3).unwrap();

    let rows = vec![FeatureRow {
        timestamp: start(),
        values: vec![f64::NAN],
        label: Some(1.0),
    }];
    let table = FeatureTable::new(schema.clone(), rows).unwrap();
    assert!(matches!(
        model.train(&table).unwrap_err(),
        ForecastError::NonFiniteValue(_)
    ));

    let rows = vec![FeatureRow {
        timestamp: start(),
        values: vec![1.0],
        label: Some(f64::INFINITY),
    }];
    let table = FeatureTable::new(schema, rows).unwrap();
    assert!(matches!(
        model.train(&table).unwrap_err(),
        ForecastError::NonFiniteValue(_)
    ));
}

#[test]
fn test_constant_labels_predicted_exactly() {
    let table = toy_table(&[42.0; 30]);
    let model = GradientBoosting::new(25, 0.1).unwrap();
    let trained = model.train(&table).unwrap();

    for prediction in trained.predict(&table).unwrap() {
        assert_eq!(prediction, 42.0);
    }
}

#[test]
fn test_fits_simple_function() {
    // Labels equal the first feature; the ensemble should memorize it closely
    let labels: Vec<f64> = (0..50).map(|i| i as f64 * 2.0).collect();
    let mut table = toy_table(&labels);
    // Rebuild so feature "a" carries the signal exactly as the label
    table = {
        let schema = table.schema().clone();
        let rows = table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| FeatureRow {
                timestamp: row.timestamp,
                values: vec![labels[i], 1.0],
                label: Some(labels[i]),
            })
            .collect();
        FeatureTable::new(schema, rows).unwrap()
    };

    let model = GradientBoosting::with_params(60, 0.3, 3, 1).unwrap();
    let trained = model.train(&table).unwrap();
    let predictions = trained.predict(&table).unwrap();

    let mae: f64 = predictions
        .iter()
        .zip(labels.iter())
        .map(|(p, y)| (p - y).abs())
        .sum::<f64>()
        / labels.len() as f64;
    assert!(mae < 5.0, "training MAE too high: {}", mae);
}

#[test]
fn test_schema_mismatch_rejected() {
    let table = toy_table(&[1.0, 2.0, 3.0]);
    let model = GradientBoosting::new(5, 0.3).unwrap();
    let trained = model.train(&table).unwrap();

    // Missing column "b", extra column "c"
    let other_schema = FeatureSchema::new(vec!["a".to_string(), "c".to_string()]).unwrap();
    let rows = vec![FeatureRow {
        timestamp: start(),
        values: vec![1.0, 2.0],
        label: None,
    }];
    let other = FeatureTable::new(other_schema, rows).unwrap();

    let err = trained.predict(&other).unwrap_err();
    assert!(matches!(err, ForecastError::SchemaMismatch(_)));
}

#[test]
fn test_prediction_is_column_order_independent() {
    let table = toy_table(&[5.0, 9.0, 13.0, 17.0, 21.0, 25.0]);
    let model = GradientBoosting::new(10, 0.3).unwrap();
    let trained = model.train(&table).unwrap();
    let expected = trained.predict(&table).unwrap();

    // Same rows with columns swapped
    let swapped_schema = FeatureSchema::new(vec!["b".to_string(), "a".to_string()]).unwrap();
    let swapped_rows = table
        .rows()
        .iter()
        .map(|row| FeatureRow {
            timestamp: row.timestamp,
            values: vec![row.values[1], row.values[0]],
            label: row.label,
        })
        .collect();
    let swapped = FeatureTable::new(swapped_schema, swapped_rows).unwrap();

    assert_eq!(trained.predict(&swapped).unwrap(), expected);
}

#[test]
fn test_predict_empty_table_rejected() {
    let table = toy_table(&[1.0, 2.0, 3.0]);
    let model = GradientBoosting::new(5, 0.3).unwrap();
    let trained = model.train(&table).unwrap();

    let empty = FeatureTable::new(table.schema().clone(), vec![]).unwrap();
    assert!(matches!(
        trained.predict(&empty).unwrap_err(),
        ForecastError::ValidationError(_)
    ));
}

#[test]
fn test_persist_restore_round_trip() {
    let table = load_table();
    let model = GradientBoosting::new(15, 0.2).unwrap();
    let trained = model.train(&table).unwrap();
    let before = trained.predict(&table).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    trained.save(&path).unwrap();

    let restored = TrainedGradientBoosting::load(&path).unwrap();
    let after = restored.predict(&table).unwrap();

    // Bit-identical, not merely approximately equal
    assert_eq!(before, after);
}

#[test]
fn test_incompatible_artifact_version_rejected() {
    let table = toy_table(&[1.0, 2.0, 3.0]);
    let trained = GradientBoosting::new(5, 0.3)
        .unwrap()
        .train(&table)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    trained.save(&path).unwrap();

    // Rewrite the artifact with a bumped version field
    let raw = std::fs::read_to_string(&path).unwrap();
    let mut artifact: serde_json::Value = serde_json::from_str(&raw).unwrap();
    artifact["version"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_string(&artifact).unwrap()).unwrap();

    let err = TrainedGradientBoosting::load(&path).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::IncompatibleArtifact {
            expected: 1,
            found: 99
        }
    ));
}

#[test]
fn test_missing_artifact_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TrainedGradientBoosting::load(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ForecastError::IoError(_)));
}
