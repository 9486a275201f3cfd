use chrono::{DateTime, Duration, TimeZone, Utc};
use load_forecast::{
    extract_features, forecast_next_day, Backtest, BacktestConfig, ForecastModel,
    GradientBoosting, LoadSeries, TrainedForecastModel, TrainedGradientBoosting,
};
use pretty_assertions::assert_eq;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap()
}

/// Twenty days of synthetic load: daily cycle, weekly dip and a slow trend
fn realistic_series() -> LoadSeries {
    let values: Vec<f64> = (0..480)
        .map(|h| {
            let hour = h as f64;
            let daily = 900.0 * (hour / 24.0 * std::f64::consts::TAU).sin();
            let weekly = 350.0 * (hour / 168.0 * std::f64::consts::TAU).cos();
            6200.0 + daily + weekly + 0.4 * hour
        })
        .collect();
    LoadSeries::from_values(start(), values).unwrap()
}

#[test]
fn test_full_forecast_workflow() {
    // 1. Extract the supervised-learning table
    let series = realistic_series();
    let table = extract_features(&series).unwrap();
    assert_eq!(table.len(), 480 - 168);

    // 2. Train on the labeled rows and predict them back
    let labeled = table.labeled();
    let model = GradientBoosting::new(20, 0.2).unwrap();
    let trained = model.train(&labeled).unwrap();
    let predictions = trained.predict(&labeled).unwrap();
    assert_eq!(predictions.len(), labeled.len());

    // 3. Score the in-sample fit
    let metrics = load_forecast::evaluate_forecast(&labeled.labels(), &predictions).unwrap();
    assert!(metrics.mape.is_finite() && metrics.mape >= 0.0);
    assert!(metrics.rmse >= 0.0);

    // 4. Persist and restore; forecasts must not drift
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("load_model.json");
    trained.save(&path).unwrap();
    let restored = TrainedGradientBoosting::load(&path).unwrap();
    assert_eq!(restored.predict(&labeled).unwrap(), predictions);

    // 5. Single-shot next-day forecast from the raw series
    let (target_ts, forecast) = forecast_next_day(&series, &model).unwrap();
    assert_eq!(target_ts, series.end() + Duration::hours(24));
    assert!(forecast.is_finite());

    // 6. Walk-forward backtest over the same table
    let config = BacktestConfig::new(Duration::hours(48), 48).unwrap();
    let engine = Backtest::new(model, config);
    let result = engine.run(&table).unwrap();
    assert!(!result.points().is_empty());
    assert!(result.is_complete());
    assert!(result.mape().is_finite());

    let rendered = format!("{}", result);
    assert!(rendered.contains("MAPE"));
}

#[test]
fn test_crate_metadata() {
    assert_eq!(load_forecast::NAME, "load_forecast");
    assert!(!load_forecast::VERSION.is_empty());
}
