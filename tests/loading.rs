mod common;

use common::{fixture, write, FORECAST_CSV, HISTORY_CSV};
use pm_dashboard::types::{IntervalCategory, PerformanceTier};
use pm_dashboard::{logging, DashboardConfig, DashboardError, Dataset};
use std::io::Write;

#[test]
fn loads_both_tables() {
    logging::init_test();
    let (_dir, cfg) = fixture();
    let ds = Dataset::load(&cfg).unwrap();

    assert_eq!(ds.forecast().len(), 3);
    assert_eq!(ds.forecast_report.total_rows, 5);
    assert_eq!(ds.forecast_report.parse_errors, 2);
    assert_eq!(ds.forecast_report.imputed_total_hours, 1);
    assert_eq!(ds.departments(), vec!["A", "B"]);
    assert_eq!(ds.crafts(), vec!["ELEC", "MECH"]);

    let pm1 = &ds.forecast()[0];
    assert_eq!(pm1.month, "2025-01");
    assert_eq!(pm1.interval_category, IntervalCategory::Weekly);

    let exec = ds.execution();
    assert_eq!(exec.len(), 3);
    assert_eq!(exec[0].performance_tier, PerformanceTier::Excellent);
    assert_eq!(exec[0].hour_deviation_pct, Some(5.0));
    // zero planned hours: deviation is undefined, not infinite
    assert_eq!(exec[1].hour_deviation_pct, None);
    assert_eq!(exec[1].completion_rate, Some(0.75));
    assert_eq!(exec[1].performance_tier, PerformanceTier::AtRisk);
    // never scheduled: no rates, no tier
    assert_eq!(exec[2].completion_rate, None);
    assert_eq!(exec[2].on_time_rate, None);
    assert_eq!(exec[2].performance_tier, PerformanceTier::NoData);
}

#[test]
fn missing_execution_file_leaves_view_empty() {
    logging::init_test();
    let (dir, mut cfg) = fixture();
    cfg.execution_path = dir.path().join("absent.csv");
    let ds = Dataset::load(&cfg).unwrap();
    assert_eq!(ds.forecast().len(), 3);
    assert!(ds.execution().is_empty());
}

#[test]
fn history_rebuilds_execution_table() {
    logging::init_test();
    let (dir, mut cfg) = fixture();
    cfg.history_path = Some(write(dir.path(), "history.csv", HISTORY_CSV));
    let ds = Dataset::load(&cfg).unwrap();

    let exec = ds.execution();
    assert_eq!(exec.len(), 2);
    assert_eq!(exec[0].pmnum, "PM1");
    assert_eq!(exec[0].scheduled_count, Some(2));
    assert_eq!(exec[0].completion_rate, Some(0.5));
    assert_eq!(exec[0].on_time_rate, Some(1.0));
    assert_eq!(exec[0].performance_tier, PerformanceTier::Failing);

    // completed ten days late, five hours planned and six spent
    assert_eq!(exec[1].on_time_rate, Some(0.0));
    let deviation = exec[1].hour_deviation_pct.unwrap();
    assert!((deviation - 20.0).abs() < 1e-9);
    assert_eq!(exec[1].performance_tier, PerformanceTier::Acceptable);
}

#[test]
fn grace_days_come_from_config() {
    let (dir, mut cfg) = fixture();
    cfg.history_path = Some(write(dir.path(), "history.csv", HISTORY_CSV));
    cfg.metrics.on_time_grace_days = 14;
    let ds = Dataset::load(&cfg).unwrap();
    assert_eq!(ds.execution()[1].on_time_rate, Some(1.0));
}

#[test]
fn schema_drift_fails_loudly() {
    let (dir, mut cfg) = fixture();
    let without_tasks = FORECAST_CSV.replace("TASK_COUNT", "TASKS");
    cfg.forecast_path = write(dir.path(), "drifted.csv", &without_tasks);
    match Dataset::load(&cfg) {
        Err(DashboardError::MissingColumn { column, .. }) => assert_eq!(column, "TASK_COUNT"),
        other => panic!("expected MissingColumn, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn forecast_without_usable_rows_is_an_error() {
    let (dir, mut cfg) = fixture();
    let header = FORECAST_CSV.lines().next().unwrap();
    cfg.forecast_path = write(dir.path(), "empty.csv", &format!("{}\n", header));
    assert!(matches!(
        Dataset::load(&cfg),
        Err(DashboardError::EmptyDataset(_))
    ));
}

#[test]
fn config_file_points_at_inputs() {
    let (dir, cfg) = fixture();
    let mut f = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
    write!(
        f,
        r#"{{"forecast_path": {}, "execution_path": {}, "output_dir": "out", "location_overrides": {{"B": "LINE"}}}}"#,
        serde_json::to_string(&cfg.forecast_path).unwrap(),
        serde_json::to_string(&cfg.execution_path).unwrap()
    )
    .unwrap();

    let loaded = DashboardConfig::from_file(f.path()).unwrap();
    loaded.validate().unwrap();
    let ds = Dataset::load(&loaded).unwrap();
    assert_eq!(ds.forecast().len(), 3);
    assert_eq!(
        ds.locations().column_for("B"),
        pm_dashboard::location::LocationColumn::Line
    );
}
