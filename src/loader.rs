use crate::error::{DashboardError, Result};
use crate::metrics::{self, MetricsConfig, Normalizer};
use crate::types::{
    ExecutionRecord, ForecastRecord, IntervalCategory, RawExecutionRow, RawForecastRow,
    RawWorkOrderRow, ScopeType, WorkOrderInstance,
};
use crate::util::{
    clean_text, month_key, parse_count_safe, parse_date_safe, parse_f64_safe, parse_month_key,
    parse_non_negative, week_key,
};
use csv::{Reader, ReaderBuilder};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// What happened while reading one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    /// Forecast rows whose `total_labor_hrs` was filled from planned hours.
    pub imputed_total_hours: usize,
    /// Rows kept with at least one derived metric missing.
    pub missing_derived: usize,
}

const FORECAST_REQUIRED: &[&str] = &[
    "PMNUM",
    "COUNTKEY",
    "PMDESCRIPTION",
    "DEPT_NAME",
    "DUE_DATE",
    "PLANNED_LABOR_HRS",
    "TASK_COUNT",
];
const EXECUTION_REQUIRED: &[&str] = &["PMNUM", "DEPT_NAME", "AVG_PLANNED_HRS", "AVG_ACTUAL_HRS"];
const HISTORY_REQUIRED: &[&str] = &[
    "PMNUM",
    "DEPT_NAME",
    "DUE_DATE",
    "COMPLETED_DATE",
    "PLANNED_HRS",
    "ACTUAL_HRS",
];
const INTERVAL_COLUMNS: &[&str] = &["FREQUENCY", "interval_category"];

fn open(path: &Path) -> Result<Reader<std::fs::File>> {
    Ok(ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?)
}

fn reader<R: Read>(input: R) -> Reader<R> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input)
}

/// Schema drift is the producer's bug; refuse to guess.
fn require_columns<R: Read>(
    rdr: &mut Reader<R>,
    source: &str,
    required: &[&str],
    any_of: &[&str],
) -> Result<()> {
    let headers = rdr.headers()?.clone();
    let has = |name: &str| headers.iter().any(|h| h == name);
    if let Some(missing) = required.iter().find(|c| !has(c)) {
        return Err(DashboardError::MissingColumn {
            file: source.to_string(),
            column: missing.to_string(),
        });
    }
    if !any_of.is_empty() && !any_of.iter().any(|c| has(c)) {
        return Err(DashboardError::MissingColumn {
            file: source.to_string(),
            column: any_of.join(" | "),
        });
    }
    Ok(())
}

fn interval_of(frequency: Option<&str>, category: Option<&str>) -> IntervalCategory {
    match clean_text(frequency).or_else(|| clean_text(category)) {
        Some(raw) => metrics::interval_category(&raw),
        None => IntervalCategory::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

pub fn load_forecast(
    path: &Path,
    cfg: &MetricsConfig,
) -> Result<(Vec<ForecastRecord>, LoadReport)> {
    let rdr = open(path)?;
    read_forecast(rdr, &path.display().to_string(), cfg)
}

pub fn load_forecast_from_reader<R: Read>(
    input: R,
    source: &str,
    cfg: &MetricsConfig,
) -> Result<(Vec<ForecastRecord>, LoadReport)> {
    read_forecast(reader(input), source, cfg)
}

fn read_forecast<R: Read>(
    mut rdr: Reader<R>,
    source: &str,
    cfg: &MetricsConfig,
) -> Result<(Vec<ForecastRecord>, LoadReport)> {
    require_columns(&mut rdr, source, FORECAST_REQUIRED, INTERVAL_COLUMNS)?;

    let mut report = LoadReport::default();
    let mut prelim: Vec<ForecastRecord> = Vec::new();

    for (idx, result) in rdr.deserialize::<RawForecastRow>().enumerate() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(source, row = idx + 2, error = %e, "unreadable forecast row");
                report.parse_errors += 1;
                continue;
            }
        };

        let (Some(pmnum), Some(countkey)) = (
            clean_text(row.pmnum.as_deref()),
            clean_text(row.countkey.as_deref()),
        ) else {
            debug!(source, row = idx + 2, "forecast row without PMNUM/COUNTKEY");
            report.parse_errors += 1;
            continue;
        };
        let Some(due_date) = parse_date_safe(row.due_date.as_deref()) else {
            debug!(source, row = idx + 2, pmnum = %pmnum, "forecast row without a valid DUE_DATE");
            report.parse_errors += 1;
            continue;
        };

        let planned_labor_hrs = parse_non_negative(row.planned_labor_hrs.as_deref());
        let mut total_labor_hrs = parse_non_negative(row.total_labor_hrs.as_deref());
        if total_labor_hrs.is_none() && planned_labor_hrs.is_some() {
            total_labor_hrs = planned_labor_hrs;
            report.imputed_total_hours += 1;
        }

        prelim.push(ForecastRecord {
            pmnum,
            countkey,
            description: clean_text(row.description.as_deref()).unwrap_or_default(),
            department: clean_text(row.dept_name.as_deref()),
            job_type: clean_text(row.job_type.as_deref()),
            scope_type: ScopeType::from_raw(row.scope_type.as_deref()),
            line: clean_text(row.line.as_deref()),
            zone_name: clean_text(row.zone_name.as_deref()),
            labor_craft: clean_text(row.labor_craft.as_deref()),
            due_date,
            month: month_key(due_date),
            week: week_key(due_date),
            planned_labor_hrs,
            planned_laborers: parse_non_negative(row.planned_laborers.as_deref()),
            task_count: parse_non_negative(row.task_count.as_deref()),
            total_labor_hrs,
            complexity_score: None,
            complexity_level: None,
            interval_category: interval_of(
                row.frequency.as_deref(),
                row.interval_category.as_deref(),
            ),
        });
    }

    // Normalisation needs the whole population, so scores are a second pass.
    derive_complexity(&mut prelim, cfg);
    report.missing_derived = prelim.iter().filter(|r| r.complexity_score.is_none()).count();
    report.loaded_rows = prelim.len();

    if prelim.is_empty() {
        return Err(DashboardError::EmptyDataset(source.to_string()));
    }
    info!(
        source,
        total = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.parse_errors,
        "forecast table loaded"
    );
    if report.missing_derived > 0 {
        warn!(
            source,
            rows = report.missing_derived,
            "forecast rows without a complexity score"
        );
    }
    Ok((prelim, report))
}

/// Fill `complexity_score` and `complexity_level` for every record.
pub fn derive_complexity(records: &mut [ForecastRecord], cfg: &MetricsConfig) {
    let hours_of = |r: &ForecastRecord| {
        r.total_labor_hrs
            .and_then(|h| metrics::hours_magnitude(h, cfg.log_scale_hours))
    };
    let task_norm = Normalizer::fit(records.iter().filter_map(|r| r.task_count));
    let hours_norm = Normalizer::fit(records.iter().filter_map(|r| hours_of(r)));
    let desc_norm = Normalizer::fit(
        records
            .iter()
            .map(|r| metrics::description_length(&r.description)),
    );

    for r in records.iter_mut() {
        let score = metrics::complexity_score(
            r.task_count.and_then(|t| task_norm.scale(t)),
            hours_of(&*r).and_then(|h| hours_norm.scale(h)),
            desc_norm.scale(metrics::description_length(&r.description)),
            &cfg.weights,
        );
        r.complexity_score = score;
        r.complexity_level =
            score.and_then(|s| metrics::complexity_level(s, &cfg.complexity_thresholds));
    }
}

// ---------------------------------------------------------------------------
// Execution summary
// ---------------------------------------------------------------------------

pub fn load_execution(
    path: &Path,
    cfg: &MetricsConfig,
) -> Result<(Vec<ExecutionRecord>, LoadReport)> {
    let rdr = open(path)?;
    read_execution(rdr, &path.display().to_string(), cfg)
}

pub fn load_execution_from_reader<R: Read>(
    input: R,
    source: &str,
    cfg: &MetricsConfig,
) -> Result<(Vec<ExecutionRecord>, LoadReport)> {
    read_execution(reader(input), source, cfg)
}

fn read_execution<R: Read>(
    mut rdr: Reader<R>,
    source: &str,
    cfg: &MetricsConfig,
) -> Result<(Vec<ExecutionRecord>, LoadReport)> {
    require_columns(&mut rdr, source, EXECUTION_REQUIRED, &[])?;
    {
        let headers = rdr.headers()?;
        let has = |name: &str| headers.iter().any(|h| h == name);
        let counted = has("SCHEDULED_COUNT") && has("COMPLETED_COUNT");
        if !counted && !has("completion_rate") {
            return Err(DashboardError::MissingColumn {
                file: source.to_string(),
                column: "SCHEDULED_COUNT + COMPLETED_COUNT | completion_rate".to_string(),
            });
        }
    }

    let mut report = LoadReport::default();
    let mut out: Vec<ExecutionRecord> = Vec::new();

    for (idx, result) in rdr.deserialize::<RawExecutionRow>().enumerate() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(source, row = idx + 2, error = %e, "unreadable execution row");
                report.parse_errors += 1;
                continue;
            }
        };
        let Some(pmnum) = clean_text(row.pmnum.as_deref()) else {
            report.parse_errors += 1;
            continue;
        };

        let scheduled_count = parse_count_safe(row.scheduled_count.as_deref());
        let completed_count = parse_count_safe(row.completed_count.as_deref());
        let on_time_count = parse_count_safe(row.on_time_count.as_deref());

        let (completion_rate, on_time_rate) = match scheduled_count {
            Some(scheduled) => (
                completed_count.and_then(|c| metrics::rate(c, scheduled)),
                match (on_time_count, completed_count) {
                    (Some(t), Some(c)) => metrics::rate(t, c),
                    _ => None,
                },
            ),
            None => (
                metrics::bounded_rate(parse_f64_safe(row.completion_rate.as_deref())),
                metrics::bounded_rate(parse_f64_safe(row.on_time_rate.as_deref())),
            ),
        };

        let avg_planned_hrs = parse_non_negative(row.avg_planned_hrs.as_deref());
        let avg_actual_hrs = parse_non_negative(row.avg_actual_hrs.as_deref());
        let hour_deviation_pct = metrics::hour_deviation_pct(avg_planned_hrs, avg_actual_hrs);
        let performance_tier =
            metrics::performance_tier(completion_rate, hour_deviation_pct, &cfg.tiers);

        if completion_rate.is_none() || on_time_rate.is_none() || hour_deviation_pct.is_none() {
            report.missing_derived += 1;
        }

        out.push(ExecutionRecord {
            pmnum,
            department: clean_text(row.dept_name.as_deref()),
            interval_category: interval_of(
                row.frequency.as_deref(),
                row.interval_category.as_deref(),
            ),
            job_type: clean_text(row.job_type.as_deref()),
            labor_craft: clean_text(row.labor_craft.as_deref()),
            scheduled_count,
            completed_count,
            on_time_count,
            avg_planned_hrs,
            avg_actual_hrs,
            due_month: parse_month_key(row.due_month.as_deref()),
            completion_rate,
            on_time_rate,
            hour_deviation_pct,
            performance_tier,
        });
    }

    report.loaded_rows = out.len();
    info!(
        source,
        total = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.parse_errors,
        incomplete = report.missing_derived,
        "execution table loaded"
    );
    Ok((out, report))
}

// ---------------------------------------------------------------------------
// Work-order history
// ---------------------------------------------------------------------------

pub fn load_work_orders(path: &Path) -> Result<(Vec<WorkOrderInstance>, LoadReport)> {
    let rdr = open(path)?;
    read_work_orders(rdr, &path.display().to_string())
}

pub fn load_work_orders_from_reader<R: Read>(
    input: R,
    source: &str,
) -> Result<(Vec<WorkOrderInstance>, LoadReport)> {
    read_work_orders(reader(input), source)
}

fn read_work_orders<R: Read>(
    mut rdr: Reader<R>,
    source: &str,
) -> Result<(Vec<WorkOrderInstance>, LoadReport)> {
    require_columns(&mut rdr, source, HISTORY_REQUIRED, INTERVAL_COLUMNS)?;

    let mut report = LoadReport::default();
    let mut out: Vec<WorkOrderInstance> = Vec::new();

    for (idx, result) in rdr.deserialize::<RawWorkOrderRow>().enumerate() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(source, row = idx + 2, error = %e, "unreadable work order row");
                report.parse_errors += 1;
                continue;
            }
        };
        let (Some(pmnum), Some(due_date)) = (
            clean_text(row.pmnum.as_deref()),
            parse_date_safe(row.due_date.as_deref()),
        ) else {
            report.parse_errors += 1;
            continue;
        };

        out.push(WorkOrderInstance {
            pmnum,
            department: clean_text(row.dept_name.as_deref()),
            interval_category: interval_of(
                row.frequency.as_deref(),
                row.interval_category.as_deref(),
            ),
            job_type: clean_text(row.job_type.as_deref()),
            labor_craft: clean_text(row.labor_craft.as_deref()),
            due_date,
            completed_date: parse_date_safe(row.completed_date.as_deref()),
            planned_hrs: parse_non_negative(row.planned_hrs.as_deref()),
            actual_hrs: parse_non_negative(row.actual_hrs.as_deref()),
        });
    }

    report.loaded_rows = out.len();
    info!(
        source,
        total = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.parse_errors,
        "work order history loaded"
    );
    Ok((out, report))
}
