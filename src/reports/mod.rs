// Dashboard views.
//
// Each view takes the loaded `Dataset` plus its own selection, and returns a
// plain struct of KPIs and tables. KPIs over an empty selection are `None`,
// never zero. Row types derive both `Serialize` (CSV/JSON export) and
// `Tabled` (console preview).
pub mod calendar;
pub mod department;
pub mod execution;
pub mod executive;
pub mod insights;

use crate::aggregate::{aggregate, reduce_all, value_counts, Column, Record, Reduce, Reduction};
use crate::util::{display_hours, display_rate, ratio};
use serde::Serialize;
use tabled::Tabled;

pub use calendar::{workload_calendar, CalendarFilter, WorkloadCalendar};
pub use department::{
    department_deep_dive, DepartmentDeepDive, DepartmentSelection, WorkloadMetric,
};
pub use execution::{execution_comparison, ExecutionComparison, ExecutionFilter};
pub use executive::{executive_overview, ExecutiveOverview};
pub use insights::{operational_insights, OperationalInsights};

/// Occurrences of one category and its share of the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CategoryCount {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share", display_with = "display_rate")]
    pub share: Option<f64>,
}

/// Hours for one month or week.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct PeriodHours {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Hours")]
    #[tabled(rename = "Hours", display_with = "display_hours")]
    pub hours: f64,
}

/// One point of a stacked series, e.g. hours of one department in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SeriesPoint {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Series")]
    #[tabled(rename = "Series")]
    pub series: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value", display_with = "display_hours")]
    pub value: f64,
}

fn share(count: usize, total: usize) -> Option<f64> {
    ratio(count as f64, total as f64)
}

/// Category counts, most frequent first.
pub(crate) fn category_counts<R: Record>(rows: &[&R], column: Column) -> Vec<CategoryCount> {
    let counts = value_counts(rows.iter().copied(), column);
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            share: share(count, total),
            category,
            count,
        })
        .collect()
}

/// Category counts in a fixed order, zero-filled for absent labels.
pub(crate) fn ordered_counts<R: Record>(
    rows: &[&R],
    column: Column,
    order: &[&str],
) -> Vec<CategoryCount> {
    let counts = value_counts(rows.iter().copied(), column);
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    order
        .iter()
        .map(|label| {
            let count = counts
                .iter()
                .find(|(k, _)| k == label)
                .map_or(0, |(_, n)| *n);
            CategoryCount {
                category: label.to_string(),
                count,
                share: share(count, total),
            }
        })
        .collect()
}

/// Sum of `value` per period, in period order.
pub(crate) fn period_totals<R: Record>(
    rows: &[&R],
    period: Column,
    value: Column,
) -> Vec<PeriodHours> {
    aggregate(rows.iter().copied(), &[period], &[Reduce::new(value, Reduction::Sum)])
        .sort_by_label(period)
        .rows
        .iter()
        .map(|g| PeriodHours {
            period: g.label(period),
            hours: g.number_or_zero(value),
        })
        .collect()
}

/// Sum of `value` per (period, series), ordered by period.
pub(crate) fn stacked_series<R: Record>(
    rows: &[&R],
    period: Column,
    series: Column,
    value: Column,
) -> Vec<SeriesPoint> {
    aggregate(rows.iter().copied(), &[period, series], &[Reduce::new(value, Reduction::Sum)])
        .sort_by_label(period)
        .rows
        .iter()
        .map(|g| SeriesPoint {
            period: g.label(period),
            series: g.label(series),
            value: g.number_or_zero(value),
        })
        .collect()
}

/// `None` for an empty selection, the plain sum otherwise.
pub(crate) fn total<R: Record>(rows: &[&R], column: Column) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    reduce_all(rows.iter().copied(), Reduce::new(column, Reduction::Sum)).as_f64()
}

pub(crate) fn average<R: Record>(rows: &[&R], column: Column) -> Option<f64> {
    reduce_all(rows.iter().copied(), Reduce::new(column, Reduction::Mean)).as_f64()
}

pub(crate) fn distinct_count<R: Record>(rows: &[&R], column: Column) -> usize {
    reduce_all(rows.iter().copied(), Reduce::new(column, Reduction::CountDistinct))
        .as_f64()
        .map_or(0, |n| n as usize)
}

/// Most frequent value of a column, ties to the first seen.
pub(crate) fn primary<R: Record>(rows: &[&R], column: Column) -> Option<String> {
    reduce_all(rows.iter().copied(), Reduce::new(column, Reduction::Mode)).key()
}

pub(crate) fn per_pm(hours: Option<f64>, pms: usize) -> Option<f64> {
    ratio(hours?, pms as f64)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::dataset::Dataset;
    use crate::location::default_overrides;
    use crate::types::{
        ComplexityLevel, ExecutionRecord, ForecastRecord, IntervalCategory, PerformanceTier,
        ScopeType,
    };
    use crate::util::{month_key, week_key};
    use chrono::NaiveDate;

    #[allow(clippy::too_many_arguments)]
    pub fn forecast(
        pm: &str,
        dept: &str,
        craft: &str,
        due: (i32, u32, u32),
        hours: f64,
        score: f64,
        interval: IntervalCategory,
        scope: ScopeType,
    ) -> ForecastRecord {
        let due_date = NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap();
        let level = if score >= 0.75 {
            ComplexityLevel::VeryHigh
        } else if score >= 0.5 {
            ComplexityLevel::High
        } else if score >= 0.25 {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Low
        };
        ForecastRecord {
            pmnum: pm.to_string(),
            countkey: format!("{}-{}", pm, due_date),
            description: format!("{} service", pm),
            department: Some(dept.to_string()),
            job_type: Some("PM".to_string()),
            scope_type: scope,
            line: None,
            zone_name: Some("Z1".to_string()),
            labor_craft: Some(craft.to_string()),
            due_date,
            month: month_key(due_date),
            week: week_key(due_date),
            planned_labor_hrs: Some(hours),
            planned_laborers: Some(1.0),
            task_count: Some(5.0),
            total_labor_hrs: Some(hours),
            complexity_score: Some(score),
            complexity_level: Some(level),
            interval_category: interval,
        }
    }

    pub fn execution(
        pm: &str,
        dept: &str,
        completion: Option<f64>,
        deviation: Option<f64>,
        tier: PerformanceTier,
    ) -> ExecutionRecord {
        ExecutionRecord {
            pmnum: pm.to_string(),
            department: Some(dept.to_string()),
            interval_category: IntervalCategory::Monthly,
            job_type: Some("PM".to_string()),
            labor_craft: Some("MECH".to_string()),
            scheduled_count: Some(4),
            completed_count: completion.map(|c| (c * 4.0).round() as u32),
            on_time_count: None,
            avg_planned_hrs: Some(10.0),
            avg_actual_hrs: deviation.map(|d| 10.0 * (1.0 + d / 100.0)),
            due_month: Some("2025-01".to_string()),
            completion_rate: completion,
            on_time_rate: completion,
            hour_deviation_pct: deviation,
            performance_tier: tier,
        }
    }

    /// Two departments over three months.
    pub fn dataset() -> Dataset {
        use IntervalCategory::*;
        use ScopeType::*;
        let forecast = vec![
            self::forecast("PM1", "PRESS", "MECH", (2025, 1, 6), 10.0, 0.8, Weekly, Asset),
            self::forecast("PM1", "PRESS", "MECH", (2025, 1, 13), 10.0, 0.8, Weekly, Asset),
            self::forecast("PM2", "PRESS", "ELEC", (2025, 2, 3), 20.0, 0.3, Monthly, Location),
            self::forecast("PM3", "PAINT", "MECH", (2025, 1, 20), 5.0, 0.1, Monthly, Asset),
            self::forecast("PM4", "PAINT", "PIPE", (2025, 3, 3), 7.0, 0.6, Quarterly, Location),
        ];
        let execution = vec![
            self::execution("PM1", "PRESS", Some(1.0), Some(5.0), PerformanceTier::Excellent),
            self::execution("PM2", "PRESS", Some(0.5), Some(40.0), PerformanceTier::Failing),
            self::execution("PM3", "PAINT", Some(0.75), None, PerformanceTier::AtRisk),
        ];
        Dataset::new(forecast, execution, &default_overrides())
    }
}
