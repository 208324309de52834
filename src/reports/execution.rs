// Plan-vs-actual execution comparison.
use super::{average, ordered_counts, total, CategoryCount};
use crate::aggregate::{aggregate, Column, Filter, Reduce, Reduction};
use crate::dataset::Dataset;
use crate::types::{ExecutionRecord, IntervalCategory, PerformanceTier};
use crate::util::{display_one_decimal, display_rate, display_signed_pct, display_text};
use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

const TOP_OVERRUNS: usize = 10;

/// `None` on a field means no restriction; an empty list keeps nothing.
///
/// The date range is matched against the first day of each due month. Once
/// either end is set, groupings without a due month drop out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionFilter {
    pub departments: Option<Vec<String>>,
    pub intervals: Option<Vec<IntervalCategory>>,
    pub job_types: Option<Vec<String>>,
    pub crafts: Option<Vec<String>>,
    pub tiers: Option<Vec<PerformanceTier>>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ExecutionFilter {
    pub fn to_filter(&self) -> Filter {
        let mut f = Filter::new();
        if let Some(v) = &self.departments {
            f = f.one_of(Column::Department, v.iter().cloned());
        }
        if let Some(v) = &self.intervals {
            f = f.one_of(Column::IntervalCategory, v.iter().map(|i| i.label()));
        }
        if let Some(v) = &self.job_types {
            f = f.one_of(Column::JobType, v.iter().cloned());
        }
        if let Some(v) = &self.crafts {
            f = f.one_of(Column::LaborCraft, v.iter().cloned());
        }
        if let Some(v) = &self.tiers {
            f = f.one_of(Column::PerformanceTier, v.iter().map(|t| t.label()));
        }
        if self.start.is_some() || self.end.is_some() {
            f = f.due_between(self.start, self.end);
        }
        f
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionKpis {
    pub groupings: usize,
    pub mean_completion_rate: Option<f64>,
    pub mean_on_time_rate: Option<f64>,
    pub mean_hour_deviation_pct: Option<f64>,
    pub planned_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DepartmentPerformanceRow {
    #[serde(rename = "Department")]
    #[tabled(rename = "Department")]
    pub department: String,
    #[serde(rename = "Groupings")]
    #[tabled(rename = "Groupings")]
    pub groupings: usize,
    #[serde(rename = "CompletionRate")]
    #[tabled(rename = "CompletionRate", display_with = "display_rate")]
    pub completion_rate: Option<f64>,
    #[serde(rename = "OnTimeRate")]
    #[tabled(rename = "OnTimeRate", display_with = "display_rate")]
    pub on_time_rate: Option<f64>,
    #[serde(rename = "HourDeviationPct")]
    #[tabled(rename = "HourDeviationPct", display_with = "display_signed_pct")]
    pub hour_deviation_pct: Option<f64>,
    #[serde(rename = "TypicalTier")]
    #[tabled(rename = "TypicalTier", display_with = "display_text")]
    pub typical_tier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthlyTrendRow {
    #[serde(rename = "DueMonth")]
    #[tabled(rename = "DueMonth")]
    pub due_month: String,
    #[serde(rename = "CompletionRate")]
    #[tabled(rename = "CompletionRate", display_with = "display_rate")]
    pub completion_rate: Option<f64>,
    #[serde(rename = "OnTimeRate")]
    #[tabled(rename = "OnTimeRate", display_with = "display_rate")]
    pub on_time_rate: Option<f64>,
    #[serde(rename = "HourDeviationPct")]
    #[tabled(rename = "HourDeviationPct", display_with = "display_signed_pct")]
    pub hour_deviation_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct OverrunRow {
    #[serde(rename = "PMNUM")]
    #[tabled(rename = "PMNUM")]
    pub pmnum: String,
    #[serde(rename = "Department")]
    #[tabled(rename = "Department", display_with = "display_text")]
    pub department: Option<String>,
    #[serde(rename = "Interval")]
    #[tabled(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "DueMonth")]
    #[tabled(rename = "DueMonth", display_with = "display_text")]
    pub due_month: Option<String>,
    #[serde(rename = "AvgPlannedHrs")]
    #[tabled(rename = "AvgPlannedHrs", display_with = "display_one_decimal")]
    pub avg_planned_hrs: Option<f64>,
    #[serde(rename = "AvgActualHrs")]
    #[tabled(rename = "AvgActualHrs", display_with = "display_one_decimal")]
    pub avg_actual_hrs: Option<f64>,
    #[serde(rename = "HourDeviationPct")]
    #[tabled(rename = "HourDeviationPct", display_with = "display_signed_pct")]
    pub hour_deviation_pct: Option<f64>,
}

/// One exported grouping. Missing values serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionExportRow {
    #[serde(rename = "PMNUM")]
    pub pmnum: String,
    #[serde(rename = "DEPT_NAME")]
    pub department: Option<String>,
    pub interval_category: String,
    #[serde(rename = "JOB_TYPE")]
    pub job_type: Option<String>,
    #[serde(rename = "LABOR_CRAFT")]
    pub labor_craft: Option<String>,
    #[serde(rename = "DUE_MONTH")]
    pub due_month: Option<String>,
    #[serde(rename = "SCHEDULED_COUNT")]
    pub scheduled_count: Option<u32>,
    #[serde(rename = "COMPLETED_COUNT")]
    pub completed_count: Option<u32>,
    #[serde(rename = "ON_TIME_COUNT")]
    pub on_time_count: Option<u32>,
    #[serde(rename = "AVG_PLANNED_HRS")]
    pub avg_planned_hrs: Option<f64>,
    #[serde(rename = "AVG_ACTUAL_HRS")]
    pub avg_actual_hrs: Option<f64>,
    pub completion_rate: Option<f64>,
    pub on_time_rate: Option<f64>,
    pub hour_deviation_pct: Option<f64>,
    pub performance_tier: String,
}

impl From<&ExecutionRecord> for ExecutionExportRow {
    fn from(r: &ExecutionRecord) -> Self {
        Self {
            pmnum: r.pmnum.clone(),
            department: r.department.clone(),
            interval_category: r.interval_category.label().to_string(),
            job_type: r.job_type.clone(),
            labor_craft: r.labor_craft.clone(),
            due_month: r.due_month.clone(),
            scheduled_count: r.scheduled_count,
            completed_count: r.completed_count,
            on_time_count: r.on_time_count,
            avg_planned_hrs: r.avg_planned_hrs,
            avg_actual_hrs: r.avg_actual_hrs,
            completion_rate: r.completion_rate,
            on_time_rate: r.on_time_rate,
            hour_deviation_pct: r.hour_deviation_pct,
            performance_tier: r.performance_tier.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionComparison {
    pub kpis: ExecutionKpis,
    pub departments: Vec<DepartmentPerformanceRow>,
    pub tiers: Vec<CategoryCount>,
    pub monthly_trend: Vec<MonthlyTrendRow>,
    pub top_overruns: Vec<OverrunRow>,
    pub export: Vec<ExecutionExportRow>,
}

impl ExecutionComparison {
    pub fn is_empty(&self) -> bool {
        self.kpis.groupings == 0
    }
}

pub fn execution_comparison(ds: &Dataset, filter: &ExecutionFilter) -> ExecutionComparison {
    let rows: Vec<&ExecutionRecord> = filter.to_filter().apply(ds.execution());
    debug!(selected = rows.len(), of = ds.execution().len(), "execution view");

    let kpis = ExecutionKpis {
        groupings: rows.len(),
        mean_completion_rate: average(&rows, Column::CompletionRate),
        mean_on_time_rate: average(&rows, Column::OnTimeRate),
        mean_hour_deviation_pct: average(&rows, Column::HourDeviationPct),
        planned_hours: total(&rows, Column::AvgPlannedHrs),
        actual_hours: total(&rows, Column::AvgActualHrs),
    };

    let departments = aggregate(
        rows.iter().copied(),
        &[Column::Department],
        &[
            Reduce::new(Column::PmNum, Reduction::Count),
            Reduce::new(Column::CompletionRate, Reduction::Mean),
            Reduce::new(Column::OnTimeRate, Reduction::Mean),
            Reduce::new(Column::HourDeviationPct, Reduction::Mean),
            Reduce::new(Column::PerformanceTier, Reduction::Mode),
        ],
    )
    .sort_desc(Column::CompletionRate)
    .rows
    .iter()
    .map(|g| DepartmentPerformanceRow {
        department: g.label(Column::Department),
        groupings: g.count(Column::PmNum),
        completion_rate: g.number(Column::CompletionRate),
        on_time_rate: g.number(Column::OnTimeRate),
        hour_deviation_pct: g.number(Column::HourDeviationPct),
        typical_tier: g.text(Column::PerformanceTier).map(str::to_string),
    })
    .collect();

    let monthly_trend = aggregate(
        rows.iter().copied(),
        &[Column::DueMonth],
        &[
            Reduce::new(Column::CompletionRate, Reduction::Mean),
            Reduce::new(Column::OnTimeRate, Reduction::Mean),
            Reduce::new(Column::HourDeviationPct, Reduction::Mean),
        ],
    )
    .sort_by_label(Column::DueMonth)
    .rows
    .iter()
    .map(|g| MonthlyTrendRow {
        due_month: g.label(Column::DueMonth),
        completion_rate: g.number(Column::CompletionRate),
        on_time_rate: g.number(Column::OnTimeRate),
        hour_deviation_pct: g.number(Column::HourDeviationPct),
    })
    .collect();

    let tier_labels: Vec<&str> = PerformanceTier::ALL.iter().map(|t| t.label()).collect();

    ExecutionComparison {
        kpis,
        departments,
        tiers: ordered_counts(&rows, Column::PerformanceTier, &tier_labels),
        monthly_trend,
        top_overruns: top_overruns(&rows),
        export: rows.iter().map(|r| ExecutionExportRow::from(*r)).collect(),
    }
}

/// Groupings that ran over plan, largest overrun first.
fn top_overruns(rows: &[&ExecutionRecord]) -> Vec<OverrunRow> {
    let mut over: Vec<(f64, &ExecutionRecord)> = rows
        .iter()
        .filter_map(|r| r.hour_deviation_pct.filter(|d| *d > 0.0).map(|d| (d, *r)))
        .collect();
    over.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    over.into_iter()
        .take(TOP_OVERRUNS)
        .map(|(_, r)| OverrunRow {
            pmnum: r.pmnum.clone(),
            department: r.department.clone(),
            interval: r.interval_category.label().to_string(),
            due_month: r.due_month.clone(),
            avg_planned_hrs: r.avg_planned_hrs,
            avg_actual_hrs: r.avg_actual_hrs,
            hour_deviation_pct: r.hour_deviation_pct,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures;

    #[test]
    fn kpis_over_all_groupings() {
        let view = execution_comparison(&fixtures::dataset(), &ExecutionFilter::default());
        assert_eq!(view.kpis.groupings, 3);
        assert_eq!(view.kpis.mean_completion_rate, Some(0.75));
        // deviation is averaged over the groupings that have one
        assert_eq!(view.kpis.mean_hour_deviation_pct, Some(22.5));
        assert_eq!(view.kpis.planned_hours, Some(30.0));
        assert_eq!(view.export.len(), 3);
    }

    #[test]
    fn department_table_and_tiers() {
        let view = execution_comparison(&fixtures::dataset(), &ExecutionFilter::default());
        assert_eq!(view.departments.len(), 2);
        assert_eq!(view.departments[0].department, "PRESS");
        assert_eq!(view.departments[0].groupings, 2);
        assert_eq!(view.departments[0].completion_rate, Some(0.75));

        let labels: Vec<&str> = view.tiers.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(labels, vec!["Excellent", "Acceptable", "At Risk", "Failing", "No Data"]);
        let counts: Vec<usize> = view.tiers.iter().map(|t| t.count).collect();
        assert_eq!(counts, vec![1, 0, 1, 1, 0]);
    }

    #[test]
    fn overruns_exclude_under_plan_and_missing() {
        let view = execution_comparison(&fixtures::dataset(), &ExecutionFilter::default());
        let pms: Vec<&str> = view.top_overruns.iter().map(|o| o.pmnum.as_str()).collect();
        assert_eq!(pms, vec!["PM2", "PM1"]);
    }

    #[test]
    fn tier_filter() {
        let filter = ExecutionFilter {
            tiers: Some(vec![PerformanceTier::Failing]),
            ..ExecutionFilter::default()
        };
        let view = execution_comparison(&fixtures::dataset(), &filter);
        assert_eq!(view.kpis.groupings, 1);
        assert_eq!(view.export[0].pmnum, "PM2");
        assert_eq!(view.export[0].performance_tier, "Failing");
    }

    #[test]
    fn due_range_keeps_one_month_and_drops_undated() {
        use crate::location::default_overrides;

        use PerformanceTier::*;

        let mut feb = fixtures::execution("PM2", "PRESS", Some(0.5), Some(40.0), Failing);
        feb.due_month = Some("2025-02".to_string());
        let mut undated = fixtures::execution("PM3", "PAINT", Some(0.75), None, AtRisk);
        undated.due_month = None;
        let execution = vec![
            fixtures::execution("PM1", "PRESS", Some(1.0), Some(5.0), Excellent),
            feb,
            undated,
        ];
        let ds = Dataset::new(Vec::new(), execution, &default_overrides());

        let filter = ExecutionFilter {
            start: NaiveDate::from_ymd_opt(2025, 2, 1),
            end: NaiveDate::from_ymd_opt(2025, 2, 28),
            ..ExecutionFilter::default()
        };
        let view = execution_comparison(&ds, &filter);
        assert_eq!(view.kpis.groupings, 1);
        assert_eq!(view.export[0].pmnum, "PM2");
        assert_eq!(view.monthly_trend[0].due_month, "2025-02");

        // an open-ended range still excludes the grouping with no due month
        let filter = ExecutionFilter {
            start: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..ExecutionFilter::default()
        };
        let pms: Vec<String> = execution_comparison(&ds, &filter)
            .export
            .into_iter()
            .map(|r| r.pmnum)
            .collect();
        assert_eq!(pms, vec!["PM1", "PM2"]);

        // without a range every grouping stays
        let view = execution_comparison(&ds, &ExecutionFilter::default());
        assert_eq!(view.kpis.groupings, 3);
    }

    #[test]
    fn unmatched_department_yields_missing_kpis() {
        let filter = ExecutionFilter {
            departments: Some(vec!["NOPE".to_string()]),
            ..ExecutionFilter::default()
        };
        let view = execution_comparison(&fixtures::dataset(), &filter);
        assert!(view.is_empty());
        assert_eq!(view.kpis.mean_completion_rate, None);
        assert_eq!(view.kpis.mean_on_time_rate, None);
        assert_eq!(view.kpis.mean_hour_deviation_pct, None);
        assert_eq!(view.kpis.planned_hours, None);
        assert!(view.departments.is_empty());
        assert!(view.monthly_trend.is_empty());
    }
}
