// Single-department drill-down.
//
// KPIs, the complexity ranking and the category mixes describe the whole
// department. Everything time- or location-based honours the craft selection.
use super::{
    average, category_counts, distinct_count, ordered_counts, per_pm, primary, stacked_series,
    total, CategoryCount, SeriesPoint,
};
use crate::aggregate::{aggregate, Column, Filter, GroupedRow, Reduce, Reduction};
use crate::dataset::Dataset;
use crate::location::LocationColumn;
use crate::types::{ComplexityLevel, ForecastRecord};
use crate::util::{
    display_hours, display_one_decimal, display_opt_hours, display_text, display_two_decimals,
};
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

const TOP_COMPLEX_PMS: usize = 10;
const BOTTLENECK_MONTHS: usize = 3;

/// What the monthly interval stack measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WorkloadMetric {
    #[default]
    Hours,
    Laborers,
}

impl WorkloadMetric {
    pub fn column(&self) -> Column {
        match self {
            WorkloadMetric::Hours => Column::PlannedLaborHrs,
            WorkloadMetric::Laborers => Column::PlannedLaborers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DepartmentSelection {
    pub department: String,
    /// `None` keeps every craft; an empty list keeps none.
    pub crafts: Option<Vec<String>>,
    /// Month (`YYYY-MM`) for the detail rows; `None` lists every month.
    pub month: Option<String>,
    pub metric: WorkloadMetric,
}

impl DepartmentSelection {
    pub fn new(department: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            ..Self::default()
        }
    }

    fn department_filter(&self) -> Filter {
        Filter::new().equals(Column::Department, self.department.clone())
    }

    fn craft_filter(&self) -> Filter {
        let f = self.department_filter();
        match &self.crafts {
            Some(crafts) => f.one_of(Column::LaborCraft, crafts.iter().cloned()),
            None => f,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentKpis {
    pub total_hours: Option<f64>,
    pub pm_count: usize,
    pub mean_complexity: Option<f64>,
    pub primary_craft: Option<String>,
    pub hours_per_pm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct LocationRow {
    #[serde(rename = "Location")]
    #[tabled(rename = "Location")]
    pub location: String,
    #[serde(rename = "UniquePms")]
    #[tabled(rename = "UniquePms")]
    pub unique_pms: usize,
    #[serde(rename = "Occurrences")]
    #[tabled(rename = "Occurrences")]
    pub occurrences: usize,
    #[serde(rename = "PlannedLaborHrs")]
    #[tabled(rename = "PlannedLaborHrs", display_with = "display_hours")]
    pub planned_hours: f64,
    #[serde(rename = "TotalLaborHrs")]
    #[tabled(rename = "TotalLaborHrs", display_with = "display_hours")]
    pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ComplexPmRow {
    #[serde(rename = "PmNumber")]
    #[tabled(rename = "PmNumber")]
    pub pmnum: String,
    #[serde(rename = "Description")]
    #[tabled(rename = "Description", display_with = "display_text")]
    pub description: Option<String>,
    #[serde(rename = "ComplexityScore")]
    #[tabled(rename = "ComplexityScore", display_with = "display_two_decimals")]
    pub complexity_score: Option<f64>,
    #[serde(rename = "TotalPlannedHours")]
    #[tabled(rename = "TotalPlannedHours", display_with = "display_hours")]
    pub planned_hours: f64,
    #[serde(rename = "TaskCount")]
    #[tabled(rename = "TaskCount", display_with = "display_opt_hours")]
    pub task_count: Option<f64>,
    #[serde(rename = "JobType")]
    #[tabled(rename = "JobType", display_with = "display_text")]
    pub job_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct IntervalComplexityRow {
    #[serde(rename = "Interval")]
    #[tabled(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "AvgComplexity")]
    #[tabled(rename = "AvgComplexity", display_with = "display_two_decimals")]
    pub avg_complexity: Option<f64>,
    #[serde(rename = "PmCount")]
    #[tabled(rename = "PmCount")]
    pub pm_count: usize,
    #[serde(rename = "TotalHours")]
    #[tabled(rename = "TotalHours", display_with = "display_hours")]
    pub total_hours: f64,
    #[serde(rename = "HoursPerPm")]
    #[tabled(rename = "HoursPerPm", display_with = "display_one_decimal")]
    pub hours_per_pm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct BottleneckMonth {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "TotalHours")]
    #[tabled(rename = "TotalHours", display_with = "display_hours")]
    pub total_hours: f64,
    #[serde(rename = "TotalLaborers")]
    #[tabled(rename = "TotalLaborers", display_with = "display_hours")]
    pub total_laborers: f64,
    #[serde(rename = "PmCount")]
    #[tabled(rename = "PmCount")]
    pub pm_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct IntervalBreakdownRow {
    #[serde(rename = "Interval")]
    #[tabled(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "UniquePms")]
    #[tabled(rename = "UniquePms")]
    pub unique_pms: usize,
    #[serde(rename = "Occurrences")]
    #[tabled(rename = "Occurrences")]
    pub occurrences: usize,
    #[serde(rename = "TotalHours")]
    #[tabled(rename = "TotalHours", display_with = "display_hours")]
    pub total_hours: f64,
    #[serde(rename = "TotalLaborers")]
    #[tabled(rename = "TotalLaborers", display_with = "display_hours")]
    pub total_laborers: f64,
    #[serde(rename = "AvgComplexity")]
    #[tabled(rename = "AvgComplexity", display_with = "display_two_decimals")]
    pub avg_complexity: Option<f64>,
    #[serde(rename = "AvgTasks")]
    #[tabled(rename = "AvgTasks", display_with = "display_one_decimal")]
    pub avg_tasks: Option<f64>,
    #[serde(rename = "HoursPerPm")]
    #[tabled(rename = "HoursPerPm", display_with = "display_one_decimal")]
    pub hours_per_pm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DetailRow {
    #[serde(rename = "PMNUM")]
    #[tabled(rename = "PMNUM")]
    pub pmnum: String,
    #[serde(rename = "DueDate")]
    #[tabled(rename = "DueDate")]
    pub due_date: String,
    #[serde(rename = "Description")]
    #[tabled(rename = "Description")]
    pub description: String,
    #[serde(rename = "Craft")]
    #[tabled(rename = "Craft", display_with = "display_text")]
    pub craft: Option<String>,
    #[serde(rename = "Location")]
    #[tabled(rename = "Location", display_with = "display_text")]
    pub location: Option<String>,
    #[serde(rename = "Interval")]
    #[tabled(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "TotalLaborHrs")]
    #[tabled(rename = "TotalLaborHrs", display_with = "display_one_decimal")]
    pub total_hours: Option<f64>,
    #[serde(rename = "Complexity")]
    #[tabled(rename = "Complexity", display_with = "display_text")]
    pub complexity_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentDeepDive {
    pub department: String,
    pub kpis: DepartmentKpis,
    pub available_crafts: Vec<String>,
    pub monthly_by_craft: Vec<SeriesPoint>,
    pub location_column: LocationColumn,
    pub locations: Vec<LocationRow>,
    pub job_types: Vec<CategoryCount>,
    pub complexity_levels: Vec<CategoryCount>,
    pub interval_distribution: Vec<CategoryCount>,
    pub top_complex_pms: Vec<ComplexPmRow>,
    pub interval_complexity: Vec<IntervalComplexityRow>,
    pub monthly_by_interval: Vec<SeriesPoint>,
    pub bottleneck_months: Vec<BottleneckMonth>,
    pub interval_breakdown: Vec<IntervalBreakdownRow>,
    pub detail: Vec<DetailRow>,
}

impl DepartmentDeepDive {
    pub fn is_empty(&self) -> bool {
        self.kpis.pm_count == 0
    }
}

pub fn department_deep_dive(ds: &Dataset, sel: &DepartmentSelection) -> DepartmentDeepDive {
    let dept_rows = sel.department_filter().apply(ds.forecast());
    let rows = sel.craft_filter().apply(ds.forecast());
    debug!(
        department = %sel.department,
        department_rows = dept_rows.len(),
        selected_rows = rows.len(),
        "department view"
    );

    let total_hours = total(&dept_rows, Column::TotalLaborHrs);
    let pm_count = distinct_count(&dept_rows, Column::PmNum);
    let kpis = DepartmentKpis {
        total_hours,
        pm_count,
        mean_complexity: average(&dept_rows, Column::ComplexityScore),
        primary_craft: primary(&dept_rows, Column::LaborCraft),
        hours_per_pm: per_pm(total_hours, pm_count),
    };

    let location_column = ds.locations().column_for(&sel.department);
    let level_labels: Vec<&str> = ComplexityLevel::ALL.iter().map(|l| l.label()).collect();

    DepartmentDeepDive {
        department: sel.department.clone(),
        kpis,
        available_crafts: crate::dataset::distinct(&dept_rows, Column::LaborCraft),
        monthly_by_craft: stacked_series(
            &rows,
            Column::Month,
            Column::LaborCraft,
            Column::TotalLaborHrs,
        ),
        location_column,
        locations: location_summary(&rows, location_column),
        job_types: category_counts(&dept_rows, Column::JobType),
        complexity_levels: ordered_counts(&dept_rows, Column::ComplexityLevel, &level_labels),
        interval_distribution: category_counts(&dept_rows, Column::IntervalCategory),
        top_complex_pms: top_complex_pms(&dept_rows),
        interval_complexity: interval_complexity(&rows),
        monthly_by_interval: stacked_series(
            &rows,
            Column::Month,
            Column::IntervalCategory,
            sel.metric.column(),
        ),
        bottleneck_months: bottleneck_months(&rows),
        interval_breakdown: interval_breakdown(&rows),
        detail: detail_rows(&rows, sel.month.as_deref(), location_column),
    }
}

fn location_summary(rows: &[&ForecastRecord], column: LocationColumn) -> Vec<LocationRow> {
    let key = column.column();
    aggregate(
        rows.iter().copied(),
        &[key],
        &[
            Reduce::new(Column::PmNum, Reduction::CountDistinct),
            Reduce::new(Column::CountKey, Reduction::Count),
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
            Reduce::new(Column::TotalLaborHrs, Reduction::Sum),
        ],
    )
    .retain(|g| {
        g.number_or_zero(Column::PlannedLaborHrs) > 0.0
            || g.number_or_zero(Column::TotalLaborHrs) > 0.0
    })
    .sort_desc(Column::CountKey)
    .rows
    .iter()
    .map(|g| LocationRow {
        location: g.label(key),
        unique_pms: g.count(Column::PmNum),
        occurrences: g.count(Column::CountKey),
        planned_hours: g.number_or_zero(Column::PlannedLaborHrs),
        total_hours: g.number_or_zero(Column::TotalLaborHrs),
    })
    .collect()
}

fn top_complex_pms(rows: &[&ForecastRecord]) -> Vec<ComplexPmRow> {
    aggregate(
        rows.iter().copied(),
        &[Column::PmNum],
        &[
            Reduce::new(Column::Description, Reduction::First),
            Reduce::new(Column::ComplexityScore, Reduction::Mean),
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
            Reduce::new(Column::TaskCount, Reduction::First),
            Reduce::new(Column::JobType, Reduction::First),
        ],
    )
    .top_n(Column::ComplexityScore, TOP_COMPLEX_PMS)
    .rows
    .iter()
    .map(|g| ComplexPmRow {
        pmnum: g.label(Column::PmNum),
        description: g.text(Column::Description).map(str::to_string),
        complexity_score: g.number(Column::ComplexityScore),
        planned_hours: g.number_or_zero(Column::PlannedLaborHrs),
        task_count: g.number(Column::TaskCount),
        job_type: g.text(Column::JobType).map(str::to_string),
    })
    .collect()
}

fn interval_complexity(rows: &[&ForecastRecord]) -> Vec<IntervalComplexityRow> {
    aggregate(
        rows.iter().copied(),
        &[Column::IntervalCategory],
        &[
            Reduce::new(Column::ComplexityScore, Reduction::Mean),
            Reduce::new(Column::PmNum, Reduction::CountDistinct),
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
        ],
    )
    .sort_desc(Column::ComplexityScore)
    .rows
    .iter()
    .map(|g| {
        let hours = g.number_or_zero(Column::PlannedLaborHrs);
        let pms = g.count(Column::PmNum);
        IntervalComplexityRow {
            interval: g.label(Column::IntervalCategory),
            avg_complexity: g.number(Column::ComplexityScore),
            pm_count: pms,
            total_hours: hours,
            hours_per_pm: per_pm(Some(hours), pms),
        }
    })
    .collect()
}

fn month_totals(rows: &[&ForecastRecord]) -> Vec<GroupedRow> {
    aggregate(
        rows.iter().copied(),
        &[Column::Month],
        &[
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
            Reduce::new(Column::PlannedLaborers, Reduction::Sum),
            Reduce::new(Column::PmNum, Reduction::CountDistinct),
        ],
    )
    .top_n(Column::PlannedLaborHrs, BOTTLENECK_MONTHS)
    .rows
}

fn bottleneck_months(rows: &[&ForecastRecord]) -> Vec<BottleneckMonth> {
    month_totals(rows)
        .iter()
        .map(|g| BottleneckMonth {
            month: g.label(Column::Month),
            total_hours: g.number_or_zero(Column::PlannedLaborHrs),
            total_laborers: g.number_or_zero(Column::PlannedLaborers),
            pm_count: g.count(Column::PmNum),
        })
        .collect()
}

fn interval_breakdown(rows: &[&ForecastRecord]) -> Vec<IntervalBreakdownRow> {
    aggregate(
        rows.iter().copied(),
        &[Column::IntervalCategory],
        &[
            Reduce::new(Column::PmNum, Reduction::CountDistinct),
            Reduce::new(Column::CountKey, Reduction::Count),
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
            Reduce::new(Column::PlannedLaborers, Reduction::Sum),
            Reduce::new(Column::ComplexityScore, Reduction::Mean),
            Reduce::new(Column::TaskCount, Reduction::Mean),
        ],
    )
    .sort_desc(Column::PlannedLaborHrs)
    .rows
    .iter()
    .map(|g| {
        let hours = g.number_or_zero(Column::PlannedLaborHrs);
        let pms = g.count(Column::PmNum);
        IntervalBreakdownRow {
            interval: g.label(Column::IntervalCategory),
            unique_pms: pms,
            occurrences: g.count(Column::CountKey),
            total_hours: hours,
            total_laborers: g.number_or_zero(Column::PlannedLaborers),
            avg_complexity: g.number(Column::ComplexityScore),
            avg_tasks: g.number(Column::TaskCount),
            hours_per_pm: per_pm(Some(hours), pms),
        }
    })
    .collect()
}

fn detail_rows(
    rows: &[&ForecastRecord],
    month: Option<&str>,
    location: LocationColumn,
) -> Vec<DetailRow> {
    rows.iter()
        .filter(|r| month.map_or(true, |m| r.month == m))
        .map(|r| DetailRow {
            pmnum: r.pmnum.clone(),
            due_date: r.due_date.format("%Y-%m-%d").to_string(),
            description: r.description.clone(),
            craft: r.labor_craft.clone(),
            location: match location {
                LocationColumn::Line => r.line.clone(),
                LocationColumn::ZoneName => r.zone_name.clone(),
            },
            interval: r.interval_category.label().to_string(),
            total_hours: r.total_labor_hrs,
            complexity_level: r.complexity_level.map(|l| l.label().to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures;

    #[test]
    fn kpis_cover_the_whole_department() {
        let ds = fixtures::dataset();
        let mut sel = DepartmentSelection::new("PRESS");
        sel.crafts = Some(vec!["ELEC".to_string()]);
        let view = department_deep_dive(&ds, &sel);

        assert_eq!(view.kpis.total_hours, Some(40.0));
        assert_eq!(view.kpis.pm_count, 2);
        assert_eq!(view.kpis.primary_craft.as_deref(), Some("MECH"));
        assert_eq!(view.kpis.hours_per_pm, Some(20.0));
        assert_eq!(view.available_crafts, vec!["ELEC", "MECH"]);

        // craft selection narrows the time-based tables
        assert_eq!(view.monthly_by_craft.len(), 1);
        assert_eq!(view.monthly_by_craft[0].series, "ELEC");
        assert_eq!(view.detail.len(), 1);
    }

    #[test]
    fn complexity_levels_follow_enum_order() {
        let view = department_deep_dive(&fixtures::dataset(), &DepartmentSelection::new("PRESS"));
        let labels: Vec<&str> = view
            .complexity_levels
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(labels, vec!["Low", "Medium", "High", "Very High"]);
        let counts: Vec<usize> = view.complexity_levels.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![0, 1, 0, 2]);
    }

    #[test]
    fn top_complex_and_bottlenecks() {
        let view = department_deep_dive(&fixtures::dataset(), &DepartmentSelection::new("PRESS"));
        assert_eq!(view.top_complex_pms[0].pmnum, "PM1");
        assert_eq!(view.top_complex_pms[0].planned_hours, 20.0);
        assert_eq!(view.top_complex_pms[1].pmnum, "PM2");

        // January and February tie at 20 hours; January was seen first
        let months: Vec<&str> = view
            .bottleneck_months
            .iter()
            .map(|b| b.month.as_str())
            .collect();
        assert_eq!(months, vec!["2025-01", "2025-02"]);
        assert_eq!(view.bottleneck_months[0].pm_count, 1);
    }

    #[test]
    fn location_summary_uses_policy_column() {
        let view = department_deep_dive(&fixtures::dataset(), &DepartmentSelection::new("PAINT"));
        assert_eq!(view.location_column, LocationColumn::ZoneName);
        assert_eq!(view.locations.len(), 1);
        assert_eq!(view.locations[0].location, "Z1");
        assert_eq!(view.locations[0].occurrences, 2);
        assert_eq!(view.locations[0].total_hours, 12.0);
    }

    #[test]
    fn laborer_metric_switches_interval_stack() {
        let mut sel = DepartmentSelection::new("PRESS");
        sel.metric = WorkloadMetric::Laborers;
        let view = department_deep_dive(&fixtures::dataset(), &sel);
        let jan_weekly = view
            .monthly_by_interval
            .iter()
            .find(|p| p.period == "2025-01" && p.series == "Weekly")
            .unwrap();
        assert_eq!(jan_weekly.value, 2.0);
    }

    #[test]
    fn month_detail_and_empty_selection() {
        let mut sel = DepartmentSelection::new("PRESS");
        sel.month = Some("2025-02".to_string());
        let view = department_deep_dive(&fixtures::dataset(), &sel);
        assert_eq!(view.detail.len(), 1);
        assert_eq!(view.detail[0].pmnum, "PM2");

        let view = department_deep_dive(&fixtures::dataset(), &DepartmentSelection::new("NOPE"));
        assert!(view.is_empty());
        assert_eq!(view.kpis.total_hours, None);
        assert_eq!(view.kpis.mean_complexity, None);
        assert_eq!(view.kpis.primary_craft, None);
        assert_eq!(view.kpis.hours_per_pm, None);
        assert!(view.bottleneck_months.is_empty());
    }
}
