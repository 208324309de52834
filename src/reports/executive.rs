// Plant-wide overview of the forecast.
use super::{
    average, category_counts, distinct_count, per_pm, stacked_series, total, CategoryCount,
    SeriesPoint,
};
use crate::aggregate::{aggregate, Column, Reduce, Reduction};
use crate::dataset::Dataset;
use crate::types::ForecastRecord;
use crate::util::{display_hours, display_one_decimal, display_text, display_two_decimals};
use serde::Serialize;
use tabled::Tabled;

const TOP_JOB_TYPES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveKpis {
    pub total_planned_hours: Option<f64>,
    pub distinct_pms: usize,
    pub mean_complexity: Option<f64>,
    pub departments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DepartmentComparisonRow {
    #[serde(rename = "Department")]
    #[tabled(rename = "Department")]
    pub department: String,
    #[serde(rename = "TotalHours")]
    #[tabled(rename = "TotalHours", display_with = "display_hours")]
    pub total_hours: f64,
    #[serde(rename = "PmCount")]
    #[tabled(rename = "PmCount")]
    pub pm_count: usize,
    #[serde(rename = "AvgComplexity")]
    #[tabled(rename = "AvgComplexity", display_with = "display_two_decimals")]
    pub avg_complexity: Option<f64>,
    #[serde(rename = "PrimaryCraft")]
    #[tabled(rename = "PrimaryCraft", display_with = "display_text")]
    pub primary_craft: Option<String>,
    #[serde(rename = "AvgHoursPerPm")]
    #[tabled(rename = "AvgHoursPerPm", display_with = "display_one_decimal")]
    pub hours_per_pm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveOverview {
    pub kpis: ExecutiveKpis,
    pub monthly_by_department: Vec<SeriesPoint>,
    pub departments: Vec<DepartmentComparisonRow>,
    pub scope_distribution: Vec<CategoryCount>,
    pub top_job_types: Vec<CategoryCount>,
}

impl ExecutiveOverview {
    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }
}

pub fn executive_overview(ds: &Dataset) -> ExecutiveOverview {
    let rows: Vec<&ForecastRecord> = ds.forecast().iter().collect();

    let kpis = ExecutiveKpis {
        total_planned_hours: total(&rows, Column::PlannedLaborHrs),
        distinct_pms: distinct_count(&rows, Column::PmNum),
        mean_complexity: average(&rows, Column::ComplexityScore),
        departments: distinct_count(&rows, Column::Department),
    };

    let departments = aggregate(
        rows.iter().copied(),
        &[Column::Department],
        &[
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
            Reduce::new(Column::PmNum, Reduction::CountDistinct),
            Reduce::new(Column::ComplexityScore, Reduction::Mean),
            Reduce::new(Column::LaborCraft, Reduction::Mode),
        ],
    )
    .sort_desc(Column::PlannedLaborHrs)
    .rows
    .iter()
    .map(|g| {
        let hours = g.number_or_zero(Column::PlannedLaborHrs);
        let pms = g.count(Column::PmNum);
        DepartmentComparisonRow {
            department: g.label(Column::Department),
            total_hours: hours,
            pm_count: pms,
            avg_complexity: g.number(Column::ComplexityScore),
            primary_craft: g.text(Column::LaborCraft).map(str::to_string),
            hours_per_pm: per_pm(Some(hours), pms),
        }
    })
    .collect();

    let mut top_job_types = category_counts(&rows, Column::JobType);
    top_job_types.truncate(TOP_JOB_TYPES);

    ExecutiveOverview {
        kpis,
        monthly_by_department: stacked_series(
            &rows,
            Column::Month,
            Column::Department,
            Column::PlannedLaborHrs,
        ),
        departments,
        scope_distribution: category_counts(&rows, Column::ScopeType),
        top_job_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::default_overrides;
    use crate::reports::fixtures;

    #[test]
    fn kpis_and_department_ranking() {
        let view = executive_overview(&fixtures::dataset());
        assert_eq!(view.kpis.total_planned_hours, Some(52.0));
        assert_eq!(view.kpis.distinct_pms, 4);
        assert_eq!(view.kpis.departments, 2);
        let mean = view.kpis.mean_complexity.unwrap();
        assert!((mean - 0.52).abs() < 1e-9);

        assert_eq!(view.departments[0].department, "PRESS");
        assert_eq!(view.departments[0].total_hours, 40.0);
        assert_eq!(view.departments[0].pm_count, 2);
        assert_eq!(view.departments[0].primary_craft.as_deref(), Some("MECH"));
        assert_eq!(view.departments[0].hours_per_pm, Some(20.0));
        assert_eq!(view.departments[1].department, "PAINT");
    }

    #[test]
    fn monthly_series_is_in_month_order() {
        let view = executive_overview(&fixtures::dataset());
        let periods: Vec<&str> = view
            .monthly_by_department
            .iter()
            .map(|p| p.period.as_str())
            .collect();
        assert_eq!(periods, vec!["2025-01", "2025-01", "2025-02", "2025-03"]);
        assert_eq!(view.monthly_by_department[0].series, "PRESS");
        assert_eq!(view.monthly_by_department[0].value, 20.0);
    }

    #[test]
    fn scope_shares_add_up() {
        let view = executive_overview(&fixtures::dataset());
        let total: usize = view.scope_distribution.iter().map(|c| c.count).sum();
        assert_eq!(total, 5);
        assert_eq!(view.scope_distribution[0].category, "ASSET");
        assert_eq!(view.scope_distribution[0].share, Some(0.6));
    }

    #[test]
    fn empty_forecast_has_no_kpis() {
        let ds = Dataset::new(Vec::new(), Vec::new(), &default_overrides());
        let view = executive_overview(&ds);
        assert!(view.is_empty());
        assert_eq!(view.kpis.total_planned_hours, None);
        assert_eq!(view.kpis.mean_complexity, None);
        assert_eq!(view.kpis.distinct_pms, 0);
    }
}
