// Workload calendar: where the planned hours fall in time.
use super::{distinct_count, period_totals, total, PeriodHours};
use crate::aggregate::{aggregate, pivot, Column, Filter, PivotTable, Reduce, Reduction};
use crate::dataset::Dataset;
use crate::types::{ComplexityLevel, ForecastRecord};
use crate::util::display_hours;
use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

const MAX_WEEKS: usize = 52;
const BUSIEST_MONTHS: usize = 3;

/// Every field narrows the selection; `None` means no restriction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalendarFilter {
    pub department: Option<String>,
    pub craft: Option<String>,
    pub complexity: Option<ComplexityLevel>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl CalendarFilter {
    pub fn to_filter(&self) -> Filter {
        let mut f = Filter::new();
        if let Some(dept) = &self.department {
            f = f.equals(Column::Department, dept.clone());
        }
        if let Some(craft) = &self.craft {
            f = f.equals(Column::LaborCraft, craft.clone());
        }
        if let Some(level) = self.complexity {
            f = f.equals(Column::ComplexityLevel, level.label());
        }
        if self.start.is_some() || self.end.is_some() {
            f = f.due_between(self.start, self.end);
        }
        f
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarKpis {
    pub total_planned_hours: Option<f64>,
    pub pm_count: usize,
    pub peak_month: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthStatsRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "TotalHours")]
    #[tabled(rename = "TotalHours", display_with = "display_hours")]
    pub total_hours: f64,
    #[serde(rename = "PmCount")]
    #[tabled(rename = "PmCount")]
    pub pm_count: usize,
    #[serde(rename = "UniqueCrafts")]
    #[tabled(rename = "UniqueCrafts")]
    pub unique_crafts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadCalendar {
    pub kpis: CalendarKpis,
    pub monthly: Vec<PeriodHours>,
    pub weekly: Vec<PeriodHours>,
    pub department_by_month: PivotTable,
    /// Busiest month first.
    pub monthly_stats: Vec<MonthStatsRow>,
}

impl WorkloadCalendar {
    pub fn is_empty(&self) -> bool {
        self.monthly.is_empty()
    }

    pub fn busiest_months(&self) -> &[MonthStatsRow] {
        let n = self.monthly_stats.len().min(BUSIEST_MONTHS);
        &self.monthly_stats[..n]
    }
}

/// First month holding the largest total.
fn peak(monthly: &[PeriodHours]) -> Option<String> {
    let mut best: Option<&PeriodHours> = None;
    for m in monthly {
        if best.map_or(true, |b| m.hours > b.hours) {
            best = Some(m);
        }
    }
    best.map(|b| b.period.clone())
}

pub fn workload_calendar(ds: &Dataset, filter: &CalendarFilter) -> WorkloadCalendar {
    let rows: Vec<&ForecastRecord> = filter.to_filter().apply(ds.forecast());

    let monthly = period_totals(&rows, Column::Month, Column::PlannedLaborHrs);
    let mut weekly = period_totals(&rows, Column::Week, Column::PlannedLaborHrs);
    weekly.truncate(MAX_WEEKS);

    let monthly_stats = aggregate(
        rows.iter().copied(),
        &[Column::Month],
        &[
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
            Reduce::new(Column::PmNum, Reduction::CountDistinct),
            Reduce::new(Column::LaborCraft, Reduction::CountDistinct),
        ],
    )
    .sort_by_label(Column::Month)
    .sort_desc(Column::PlannedLaborHrs)
    .rows
    .iter()
    .map(|g| MonthStatsRow {
        month: g.label(Column::Month),
        total_hours: g.number_or_zero(Column::PlannedLaborHrs),
        pm_count: g.count(Column::PmNum),
        unique_crafts: g.count(Column::LaborCraft),
    })
    .collect();

    WorkloadCalendar {
        kpis: CalendarKpis {
            total_planned_hours: total(&rows, Column::PlannedLaborHrs),
            pm_count: distinct_count(&rows, Column::PmNum),
            peak_month: peak(&monthly),
        },
        department_by_month: pivot(
            rows.iter().copied(),
            Column::Department,
            Column::Month,
            Column::PlannedLaborHrs,
        ),
        weekly,
        monthly,
        monthly_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures;

    #[test]
    fn peak_and_busiest_months() {
        let view = workload_calendar(&fixtures::dataset(), &CalendarFilter::default());
        assert_eq!(view.kpis.total_planned_hours, Some(52.0));
        assert_eq!(view.kpis.pm_count, 4);
        assert_eq!(view.kpis.peak_month.as_deref(), Some("2025-01"));

        let busiest: Vec<&str> = view.busiest_months().iter().map(|m| m.month.as_str()).collect();
        assert_eq!(busiest, vec!["2025-01", "2025-02", "2025-03"]);
        assert_eq!(view.monthly_stats[0].total_hours, 25.0);
        assert_eq!(view.monthly_stats[0].unique_crafts, 1);
        assert_eq!(view.monthly_stats[0].pm_count, 2);
    }

    #[test]
    fn pivot_is_zero_filled() {
        let view = workload_calendar(&fixtures::dataset(), &CalendarFilter::default());
        let p = &view.department_by_month;
        assert_eq!(p.row_labels, vec!["PAINT", "PRESS"]);
        assert_eq!(p.col_labels, vec!["2025-01", "2025-02", "2025-03"]);
        assert_eq!(p.get("PRESS", "2025-03"), Some(0.0));
        assert_eq!(p.get("PAINT", "2025-03"), Some(7.0));
    }

    #[test]
    fn filters_combine() {
        let filter = CalendarFilter {
            craft: Some("MECH".to_string()),
            complexity: Some(ComplexityLevel::VeryHigh),
            ..CalendarFilter::default()
        };
        let view = workload_calendar(&fixtures::dataset(), &filter);
        assert_eq!(view.kpis.total_planned_hours, Some(20.0));
        assert_eq!(view.weekly.len(), 2);

        let filter = CalendarFilter {
            start: NaiveDate::from_ymd_opt(2025, 2, 1),
            end: NaiveDate::from_ymd_opt(2025, 2, 28),
            ..CalendarFilter::default()
        };
        let view = workload_calendar(&fixtures::dataset(), &filter);
        assert_eq!(view.monthly.len(), 1);
        assert_eq!(view.monthly[0].period, "2025-02");
    }

    #[test]
    fn empty_selection_has_no_peak() {
        let filter = CalendarFilter {
            department: Some("NOPE".to_string()),
            ..CalendarFilter::default()
        };
        let view = workload_calendar(&fixtures::dataset(), &filter);
        assert!(view.is_empty());
        assert_eq!(view.kpis.peak_month, None);
        assert_eq!(view.kpis.total_planned_hours, None);
        assert!(view.department_by_month.is_empty());
        assert!(view.busiest_months().is_empty());
    }
}
