// Cross-department patterns over the full forecast.
use super::{category_counts, ordered_counts, CategoryCount};
use crate::aggregate::{aggregate, pivot, Column, PivotTable, Reduce, Reduction};
use crate::dataset::Dataset;
use crate::types::{ComplexityLevel, ForecastRecord, ScopeType};
use crate::util::{display_hours, display_one_decimal, display_two_decimals, ratio};
use serde::Serialize;
use tabled::Tabled;

const TOP_JOB_TYPES: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct IntervalSummaryRow {
    #[serde(rename = "IntervalCategory")]
    #[tabled(rename = "IntervalCategory")]
    pub interval: String,
    #[serde(rename = "PmCount")]
    #[tabled(rename = "PmCount")]
    pub pm_count: usize,
    #[serde(rename = "TotalHours")]
    #[tabled(rename = "TotalHours", display_with = "display_hours")]
    pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct AssetFocusRow {
    #[serde(rename = "Department")]
    #[tabled(rename = "Department")]
    pub department: String,
    #[serde(rename = "Asset")]
    #[tabled(rename = "Asset")]
    pub asset: usize,
    #[serde(rename = "Location")]
    #[tabled(rename = "Location")]
    pub location: usize,
    /// Asset share of asset plus location PMs, in percent.
    #[serde(rename = "AssetPct")]
    #[tabled(rename = "AssetPct", display_with = "display_one_decimal")]
    pub asset_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DepartmentComplexityRow {
    #[serde(rename = "Department")]
    #[tabled(rename = "Department")]
    pub department: String,
    #[serde(rename = "AvgComplexityScore")]
    #[tabled(rename = "AvgComplexityScore", display_with = "display_two_decimals")]
    pub avg_complexity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct JobTypeRow {
    #[serde(rename = "JobType")]
    #[tabled(rename = "JobType")]
    pub job_type: String,
    #[serde(rename = "PmCount")]
    #[tabled(rename = "PmCount")]
    pub pm_count: usize,
    #[serde(rename = "TotalHours")]
    #[tabled(rename = "TotalHours", display_with = "display_hours")]
    pub total_hours: f64,
    #[serde(rename = "AvgComplexity")]
    #[tabled(rename = "AvgComplexity", display_with = "display_two_decimals")]
    pub avg_complexity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationalInsights {
    pub intervals: Vec<IntervalSummaryRow>,
    pub craft_by_department: PivotTable,
    pub scope_distribution: Vec<CategoryCount>,
    pub asset_focus: Vec<AssetFocusRow>,
    pub complexity_by_department: Vec<DepartmentComplexityRow>,
    pub complexity_levels: Vec<CategoryCount>,
    pub job_types: Vec<JobTypeRow>,
}

impl OperationalInsights {
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

pub fn operational_insights(ds: &Dataset) -> OperationalInsights {
    let rows: Vec<&ForecastRecord> = ds.forecast().iter().collect();
    let level_labels: Vec<&str> = ComplexityLevel::ALL.iter().map(|l| l.label()).collect();

    let intervals = aggregate(
        rows.iter().copied(),
        &[Column::IntervalCategory],
        &[
            Reduce::new(Column::CountKey, Reduction::Count),
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
        ],
    )
    .sort_desc(Column::CountKey)
    .rows
    .iter()
    .map(|g| IntervalSummaryRow {
        interval: g.label(Column::IntervalCategory),
        pm_count: g.count(Column::CountKey),
        total_hours: g.number_or_zero(Column::PlannedLaborHrs),
    })
    .collect();

    let complexity_by_department = aggregate(
        rows.iter().copied(),
        &[Column::Department],
        &[Reduce::new(Column::ComplexityScore, Reduction::Mean)],
    )
    .sort_desc(Column::ComplexityScore)
    .rows
    .iter()
    .map(|g| DepartmentComplexityRow {
        department: g.label(Column::Department),
        avg_complexity: g.number(Column::ComplexityScore),
    })
    .collect();

    let job_types = aggregate(
        rows.iter().copied(),
        &[Column::JobType],
        &[
            Reduce::new(Column::PmNum, Reduction::CountDistinct),
            Reduce::new(Column::PlannedLaborHrs, Reduction::Sum),
            Reduce::new(Column::ComplexityScore, Reduction::Mean),
        ],
    )
    .top_n(Column::PlannedLaborHrs, TOP_JOB_TYPES)
    .rows
    .iter()
    .map(|g| JobTypeRow {
        job_type: g.label(Column::JobType),
        pm_count: g.count(Column::PmNum),
        total_hours: g.number_or_zero(Column::PlannedLaborHrs),
        avg_complexity: g.number(Column::ComplexityScore),
    })
    .collect();

    OperationalInsights {
        intervals,
        craft_by_department: pivot(
            rows.iter().copied(),
            Column::LaborCraft,
            Column::Department,
            Column::PlannedLaborHrs,
        ),
        scope_distribution: category_counts(&rows, Column::ScopeType),
        asset_focus: asset_focus(&rows),
        complexity_by_department,
        complexity_levels: ordered_counts(&rows, Column::ComplexityLevel, &level_labels),
        job_types,
    }
}

/// Scope counts per department, most asset-focused first. Departments with
/// neither asset nor location PMs have no percentage and sort last.
fn asset_focus(rows: &[&ForecastRecord]) -> Vec<AssetFocusRow> {
    let scoped = aggregate(
        rows.iter().copied(),
        &[Column::Department, Column::ScopeType],
        &[Reduce::new(Column::CountKey, Reduction::Count)],
    );
    let mut out: Vec<AssetFocusRow> = Vec::new();
    for g in &scoped.rows {
        let dept = g.label(Column::Department);
        let idx = match out.iter().position(|r| r.department == dept) {
            Some(i) => i,
            None => {
                out.push(AssetFocusRow {
                    department: dept,
                    asset: 0,
                    location: 0,
                    asset_pct: None,
                });
                out.len() - 1
            }
        };
        let n = g.count(Column::CountKey);
        let scope = g.label(Column::ScopeType);
        if scope == ScopeType::Asset.label() {
            out[idx].asset += n;
        } else if scope == ScopeType::Location.label() {
            out[idx].location += n;
        }
    }
    for r in &mut out {
        r.asset_pct = ratio(r.asset as f64, (r.asset + r.location) as f64).map(|p| p * 100.0);
    }
    out.sort_by(|a, b| match (a.asset_pct, b.asset_pct) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    out
}
