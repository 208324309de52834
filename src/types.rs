use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Complexity bucket of a PM, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl ComplexityLevel {
    pub const ALL: [ComplexityLevel; 4] = [
        ComplexityLevel::Low,
        ComplexityLevel::Medium,
        ComplexityLevel::High,
        ComplexityLevel::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ComplexityLevel::Low => "Low",
            ComplexityLevel::Medium => "Medium",
            ComplexityLevel::High => "High",
            ComplexityLevel::VeryHigh => "Very High",
        }
    }

    pub fn parse_label(s: &str) -> Option<Self> {
        let norm = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|level| normalize_label(level.label()) == norm)
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maintenance frequency bucket, ordered from most to least frequent.
/// `Unknown` sorts last and absorbs anything that cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntervalCategory {
    Daily,
    Weekly,
    #[serde(rename = "Bi-Weekly")]
    BiWeekly,
    Monthly,
    Quarterly,
    #[serde(rename = "Semi-Annual")]
    SemiAnnual,
    Annual,
    #[serde(rename = "Multi-Year")]
    MultiYear,
    Unknown,
}

impl IntervalCategory {
    pub const ALL: [IntervalCategory; 9] = [
        IntervalCategory::Daily,
        IntervalCategory::Weekly,
        IntervalCategory::BiWeekly,
        IntervalCategory::Monthly,
        IntervalCategory::Quarterly,
        IntervalCategory::SemiAnnual,
        IntervalCategory::Annual,
        IntervalCategory::MultiYear,
        IntervalCategory::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            IntervalCategory::Daily => "Daily",
            IntervalCategory::Weekly => "Weekly",
            IntervalCategory::BiWeekly => "Bi-Weekly",
            IntervalCategory::Monthly => "Monthly",
            IntervalCategory::Quarterly => "Quarterly",
            IntervalCategory::SemiAnnual => "Semi-Annual",
            IntervalCategory::Annual => "Annual",
            IntervalCategory::MultiYear => "Multi-Year",
            IntervalCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for IntervalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Execution quality, ordered best first. `NoData` marks groupings that
/// were never scheduled in the history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceTier {
    Excellent,
    Acceptable,
    #[serde(rename = "At Risk")]
    AtRisk,
    Failing,
    #[serde(rename = "No Data")]
    NoData,
}

impl PerformanceTier {
    pub const ALL: [PerformanceTier; 5] = [
        PerformanceTier::Excellent,
        PerformanceTier::Acceptable,
        PerformanceTier::AtRisk,
        PerformanceTier::Failing,
        PerformanceTier::NoData,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "Excellent",
            PerformanceTier::Acceptable => "Acceptable",
            PerformanceTier::AtRisk => "At Risk",
            PerformanceTier::Failing => "Failing",
            PerformanceTier::NoData => "No Data",
        }
    }

    pub fn parse_label(s: &str) -> Option<Self> {
        let norm = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|tier| normalize_label(tier.label()) == norm)
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeType {
    #[serde(rename = "ASSET")]
    Asset,
    #[serde(rename = "LOCATION")]
    Location,
    #[serde(rename = "OTHER")]
    Other,
}

impl ScopeType {
    pub fn from_raw(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("ASSET") => ScopeType::Asset,
            Some("LOCATION") => ScopeType::Location,
            _ => ScopeType::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScopeType::Asset => "ASSET",
            ScopeType::Location => "LOCATION",
            ScopeType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Lower-case and drop separators so "very high", "Very-High" and "VERY_HIGH"
// all compare equal.
fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Raw CSV rows. Everything is read as text and cleaned by the loader.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RawForecastRow {
    #[serde(rename = "PMNUM", default)]
    pub pmnum: Option<String>,
    #[serde(rename = "COUNTKEY", default)]
    pub countkey: Option<String>,
    #[serde(rename = "PMDESCRIPTION", default)]
    pub description: Option<String>,
    #[serde(rename = "DEPT_NAME", default)]
    pub dept_name: Option<String>,
    #[serde(rename = "JOB_TYPE", default)]
    pub job_type: Option<String>,
    #[serde(rename = "PMSCOPETYPE", default)]
    pub scope_type: Option<String>,
    #[serde(rename = "LINE", default)]
    pub line: Option<String>,
    #[serde(rename = "ZONENAME", default)]
    pub zone_name: Option<String>,
    #[serde(rename = "LABOR_CRAFT", default)]
    pub labor_craft: Option<String>,
    #[serde(rename = "DUE_DATE", default)]
    pub due_date: Option<String>,
    #[serde(rename = "PLANNED_LABOR_HRS", default)]
    pub planned_labor_hrs: Option<String>,
    #[serde(rename = "PLANNED_LABORERS", default)]
    pub planned_laborers: Option<String>,
    #[serde(rename = "TASK_COUNT", default)]
    pub task_count: Option<String>,
    #[serde(rename = "total_labor_hrs", default)]
    pub total_labor_hrs: Option<String>,
    #[serde(rename = "FREQUENCY", default)]
    pub frequency: Option<String>,
    #[serde(rename = "interval_category", default)]
    pub interval_category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawExecutionRow {
    #[serde(rename = "PMNUM", default)]
    pub pmnum: Option<String>,
    #[serde(rename = "DEPT_NAME", default)]
    pub dept_name: Option<String>,
    #[serde(rename = "FREQUENCY", default)]
    pub frequency: Option<String>,
    #[serde(rename = "interval_category", default)]
    pub interval_category: Option<String>,
    #[serde(rename = "JOB_TYPE", default)]
    pub job_type: Option<String>,
    #[serde(rename = "LABOR_CRAFT", default)]
    pub labor_craft: Option<String>,
    #[serde(rename = "SCHEDULED_COUNT", default)]
    pub scheduled_count: Option<String>,
    #[serde(rename = "COMPLETED_COUNT", default)]
    pub completed_count: Option<String>,
    #[serde(rename = "ON_TIME_COUNT", default)]
    pub on_time_count: Option<String>,
    #[serde(rename = "completion_rate", default)]
    pub completion_rate: Option<String>,
    #[serde(rename = "on_time_rate", default)]
    pub on_time_rate: Option<String>,
    #[serde(rename = "AVG_PLANNED_HRS", default)]
    pub avg_planned_hrs: Option<String>,
    #[serde(rename = "AVG_ACTUAL_HRS", default)]
    pub avg_actual_hrs: Option<String>,
    #[serde(rename = "DUE_MONTH", default)]
    pub due_month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawWorkOrderRow {
    #[serde(rename = "PMNUM", default)]
    pub pmnum: Option<String>,
    #[serde(rename = "DEPT_NAME", default)]
    pub dept_name: Option<String>,
    #[serde(rename = "FREQUENCY", default)]
    pub frequency: Option<String>,
    #[serde(rename = "interval_category", default)]
    pub interval_category: Option<String>,
    #[serde(rename = "JOB_TYPE", default)]
    pub job_type: Option<String>,
    #[serde(rename = "LABOR_CRAFT", default)]
    pub labor_craft: Option<String>,
    #[serde(rename = "DUE_DATE", default)]
    pub due_date: Option<String>,
    #[serde(rename = "COMPLETED_DATE", default)]
    pub completed_date: Option<String>,
    #[serde(rename = "PLANNED_HRS", default)]
    pub planned_hrs: Option<String>,
    #[serde(rename = "ACTUAL_HRS", default)]
    pub actual_hrs: Option<String>,
}

// ---------------------------------------------------------------------------
// Clean records
// ---------------------------------------------------------------------------

/// One planned occurrence of a PM for one craft.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub pmnum: String,
    pub countkey: String,
    pub description: String,
    pub department: Option<String>,
    pub job_type: Option<String>,
    pub scope_type: ScopeType,
    pub line: Option<String>,
    pub zone_name: Option<String>,
    pub labor_craft: Option<String>,
    pub due_date: NaiveDate,
    /// `YYYY-MM`
    pub month: String,
    /// `YYYY-Www`, Sunday-start week number.
    pub week: String,
    pub planned_labor_hrs: Option<f64>,
    pub planned_laborers: Option<f64>,
    pub task_count: Option<f64>,
    pub total_labor_hrs: Option<f64>,
    pub complexity_score: Option<f64>,
    pub complexity_level: Option<ComplexityLevel>,
    pub interval_category: IntervalCategory,
}

/// Planned-vs-actual performance for one PM grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub pmnum: String,
    pub department: Option<String>,
    pub interval_category: IntervalCategory,
    pub job_type: Option<String>,
    pub labor_craft: Option<String>,
    pub scheduled_count: Option<u32>,
    pub completed_count: Option<u32>,
    pub on_time_count: Option<u32>,
    pub avg_planned_hrs: Option<f64>,
    pub avg_actual_hrs: Option<f64>,
    /// `YYYY-MM`
    pub due_month: Option<String>,
    pub completion_rate: Option<f64>,
    pub on_time_rate: Option<f64>,
    pub hour_deviation_pct: Option<f64>,
    pub performance_tier: PerformanceTier,
}

/// A single historical work order raised from a PM.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderInstance {
    pub pmnum: String,
    pub department: Option<String>,
    pub interval_category: IntervalCategory,
    pub job_type: Option<String>,
    pub labor_craft: Option<String>,
    pub due_date: NaiveDate,
    pub completed_date: Option<NaiveDate>,
    pub planned_hrs: Option<f64>,
    pub actual_hrs: Option<f64>,
}
