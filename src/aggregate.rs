//! Filter and group-by over in-memory tables.
//!
//! Every view has the same shape: narrow the rows with a [`Filter`], then
//! [`aggregate`] them by one or more categorical columns. Both steps are pure
//! and never touch the source table.
//!
//! Missing cells are skipped by every reduction. Group order is first-seen
//! order, and every sort in this module is stable, so ties in rankings keep
//! input order.

use crate::types::{ExecutionRecord, ForecastRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    PmNum,
    CountKey,
    Description,
    Department,
    JobType,
    ScopeType,
    Line,
    ZoneName,
    LaborCraft,
    Month,
    Week,
    DueMonth,
    ComplexityLevel,
    IntervalCategory,
    PerformanceTier,
    PlannedLaborHrs,
    PlannedLaborers,
    TaskCount,
    TotalLaborHrs,
    ComplexityScore,
    ScheduledCount,
    CompletedCount,
    OnTimeCount,
    AvgPlannedHrs,
    AvgActualHrs,
    CompletionRate,
    OnTimeRate,
    HourDeviationPct,
}

impl Column {
    /// Column header as it appears in the source files.
    pub fn name(&self) -> &'static str {
        match self {
            Column::PmNum => "PMNUM",
            Column::CountKey => "COUNTKEY",
            Column::Description => "PMDESCRIPTION",
            Column::Department => "DEPT_NAME",
            Column::JobType => "JOB_TYPE",
            Column::ScopeType => "PMSCOPETYPE",
            Column::Line => "LINE",
            Column::ZoneName => "ZONENAME",
            Column::LaborCraft => "LABOR_CRAFT",
            Column::Month => "MONTH",
            Column::Week => "YEAR_WEEK",
            Column::DueMonth => "DUE_MONTH",
            Column::ComplexityLevel => "complexity_level",
            Column::IntervalCategory => "interval_category",
            Column::PerformanceTier => "performance_tier",
            Column::PlannedLaborHrs => "PLANNED_LABOR_HRS",
            Column::PlannedLaborers => "PLANNED_LABORERS",
            Column::TaskCount => "TASK_COUNT",
            Column::TotalLaborHrs => "total_labor_hrs",
            Column::ComplexityScore => "complexity_score",
            Column::ScheduledCount => "SCHEDULED_COUNT",
            Column::CompletedCount => "COMPLETED_COUNT",
            Column::OnTimeCount => "ON_TIME_COUNT",
            Column::AvgPlannedHrs => "AVG_PLANNED_HRS",
            Column::AvgActualHrs => "AVG_ACTUAL_HRS",
            Column::CompletionRate => "completion_rate",
            Column::OnTimeRate => "on_time_rate",
            Column::HourDeviationPct => "hour_deviation_pct",
        }
    }

    /// The reduction a column gets wherever it is summarised.
    ///
    /// Hours, laborers and counts add up; scores, rates and task counts are
    /// averaged; PM numbers count distinct; occurrence keys count rows.
    /// Categorical columns report their most frequent value.
    pub fn default_reduction(&self) -> Reduction {
        match self {
            Column::PlannedLaborHrs
            | Column::PlannedLaborers
            | Column::TotalLaborHrs
            | Column::ScheduledCount
            | Column::CompletedCount
            | Column::OnTimeCount => Reduction::Sum,
            Column::ComplexityScore
            | Column::TaskCount
            | Column::AvgPlannedHrs
            | Column::AvgActualHrs
            | Column::CompletionRate
            | Column::OnTimeRate
            | Column::HourDeviationPct => Reduction::Mean,
            Column::PmNum => Reduction::CountDistinct,
            Column::CountKey => Reduction::Count,
            Column::Description => Reduction::First,
            _ => Reduction::Mode,
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    pub fn text(s: Option<&str>) -> Self {
        s.map_or(Value::Missing, |v| Value::Text(v.to_string()))
    }

    pub fn number(n: Option<f64>) -> Self {
        match n {
            Some(v) if v.is_finite() => Value::Number(v),
            _ => Value::Missing,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Text form used for grouping, distinct counts and predicates.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(v) => Some(v.to_string()),
            Value::Missing => None,
        }
    }
}

/// Column access for anything that can be filtered and aggregated.
pub trait Record {
    fn value(&self, column: Column) -> Value;

    fn due_date(&self) -> Option<NaiveDate> {
        None
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn value(&self, column: Column) -> Value {
        (**self).value(column)
    }

    fn due_date(&self) -> Option<NaiveDate> {
        (**self).due_date()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Column, String),
    /// Membership. An empty list matches nothing.
    OneOf(Column, Vec<String>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// A missing cell never satisfies a positive predicate, so it always
    /// lands on the negated side.
    pub fn matches<R: Record + ?Sized>(&self, row: &R) -> bool {
        match self {
            Predicate::Equals(col, expected) => {
                row.value(*col).key().is_some_and(|v| &v == expected)
            }
            Predicate::OneOf(col, options) => row
                .value(*col)
                .key()
                .is_some_and(|v| options.iter().any(|o| o == &v)),
            Predicate::Not(inner) => !inner.matches(row),
        }
    }

    pub fn negate(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

/// Inclusive date range; an open end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start.map_or(true, |s| d >= s) && self.end.map_or(true, |e| d <= e)
    }
}

/// Conjunction of predicates plus an optional due-date window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
    due_range: Option<DateRange>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn equals(self, column: Column, value: impl Into<String>) -> Self {
        self.with(Predicate::Equals(column, value.into()))
    }

    pub fn one_of<I, S>(self, column: Column, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(Predicate::OneOf(
            column,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn due_between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.due_range = Some(DateRange { start, end });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.due_range.is_none()
    }

    pub fn matches<R: Record + ?Sized>(&self, row: &R) -> bool {
        if let Some(range) = &self.due_range {
            match row.due_date() {
                Some(d) if range.contains(d) => {}
                _ => return false,
            }
        }
        self.predicates.iter().all(|p| p.matches(row))
    }

    /// Matching rows in input order.
    pub fn apply<'a, R, I>(&self, rows: I) -> Vec<&'a R>
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        rows.into_iter().filter(|r| self.matches(*r)).collect()
    }
}

/// Split rows into (matching, not matching); every row lands in exactly one.
pub fn partition<'a, R, I>(rows: I, predicate: &Predicate) -> (Vec<&'a R>, Vec<&'a R>)
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    rows.into_iter().partition(|r| predicate.matches(*r))
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Missing values contribute nothing; an all-missing group sums to 0.
    Sum,
    /// Missing when the group has no values.
    Mean,
    /// Number of present values.
    Count,
    CountDistinct,
    Min,
    Max,
    /// First present value.
    First,
    /// Most frequent present value; ties go to the first seen.
    Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reduce {
    pub column: Column,
    pub op: Reduction,
}

impl Reduce {
    pub fn new(column: Column, op: Reduction) -> Self {
        Self { column, op }
    }

    pub fn default_for(column: Column) -> Self {
        Self::new(column, column.default_reduction())
    }
}

enum Acc {
    Sum(f64),
    Mean(f64, usize),
    Count(usize),
    Distinct(HashSet<String>),
    Min(Option<f64>),
    Max(Option<f64>),
    First(Value),
    Mode(Vec<(String, usize)>, HashMap<String, usize>),
}

impl Acc {
    fn new(op: Reduction) -> Self {
        match op {
            Reduction::Sum => Acc::Sum(0.0),
            Reduction::Mean => Acc::Mean(0.0, 0),
            Reduction::Count => Acc::Count(0),
            Reduction::CountDistinct => Acc::Distinct(HashSet::new()),
            Reduction::Min => Acc::Min(None),
            Reduction::Max => Acc::Max(None),
            Reduction::First => Acc::First(Value::Missing),
            Reduction::Mode => Acc::Mode(Vec::new(), HashMap::new()),
        }
    }

    fn push(&mut self, v: Value) {
        if v.is_missing() {
            return;
        }
        match self {
            Acc::Sum(s) => {
                if let Some(x) = v.as_f64() {
                    *s += x;
                }
            }
            Acc::Mean(s, n) => {
                if let Some(x) = v.as_f64() {
                    *s += x;
                    *n += 1;
                }
            }
            Acc::Count(n) => *n += 1,
            Acc::Distinct(seen) => {
                if let Some(k) = v.key() {
                    seen.insert(k);
                }
            }
            Acc::Min(m) => {
                if let Some(x) = v.as_f64() {
                    *m = Some((*m).map_or(x, |cur| cur.min(x)));
                }
            }
            Acc::Max(m) => {
                if let Some(x) = v.as_f64() {
                    *m = Some((*m).map_or(x, |cur| cur.max(x)));
                }
            }
            Acc::First(first) => {
                if first.is_missing() {
                    *first = v;
                }
            }
            Acc::Mode(counts, index) => {
                if let Some(k) = v.key() {
                    match index.get(&k) {
                        Some(&i) => counts[i].1 += 1,
                        None => {
                            index.insert(k.clone(), counts.len());
                            counts.push((k, 1));
                        }
                    }
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Acc::Sum(s) => Value::Number(s),
            Acc::Mean(_, 0) => Value::Missing,
            Acc::Mean(s, n) => Value::Number(s / n as f64),
            Acc::Count(n) => Value::Number(n as f64),
            Acc::Distinct(seen) => Value::Number(seen.len() as f64),
            Acc::Min(m) | Acc::Max(m) => Value::number(m),
            Acc::First(v) => v,
            Acc::Mode(counts, _) => {
                let mut best: Option<(String, usize)> = None;
                for (k, n) in counts {
                    if best.as_ref().map_or(true, |(_, b)| n > *b) {
                        best = Some((k, n));
                    }
                }
                best.map_or(Value::Missing, |(k, _)| Value::Text(k))
            }
        }
    }
}

static MISSING_CELL: Value = Value::Missing;

/// One output row: group keys followed by reduced values.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    cells: Vec<(Column, Value)>,
}

impl GroupedRow {
    pub fn get(&self, column: Column) -> &Value {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
            .unwrap_or(&MISSING_CELL)
    }

    pub fn number(&self, column: Column) -> Option<f64> {
        self.get(column).as_f64()
    }

    /// Like [`number`](Self::number) for sums and counts, where an absent
    /// cell means nothing was added.
    pub fn number_or_zero(&self, column: Column) -> f64 {
        self.number(column).unwrap_or(0.0)
    }

    pub fn count(&self, column: Column) -> usize {
        self.number_or_zero(column).max(0.0) as usize
    }

    pub fn text(&self, column: Column) -> Option<&str> {
        self.get(column).as_str()
    }

    /// Group key as owned text; reduced text values work too.
    pub fn label(&self, column: Column) -> String {
        self.get(column).key().unwrap_or_default()
    }
}

impl Record for GroupedRow {
    fn value(&self, column: Column) -> Value {
        self.get(column).clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTable {
    pub group_by: Vec<Column>,
    pub rows: Vec<GroupedRow>,
}

impl GroupedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable descending sort on a numeric column; missing values sink.
    pub fn sort_desc(mut self, column: Column) -> Self {
        self.rows.sort_by(|a, b| {
            match (a.number(column), b.number(column)) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        self
    }

    /// Stable ascending sort on the text form of a column (months, weeks).
    pub fn sort_by_label(mut self, column: Column) -> Self {
        self.rows.sort_by_key(|r| r.label(column));
        self
    }

    pub fn top_n(mut self, column: Column, n: usize) -> Self {
        self = self.sort_desc(column);
        self.rows.truncate(n);
        self
    }

    pub fn retain<F>(mut self, keep: F) -> Self
    where
        F: FnMut(&GroupedRow) -> bool,
    {
        self.rows.retain(keep);
        self
    }

    /// Sum of a column over all groups.
    pub fn total(&self, column: Column) -> f64 {
        self.rows.iter().filter_map(|r| r.number(column)).sum()
    }
}

/// Group `rows` by `group_by` and reduce each column in `reductions`.
///
/// Rows with a missing group key are left out, as pandas does by default.
/// A column should appear at most once in `reductions` since output cells
/// are looked up by source column.
pub fn aggregate<'a, R, I>(rows: I, group_by: &[Column], reductions: &[Reduce]) -> GroupedTable
where
    R: Record + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<String>, Vec<Acc>)> = Vec::new();

    'rows: for row in rows {
        let mut key = Vec::with_capacity(group_by.len());
        for col in group_by {
            match row.value(*col).key() {
                Some(k) => key.push(k),
                None => continue 'rows,
            }
        }
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                let accs = reductions.iter().map(|r| Acc::new(r.op)).collect();
                index.insert(key.clone(), groups.len());
                groups.push((key, accs));
                groups.len() - 1
            }
        };
        for (acc, reduce) in groups[slot].1.iter_mut().zip(reductions) {
            acc.push(row.value(reduce.column));
        }
    }

    let rows = groups
        .into_iter()
        .map(|(key, accs)| {
            let mut cells: Vec<(Column, Value)> = group_by
                .iter()
                .copied()
                .zip(key.into_iter().map(Value::Text))
                .collect();
            cells.extend(
                reductions
                    .iter()
                    .map(|r| r.column)
                    .zip(accs.into_iter().map(Acc::finish)),
            );
            GroupedRow { cells }
        })
        .collect();

    GroupedTable {
        group_by: group_by.to_vec(),
        rows,
    }
}

/// Reduce a whole table to one value.
pub fn reduce_all<'a, R, I>(rows: I, reduce: Reduce) -> Value
where
    R: Record + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut acc = Acc::new(reduce.op);
    for row in rows {
        acc.push(row.value(reduce.column));
    }
    acc.finish()
}

/// Occurrences per category, most frequent first, ties in first-seen order.
pub fn value_counts<'a, R, I>(rows: I, column: Column) -> Vec<(String, usize)>
where
    R: Record + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        if let Some(k) = row.value(column).key() {
            match index.get(&k) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(k.clone(), counts.len());
                    counts.push((k, 1));
                }
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Sum-pivot with zero fill. Labels on both axes are sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl PivotTable {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        let c = self.col_labels.iter().position(|l| l == col)?;
        Some(self.cells[r][c])
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty()
    }
}

pub fn pivot<'a, R, I>(rows: I, row_col: Column, col_col: Column, value_col: Column) -> PivotTable
where
    R: Record + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let grouped = aggregate(rows, &[row_col, col_col], &[Reduce::new(value_col, Reduction::Sum)]);
    let row_labels: Vec<String> = grouped
        .rows
        .iter()
        .map(|r| r.label(row_col))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let col_labels: Vec<String> = grouped
        .rows
        .iter()
        .map(|r| r.label(col_col))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut cells = vec![vec![0.0; col_labels.len()]; row_labels.len()];
    for g in &grouped.rows {
        let r = row_labels.binary_search(&g.label(row_col));
        let c = col_labels.binary_search(&g.label(col_col));
        if let (Ok(r), Ok(c)) = (r, c) {
            cells[r][c] = g.number_or_zero(value_col);
        }
    }
    PivotTable {
        row_labels,
        col_labels,
        cells,
    }
}

// ---------------------------------------------------------------------------
// Record impls for the two source tables
// ---------------------------------------------------------------------------

impl Record for ForecastRecord {
    fn value(&self, column: Column) -> Value {
        match column {
            Column::PmNum => Value::Text(self.pmnum.clone()),
            Column::CountKey => Value::Text(self.countkey.clone()),
            Column::Description => Value::Text(self.description.clone()),
            Column::Department => Value::text(self.department.as_deref()),
            Column::JobType => Value::text(self.job_type.as_deref()),
            Column::ScopeType => Value::Text(self.scope_type.label().to_string()),
            Column::Line => Value::text(self.line.as_deref()),
            Column::ZoneName => Value::text(self.zone_name.as_deref()),
            Column::LaborCraft => Value::text(self.labor_craft.as_deref()),
            Column::Month => Value::Text(self.month.clone()),
            Column::Week => Value::Text(self.week.clone()),
            Column::ComplexityLevel => Value::text(self.complexity_level.map(|l| l.label())),
            Column::IntervalCategory => Value::Text(self.interval_category.label().to_string()),
            Column::PlannedLaborHrs => Value::number(self.planned_labor_hrs),
            Column::PlannedLaborers => Value::number(self.planned_laborers),
            Column::TaskCount => Value::number(self.task_count),
            Column::TotalLaborHrs => Value::number(self.total_labor_hrs),
            Column::ComplexityScore => Value::number(self.complexity_score),
            _ => Value::Missing,
        }
    }

    fn due_date(&self) -> Option<NaiveDate> {
        Some(self.due_date)
    }
}

impl Record for ExecutionRecord {
    fn value(&self, column: Column) -> Value {
        match column {
            Column::PmNum => Value::Text(self.pmnum.clone()),
            Column::Department => Value::text(self.department.as_deref()),
            Column::IntervalCategory => Value::Text(self.interval_category.label().to_string()),
            Column::JobType => Value::text(self.job_type.as_deref()),
            Column::LaborCraft => Value::text(self.labor_craft.as_deref()),
            Column::DueMonth => Value::text(self.due_month.as_deref()),
            Column::PerformanceTier => Value::Text(self.performance_tier.label().to_string()),
            Column::ScheduledCount => Value::number(self.scheduled_count.map(f64::from)),
            Column::CompletedCount => Value::number(self.completed_count.map(f64::from)),
            Column::OnTimeCount => Value::number(self.on_time_count.map(f64::from)),
            Column::AvgPlannedHrs => Value::number(self.avg_planned_hrs),
            Column::AvgActualHrs => Value::number(self.avg_actual_hrs),
            Column::CompletionRate => Value::number(self.completion_rate),
            Column::OnTimeRate => Value::number(self.on_time_rate),
            Column::HourDeviationPct => Value::number(self.hour_deviation_pct),
            _ => Value::Missing,
        }
    }

    /// First day of the due month, so date-range filters apply to both tables.
    fn due_date(&self) -> Option<NaiveDate> {
        let month = self.due_month.as_deref()?;
        NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Row {
        dept: Option<&'static str>,
        craft: &'static str,
        pm: &'static str,
        hours: Option<f64>,
    }

    impl Record for Row {
        fn value(&self, column: Column) -> Value {
            match column {
                Column::Department => Value::text(self.dept),
                Column::LaborCraft => Value::Text(self.craft.to_string()),
                Column::PmNum => Value::Text(self.pm.to_string()),
                Column::PlannedLaborHrs => Value::number(self.hours),
                _ => Value::Missing,
            }
        }
    }

    fn row(dept: &'static str, craft: &'static str, pm: &'static str, hours: f64) -> Row {
        Row {
            dept: Some(dept),
            craft,
            pm,
            hours: Some(hours),
        }
    }

    #[test]
    fn sum_by_department() {
        let rows = vec![
            row("A", "MECH", "1", 10.0),
            row("A", "ELEC", "2", 20.0),
            row("B", "MECH", "3", 5.0),
        ];
        let out = aggregate(
            &rows,
            &[Column::Department],
            &[Reduce::new(Column::PlannedLaborHrs, Reduction::Sum)],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows[0].label(Column::Department), "A");
        assert_eq!(out.rows[0].number(Column::PlannedLaborHrs), Some(30.0));
        assert_eq!(out.rows[1].label(Column::Department), "B");
        assert_eq!(out.rows[1].number(Column::PlannedLaborHrs), Some(5.0));
    }

    #[test]
    fn mean_skips_missing_and_is_missing_when_empty() {
        let rows = vec![
            row("A", "MECH", "1", 10.0),
            Row { dept: Some("A"), craft: "MECH", pm: "2", hours: None },
            Row { dept: Some("B"), craft: "MECH", pm: "3", hours: None },
        ];
        let out = aggregate(
            &rows,
            &[Column::Department],
            &[Reduce::new(Column::PlannedLaborHrs, Reduction::Mean)],
        );
        assert_eq!(out.rows[0].number(Column::PlannedLaborHrs), Some(10.0));
        assert_eq!(out.rows[1].get(Column::PlannedLaborHrs), &Value::Missing);
    }

    #[test]
    fn missing_group_key_is_dropped() {
        let rows = vec![
            row("A", "MECH", "1", 1.0),
            Row { dept: None, craft: "MECH", pm: "2", hours: Some(2.0) },
        ];
        let out = aggregate(&rows, &[Column::Department], &[Reduce::default_for(Column::PmNum)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows[0].count(Column::PmNum), 1);
    }

    #[test]
    fn distinct_mode_and_first() {
        let rows = vec![
            row("A", "ELEC", "1", 1.0),
            row("A", "MECH", "1", 1.0),
            row("A", "MECH", "2", 1.0),
            row("A", "ELEC", "3", 1.0),
        ];
        let out = aggregate(
            &rows,
            &[Column::Department],
            &[
                Reduce::new(Column::PmNum, Reduction::CountDistinct),
                Reduce::new(Column::LaborCraft, Reduction::Mode),
            ],
        );
        assert_eq!(out.rows[0].count(Column::PmNum), 3);
        // ELEC and MECH tie at two; ELEC was seen first
        assert_eq!(out.rows[0].text(Column::LaborCraft), Some("ELEC"));

        let first = reduce_all(&rows, Reduce::new(Column::LaborCraft, Reduction::First));
        assert_eq!(first, Value::Text("ELEC".to_string()));
    }

    #[test]
    fn sum_of_sums_matches_total() {
        let rows = vec![
            row("A", "MECH", "1", 10.0),
            row("A", "ELEC", "2", 20.0),
            row("B", "MECH", "3", 5.0),
            row("A", "MECH", "4", 2.5),
        ];
        let fine = aggregate(
            &rows,
            &[Column::Department, Column::LaborCraft],
            &[Reduce::new(Column::PlannedLaborHrs, Reduction::Sum)],
        );
        let coarse = aggregate(
            &fine.rows,
            &[Column::Department],
            &[Reduce::new(Column::PlannedLaborHrs, Reduction::Sum)],
        );
        let direct = aggregate(
            &rows,
            &[Column::Department],
            &[Reduce::new(Column::PlannedLaborHrs, Reduction::Sum)],
        );
        assert_eq!(coarse, direct);

        let again = aggregate(
            &direct.rows,
            &[Column::Department],
            &[Reduce::new(Column::PlannedLaborHrs, Reduction::Sum)],
        );
        assert_eq!(again, direct);
        assert_eq!(direct.total(Column::PlannedLaborHrs), 37.5);
    }

    #[test]
    fn predicate_and_negation_partition_exactly() {
        let rows = vec![
            row("A", "MECH", "1", 1.0),
            Row { dept: None, craft: "ELEC", pm: "2", hours: None },
            row("B", "MECH", "3", 1.0),
            row("A", "ELEC", "4", 1.0),
        ];
        let pred = Predicate::Equals(Column::Department, "A".to_string());
        let (yes, no) = partition(&rows, &pred);
        assert_eq!(yes.len() + no.len(), rows.len());

        let negated = Filter::new().with(pred.clone().negate()).apply(&rows);
        assert_eq!(negated.len(), no.len());
        for r in &rows {
            let in_yes = yes.iter().any(|y| std::ptr::eq(*y, r));
            let in_no = negated.iter().any(|n| std::ptr::eq(*n, r));
            assert!(in_yes ^ in_no);
        }
        assert_eq!(pred.clone().negate().negate(), pred);
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let rows = vec![row("A", "MECH", "1", 1.0)];
        let out = Filter::new()
            .one_of(Column::LaborCraft, Vec::<String>::new())
            .apply(&rows);
        assert!(out.is_empty());
    }

    #[test]
    fn ranking_ties_keep_input_order() {
        let rows = vec![
            row("A", "MECH", "1", 5.0),
            row("B", "MECH", "2", 9.0),
            row("C", "MECH", "3", 5.0),
            row("D", "MECH", "4", 5.0),
        ];
        let ranked = aggregate(
            &rows,
            &[Column::Department],
            &[Reduce::new(Column::PlannedLaborHrs, Reduction::Sum)],
        )
        .top_n(Column::PlannedLaborHrs, 3);
        let order: Vec<String> = ranked.rows.iter().map(|r| r.label(Column::Department)).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn value_counts_sorted_stably() {
        let rows = vec![
            row("A", "MECH", "1", 1.0),
            row("B", "ELEC", "2", 1.0),
            row("C", "ELEC", "3", 1.0),
            row("D", "PIPE", "4", 1.0),
            row("E", "MECH", "5", 1.0),
        ];
        let counts = value_counts(&rows, Column::LaborCraft);
        assert_eq!(
            counts,
            vec![
                ("MECH".to_string(), 2),
                ("ELEC".to_string(), 2),
                ("PIPE".to_string(), 1)
            ]
        );
    }

    #[test]
    fn pivot_fills_zero() {
        let rows = vec![
            row("B", "MECH", "1", 3.0),
            row("A", "ELEC", "2", 2.0),
            row("A", "MECH", "3", 1.0),
            row("A", "MECH", "4", 1.0),
        ];
        let p = pivot(&rows, Column::LaborCraft, Column::Department, Column::PlannedLaborHrs);
        assert_eq!(p.row_labels, vec!["ELEC", "MECH"]);
        assert_eq!(p.col_labels, vec!["A", "B"]);
        assert_eq!(p.get("MECH", "A"), Some(2.0));
        assert_eq!(p.get("ELEC", "B"), Some(0.0));
    }
}
