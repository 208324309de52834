// Which location column each department is tracked by.
//
// Departments record location either as a production line or as a plant
// zone, never both. The choice is made once per department when the data
// is loaded and then looked up by the views.
use crate::aggregate::Column;
use crate::types::ForecastRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationColumn {
    #[serde(rename = "LINE")]
    Line,
    #[serde(rename = "ZONENAME")]
    ZoneName,
}

impl LocationColumn {
    pub fn column(&self) -> Column {
        match self {
            LocationColumn::Line => Column::Line,
            LocationColumn::ZoneName => Column::ZoneName,
        }
    }
}

impl fmt::Display for LocationColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column().name())
    }
}

/// Department overrides applied on top of the data-driven choice.
pub fn default_overrides() -> BTreeMap<String, LocationColumn> {
    BTreeMap::from([("MACHINING".to_string(), LocationColumn::Line)])
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationPolicy {
    by_department: BTreeMap<String, LocationColumn>,
}

impl LocationPolicy {
    /// A department uses `LINE` when it has more non-null line cells than
    /// zone cells, or when an override says so; `ZONENAME` otherwise.
    pub fn from_records(
        records: &[ForecastRecord],
        overrides: &BTreeMap<String, LocationColumn>,
    ) -> Self {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for r in records {
            let Some(dept) = r.department.as_deref() else {
                continue;
            };
            let e = counts.entry(dept).or_insert((0, 0));
            if r.line.is_some() {
                e.0 += 1;
            }
            if r.zone_name.is_some() {
                e.1 += 1;
            }
        }

        let mut by_department: BTreeMap<String, LocationColumn> = counts
            .into_iter()
            .map(|(dept, (lines, zones))| {
                let col = if lines > zones {
                    LocationColumn::Line
                } else {
                    LocationColumn::ZoneName
                };
                (dept.to_string(), col)
            })
            .collect();
        for (dept, col) in overrides {
            if let Some(slot) = by_department.get_mut(dept) {
                *slot = *col;
            }
        }
        Self { by_department }
    }

    /// Departments missing from the table fall back to `ZONENAME`.
    pub fn column_for(&self, department: &str) -> LocationColumn {
        self.by_department
            .get(department)
            .copied()
            .unwrap_or(LocationColumn::ZoneName)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LocationColumn)> {
        self.by_department.iter().map(|(d, c)| (d.as_str(), *c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntervalCategory, ScopeType};
    use chrono::NaiveDate;

    fn rec(dept: &str, line: Option<&str>, zone: Option<&str>) -> ForecastRecord {
        let due = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        ForecastRecord {
            pmnum: "PM1".to_string(),
            countkey: "K".to_string(),
            description: String::new(),
            department: Some(dept.to_string()),
            job_type: None,
            scope_type: ScopeType::Asset,
            line: line.map(str::to_string),
            zone_name: zone.map(str::to_string),
            labor_craft: None,
            due_date: due,
            month: "2025-01".to_string(),
            week: "2025-W01".to_string(),
            planned_labor_hrs: None,
            planned_laborers: None,
            task_count: None,
            total_labor_hrs: None,
            complexity_score: None,
            complexity_level: None,
            interval_category: IntervalCategory::Unknown,
        }
    }

    #[test]
    fn majority_of_non_null_cells_decides() {
        let records = vec![
            rec("ASSEMBLY", Some("L1"), None),
            rec("ASSEMBLY", Some("L2"), None),
            rec("ASSEMBLY", None, Some("Z1")),
            rec("PAINT", None, Some("Z1")),
            rec("PAINT", Some("L1"), None),
        ];
        let policy = LocationPolicy::from_records(&records, &BTreeMap::new());
        assert_eq!(policy.column_for("ASSEMBLY"), LocationColumn::Line);
        // a tie goes to zones
        assert_eq!(policy.column_for("PAINT"), LocationColumn::ZoneName);
        assert_eq!(policy.column_for("UNSEEN"), LocationColumn::ZoneName);
    }

    #[test]
    fn override_wins_over_counts() {
        let records = vec![rec("MACHINING", None, Some("Z1"))];
        let policy = LocationPolicy::from_records(&records, &default_overrides());
        assert_eq!(policy.column_for("MACHINING"), LocationColumn::Line);
        assert_eq!(policy.iter().count(), 1);
    }
}
