// The two source tables, loaded once and read-only afterwards.
//
// Views borrow a `&Dataset`; nothing in the crate mutates it after
// construction, so it can be shared freely (including across threads).
use crate::aggregate::{Column, Record};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::history;
use crate::loader::{self, LoadReport};
use crate::location::{LocationColumn, LocationPolicy};
use crate::types::{ExecutionRecord, ForecastRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Dataset {
    forecast: Vec<ForecastRecord>,
    execution: Vec<ExecutionRecord>,
    locations: LocationPolicy,
    pub forecast_report: LoadReport,
    pub execution_report: LoadReport,
}

impl Dataset {
    pub fn new(
        forecast: Vec<ForecastRecord>,
        execution: Vec<ExecutionRecord>,
        location_overrides: &BTreeMap<String, LocationColumn>,
    ) -> Self {
        let locations = LocationPolicy::from_records(&forecast, location_overrides);
        Self {
            forecast,
            execution,
            locations,
            forecast_report: LoadReport::default(),
            execution_report: LoadReport::default(),
        }
    }

    /// Load both tables as configured.
    ///
    /// The execution table comes from work-order history when
    /// `history_path` is set. A missing execution file is tolerated and
    /// leaves the plan-vs-actual view empty; every other failure is returned.
    pub fn load(cfg: &DashboardConfig) -> Result<Self> {
        let (forecast, forecast_report) = loader::load_forecast(&cfg.forecast_path, &cfg.metrics)?;

        let (execution, execution_report) = match &cfg.history_path {
            Some(path) => {
                let (instances, report) = loader::load_work_orders(path)?;
                let records = history::build_execution_records(&instances, &cfg.metrics);
                (records, report)
            }
            None if cfg.execution_path.exists() => {
                loader::load_execution(&cfg.execution_path, &cfg.metrics)?
            }
            None => {
                warn!(
                    path = %cfg.execution_path.display(),
                    "execution table not found; plan-vs-actual view will be empty"
                );
                (Vec::new(), LoadReport::default())
            }
        };

        let mut ds = Self::new(forecast, execution, &cfg.location_overrides);
        ds.forecast_report = forecast_report;
        ds.execution_report = execution_report;
        info!(
            forecast_rows = ds.forecast.len(),
            execution_rows = ds.execution.len(),
            departments = ds.departments().len(),
            "dataset ready"
        );
        Ok(ds)
    }

    pub fn forecast(&self) -> &[ForecastRecord] {
        &self.forecast
    }

    pub fn execution(&self) -> &[ExecutionRecord] {
        &self.execution
    }

    pub fn locations(&self) -> &LocationPolicy {
        &self.locations
    }

    /// Sorted distinct departments of the forecast table.
    pub fn departments(&self) -> Vec<String> {
        distinct(&self.forecast, Column::Department)
    }

    pub fn crafts(&self) -> Vec<String> {
        distinct(&self.forecast, Column::LaborCraft)
    }

    pub fn execution_departments(&self) -> Vec<String> {
        distinct(&self.execution, Column::Department)
    }
}

/// Sorted distinct non-missing values of a column.
pub fn distinct<R: Record>(rows: &[R], column: Column) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.value(column).key())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
