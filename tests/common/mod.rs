#![allow(dead_code)]

use pm_dashboard::DashboardConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Departments A (10 + 20 planned hours) and B (5), plus two rows the loader
/// must skip.
pub const FORECAST_CSV: &str = "\
PMNUM,COUNTKEY,PMDESCRIPTION,DEPT_NAME,JOB_TYPE,PMSCOPETYPE,LINE,ZONENAME,LABOR_CRAFT,DUE_DATE,PLANNED_LABOR_HRS,PLANNED_LABORERS,TASK_COUNT,total_labor_hrs,FREQUENCY
PM1,K1,Inspect press,A,PM,ASSET,L1,,MECH,2025-01-06,10,1,4,10,W
PM2,K2,Lubricate and inspect main gearbox assembly,A,PM,LOCATION,L2,,ELEC,2025-02-03,20,2,8,,M
PM3,K3,Clean,B,CM,ASSET,,Z1,MECH,2025-01-20,5,1,2,5,Q
,K4,Orphan row,B,CM,ASSET,,Z1,MECH,2025-01-27,1,1,1,1,Q
PM5,K5,Undated,B,CM,ASSET,,Z1,MECH,someday,1,1,1,1,Q
";

/// PM2 has zero planned hours, PM3 was never scheduled.
pub const EXECUTION_CSV: &str = "\
PMNUM,DEPT_NAME,FREQUENCY,JOB_TYPE,LABOR_CRAFT,SCHEDULED_COUNT,COMPLETED_COUNT,ON_TIME_COUNT,AVG_PLANNED_HRS,AVG_ACTUAL_HRS,DUE_MONTH
PM1,A,W,PM,MECH,4,4,4,10,10.5,2025-01
PM2,A,M,PM,ELEC,4,3,2,0,5,2025-02
PM3,B,Q,CM,MECH,0,0,0,5,5,2025-01
";

pub const HISTORY_CSV: &str = "\
PMNUM,DEPT_NAME,FREQUENCY,JOB_TYPE,LABOR_CRAFT,DUE_DATE,COMPLETED_DATE,PLANNED_HRS,ACTUAL_HRS
PM1,A,W,PM,MECH,2025-01-06,2025-01-06,2,2
PM1,A,W,PM,MECH,2025-01-13,,2,
PM3,B,Q,CM,MECH,2025-01-20,2025-01-30,5,6
";

pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Temp dir with both tables and a config pointing at them.
pub fn fixture() -> (TempDir, DashboardConfig) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DashboardConfig {
        forecast_path: write(dir.path(), "forecast.csv", FORECAST_CSV),
        execution_path: write(dir.path(), "execution.csv", EXECUTION_CSV),
        history_path: None,
        output_dir: dir.path().join("reports"),
        ..DashboardConfig::default()
    };
    (dir, cfg)
}
