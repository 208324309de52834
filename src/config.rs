// Runtime configuration.
//
// Defaults cover a plain checkout: input tables under `outputs/`, reports
// written to `reports/`. A JSON file can override any subset of fields, and
// a few environment variables override the paths on top of that.
use crate::error::{DashboardError, Result};
use crate::location::{default_overrides, LocationColumn};
use crate::metrics::MetricsConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "PM_DASHBOARD_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub forecast_path: PathBuf,
    pub execution_path: PathBuf,
    /// When set, the execution table is rebuilt from work-order history
    /// instead of read from `execution_path`.
    pub history_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub metrics: MetricsConfig,
    pub location_overrides: BTreeMap<String, LocationColumn>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            forecast_path: PathBuf::from("outputs/data_clean_forecast.csv"),
            execution_path: PathBuf::from("outputs/path2_execution.csv"),
            history_path: None,
            output_dir: PathBuf::from("reports"),
            metrics: MetricsConfig::default(),
            location_overrides: default_overrides(),
        }
    }
}

impl DashboardConfig {
    /// Resolve the config: explicit path, else `$PM_DASHBOARD_CONFIG`, else
    /// defaults. Environment path overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut cfg = match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => {
                info!(path = %p.display(), "reading configuration");
                Self::from_file(&p)?
            }
            None => {
                debug!("no configuration file, using defaults");
                Self::default()
            }
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn apply_env(&mut self) {
        if let Some(p) = env::var_os("PM_FORECAST_PATH") {
            self.forecast_path = PathBuf::from(p);
        }
        if let Some(p) = env::var_os("PM_EXECUTION_PATH") {
            self.execution_path = PathBuf::from(p);
        }
        if let Some(p) = env::var_os("PM_HISTORY_PATH") {
            self.history_path = Some(PathBuf::from(p));
        }
        if let Some(p) = env::var_os("PM_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(p);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.metrics.validate()?;
        if self.output_dir.as_os_str().is_empty() {
            return Err(DashboardError::InvalidConfig(
                "output_dir must not be empty".to_string(),
            ));
        }
        if self.location_overrides.keys().any(|d| d.trim().is_empty()) {
            return Err(DashboardError::InvalidConfig(
                "location_overrides keys must name a department".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"output_dir": "out", "metrics": {{"weights": {{"task": 0.5, "hours": 0.3, "description": 0.2}}}}}}"#
        )
        .unwrap();
        let cfg = DashboardConfig::from_file(f.path()).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.metrics.weights.task, 0.5);
        assert_eq!(cfg.metrics.complexity_thresholds.very_high, 0.75);
        assert_eq!(
            cfg.location_overrides.get("MACHINING"),
            Some(&LocationColumn::Line)
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_weights_are_rejected() {
        let mut cfg = DashboardConfig::default();
        cfg.metrics.weights.description = 0.9;
        assert!(matches!(
            cfg.validate(),
            Err(DashboardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn blank_override_department_is_rejected() {
        let mut cfg = DashboardConfig::default();
        cfg.location_overrides.insert("  ".to_string(), LocationColumn::Line);
        assert!(matches!(
            cfg.validate(),
            Err(DashboardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn oversized_grace_window_is_rejected() {
        let mut cfg = DashboardConfig::default();
        cfg.metrics.on_time_grace_days = 1_000_000_000;
        assert!(matches!(
            cfg.validate(),
            Err(DashboardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        assert!(matches!(
            DashboardConfig::from_file(f.path()),
            Err(DashboardError::Json(_))
        ));
    }
}
