use thiserror::Error;

/// Errors surfaced while loading data, reading config or writing outputs.
///
/// Data-quality conditions (missing derived values, empty filter results,
/// unknown categories) are not errors; they travel as `None` or fallback
/// buckets instead.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{file}: required column `{column}` is missing")]
    MissingColumn { file: String, column: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}: no usable rows after loading")]
    EmptyDataset(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
