pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod history;
pub mod loader;
pub mod location;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use config::DashboardConfig;
pub use dataset::Dataset;
pub use error::{DashboardError, Result};
