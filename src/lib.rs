// Library interface for weightrs modules
// This allows integration tests and benches to access the analytics core

pub mod aggregation;
pub mod alignment;
pub mod chart;
pub mod config;
pub mod corridor;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod models;
pub mod timezone;
pub mod trend;

// Re-export commonly used types for convenience
pub use models::*;
pub use aggregation::aggregate_by_day;
pub use alignment::{filter_measurements, realign_to_filtered_days};
pub use chart::{ChartBuilder, ChartData, SeriesMode};
pub use corridor::{compute_corridor, Corridor, GoalConfig};
pub use trend::{compute_trend, fit_trend, TrendLine};
pub use config::AppConfig;
pub use error::{WeightRsError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};
