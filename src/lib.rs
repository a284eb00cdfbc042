//! Salesforge: outreach strategy analysis for product sales data
//!
//! This library loads a product sales CSV, cleans it (label normalization,
//! revenue imputation, tenure capping), aggregates revenue by sales method and
//! week, and scores each method by average revenue per sales effort (ARPSE).

pub mod aggregate;
pub mod clean;
pub mod cli;
pub mod data;
pub mod error;
pub mod metric;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{
    describe, describe_by_method, summarize_by_method, summarize_by_week, Describe,
    MethodSummary, WeeklySummary,
};
pub use clean::{clean, inspect, CleaningConfig, CleaningReport, QualityReport};
pub use cli::Args;
pub use data::{load_sales_data, SalesMethod, SalesRecord, SalesTable};
pub use error::{AnalysisError, Result};
pub use metric::{compute_arpse, effort_weight, MetricRow};
pub use viz::generate_visualization_report;
