//! Error types for the sales analysis pipeline

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while loading, cleaning, aggregating or rendering sales data
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Cannot ingest {path}: {reason}")]
    Ingestion { path: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unmapped sales method {value:?} at row {row}")]
    UnmappedCategory { row: usize, value: String },

    #[error("No observed revenue for {method}, cannot impute")]
    NoObservedRevenue { method: String },

    #[error("ARPSE undefined for {method}: {customers} customers with effort weight {effort_weight}")]
    ZeroDenominator {
        method: String,
        customers: usize,
        effort_weight: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for AnalysisError {
    fn from(err: polars::error::PolarsError) -> Self {
        AnalysisError::Data(err.to_string())
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for AnalysisError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        AnalysisError::Chart(err.to_string())
    }
}
