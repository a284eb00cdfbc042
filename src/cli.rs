//! Command-line interface definitions and argument parsing

use crate::clean::{CleaningConfig, MAX_TENURE};
use crate::error::{AnalysisError, Result};
use clap::Parser;

/// Sales outreach analysis: clean product sales data, compare sales methods
/// and score them by revenue per unit of sales effort
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "product_sales.csv")]
    pub input: String,

    /// Directory the PNG charts are written to
    #[arg(short, long, default_value = "charts")]
    pub output_dir: String,

    /// Cap applied to years_as_customer (years since the company was founded)
    #[arg(long, default_value_t = MAX_TENURE)]
    pub max_tenure: i64,

    /// Print tables only, skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the cleaning configuration from the parsed arguments
    pub fn cleaning_config(&self) -> Result<CleaningConfig> {
        if self.max_tenure < 0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "max tenure must be non-negative, got {}",
                self.max_tenure
            )));
        }

        Ok(CleaningConfig {
            max_tenure: self.max_tenure,
        })
    }
}
