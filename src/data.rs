//! Data loading and the typed view of the sales table using Polars

use crate::error::{AnalysisError, Result};
use polars::prelude::*;
use std::fmt;
use std::fs::File;
use std::path::Path;

pub const WEEK: &str = "week";
pub const SALES_METHOD: &str = "sales_method";
pub const CUSTOMER_ID: &str = "customer_id";
pub const NB_SOLD: &str = "nb_sold";
pub const REVENUE: &str = "revenue";
pub const YEARS_AS_CUSTOMER: &str = "years_as_customer";
pub const NB_SITE_VISITS: &str = "nb_site_visits";
pub const STATE: &str = "state";

/// Columns every input file must carry, in table order
pub const REQUIRED_COLUMNS: [&str; 8] = [
    WEEK,
    SALES_METHOD,
    CUSTOMER_ID,
    NB_SOLD,
    REVENUE,
    YEARS_AS_CUSTOMER,
    NB_SITE_VISITS,
    STATE,
];

/// Outreach strategy a customer was approached with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SalesMethod {
    Email,
    Call,
    EmailAndCall,
}

/// Raw labels observed in the source data and the category each one denotes
const METHOD_LABELS: [(&str, SalesMethod); 7] = [
    ("Email", SalesMethod::Email),
    ("email", SalesMethod::Email),
    ("Call", SalesMethod::Call),
    ("call", SalesMethod::Call),
    ("Email + Call", SalesMethod::EmailAndCall),
    ("Email+Call", SalesMethod::EmailAndCall),
    ("em + call", SalesMethod::EmailAndCall),
];

impl SalesMethod {
    pub const ALL: [SalesMethod; 3] = [
        SalesMethod::Email,
        SalesMethod::Call,
        SalesMethod::EmailAndCall,
    ];

    /// Canonical label written back into the table
    pub fn as_str(self) -> &'static str {
        match self {
            SalesMethod::Email => "Email",
            SalesMethod::Call => "Call",
            SalesMethod::EmailAndCall => "Email + Call",
        }
    }

    /// Look a raw label up in the fixed mapping table.
    /// Returns `None` for labels the table does not know.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        METHOD_LABELS
            .iter()
            .find(|(label, _)| *label == raw)
            .map(|(_, method)| *method)
    }

    /// Position in `ALL`, used to pick chart colors
    pub fn index(self) -> usize {
        match self {
            SalesMethod::Email => 0,
            SalesMethod::Call => 1,
            SalesMethod::EmailAndCall => 2,
        }
    }
}

impl fmt::Display for SalesMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer row of the sales table
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub week: i64,
    pub sales_method: String,
    pub customer_id: String,
    pub nb_sold: i64,
    /// Missing until the cleaner imputes it
    pub revenue: Option<f64>,
    pub years_as_customer: i64,
    pub nb_site_visits: i64,
    pub state: String,
}

/// The in-memory sales table. Mutated only by the cleaner.
#[derive(Debug, Clone)]
pub struct SalesTable {
    frame: DataFrame,
}

impl SalesTable {
    /// Validate a raw frame and cast it to the table schema.
    ///
    /// Extra columns are dropped. Fails on missing columns, missing values
    /// outside `revenue`, non-numeric text in numeric columns and negative
    /// revenue.
    pub fn from_frame(df: DataFrame) -> Result<Self> {
        for name in REQUIRED_COLUMNS {
            if df.column(name).is_err() {
                return Err(AnalysisError::Schema(format!(
                    "missing required column '{}'",
                    name
                )));
            }
        }

        let frame = df
            .lazy()
            .select([
                col(WEEK).strict_cast(DataType::Int64),
                col(SALES_METHOD).strict_cast(DataType::String),
                col(CUSTOMER_ID).strict_cast(DataType::String),
                col(NB_SOLD).strict_cast(DataType::Int64),
                col(REVENUE).strict_cast(DataType::Float64),
                col(YEARS_AS_CUSTOMER).strict_cast(DataType::Int64),
                col(NB_SITE_VISITS).strict_cast(DataType::Int64),
                col(STATE).strict_cast(DataType::String),
            ])
            .collect()
            .map_err(|e| AnalysisError::Schema(e.to_string()))?;

        for name in REQUIRED_COLUMNS.iter().filter(|name| **name != REVENUE) {
            let missing = frame.column(name)?.null_count();
            if missing > 0 {
                return Err(AnalysisError::Schema(format!(
                    "column '{}' has {} missing values",
                    name, missing
                )));
            }
        }

        let negative = frame
            .column(REVENUE)?
            .f64()?
            .into_iter()
            .flatten()
            .filter(|value| *value < 0.0)
            .count();
        if negative > 0 {
            return Err(AnalysisError::Schema(format!(
                "column '{}' has {} negative values",
                REVENUE, negative
            )));
        }

        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub(crate) fn frame_mut(&mut self) -> &mut DataFrame {
        &mut self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Materialize the table row by row
    pub fn records(&self) -> Result<Vec<SalesRecord>> {
        let weeks: Vec<i64> = self.frame.column(WEEK)?.i64()?.into_no_null_iter().collect();
        let methods: Vec<&str> = self
            .frame
            .column(SALES_METHOD)?
            .str()?
            .into_no_null_iter()
            .collect();
        let customer_ids: Vec<&str> = self
            .frame
            .column(CUSTOMER_ID)?
            .str()?
            .into_no_null_iter()
            .collect();
        let nb_sold: Vec<i64> = self.frame.column(NB_SOLD)?.i64()?.into_no_null_iter().collect();
        let revenue: Vec<Option<f64>> = self.frame.column(REVENUE)?.f64()?.into_iter().collect();
        let years: Vec<i64> = self
            .frame
            .column(YEARS_AS_CUSTOMER)?
            .i64()?
            .into_no_null_iter()
            .collect();
        let visits: Vec<i64> = self
            .frame
            .column(NB_SITE_VISITS)?
            .i64()?
            .into_no_null_iter()
            .collect();
        let states: Vec<&str> = self.frame.column(STATE)?.str()?.into_no_null_iter().collect();

        let records = (0..self.len())
            .map(|i| SalesRecord {
                week: weeks[i],
                sales_method: methods[i].to_string(),
                customer_id: customer_ids[i].to_string(),
                nb_sold: nb_sold[i],
                revenue: revenue[i],
                years_as_customer: years[i],
                nb_site_visits: visits[i],
                state: states[i].to_string(),
            })
            .collect();

        Ok(records)
    }
}

/// Map the `sales_method` column of `frame` through the label table.
/// Fails on the first unmapped label.
pub(crate) fn parse_methods(frame: &DataFrame) -> Result<Vec<SalesMethod>> {
    frame
        .column(SALES_METHOD)?
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            let label = label.unwrap_or_default();
            SalesMethod::from_raw(label).ok_or_else(|| AnalysisError::UnmappedCategory {
                row,
                value: label.to_string(),
            })
        })
        .collect()
}

/// Load the sales CSV into a validated `SalesTable`
///
/// # Arguments
/// * `file_path` - Path to a comma-delimited file with a header row
///
/// # Returns
/// * `SalesTable` with the eight required columns in table order
pub fn load_sales_data(file_path: impl AsRef<Path>) -> Result<SalesTable> {
    let path = file_path.as_ref();
    let ingestion = |reason: String| AnalysisError::Ingestion {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| ingestion(e.to_string()))?;

    let parse_options = CsvParseOptions::default()
        .with_separator(b',')
        .with_null_values(Some(NullValues::AllColumnsSingle("NA".into())));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| ingestion(e.to_string()))?;

    if df.height() == 0 {
        return Err(ingestion("no data rows".to_string()));
    }

    tracing::debug!(rows = df.height(), columns = df.width(), "read sales csv");

    SalesTable::from_frame(df)
}
